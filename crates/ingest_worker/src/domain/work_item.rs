use common::domain::{IngestError, IngestResult, ObjectLocator, QueueClient, QueueRef, RawMessage};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// One object to fetch, plus the receipt of the message it came from
#[derive(Clone)]
pub struct WorkItem {
    pub locator: ObjectLocator,
    pub receipt: MessageReceipt,
}

impl WorkItem {
    pub fn new(locator: ObjectLocator, receipt: MessageReceipt) -> Self {
        Self { locator, receipt }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("locator", &self.locator)
            .field("message_id", &self.receipt.message_id())
            .field("outstanding", &self.receipt.outstanding())
            .finish()
    }
}

/// What happened to the source message when an item completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    /// Other items from the same message are still outstanding
    Pending,
    /// Every item succeeded and the message was deleted from the queue
    Deleted,
    /// At least one item failed; the message is left for redelivery
    Retained,
}

/// Completion callback shared by every WorkItem produced from one message.
///
/// The message is deleted only after the last item completes and only if
/// none of them failed.
#[derive(Clone)]
pub struct MessageReceipt {
    inner: Arc<ReceiptState>,
}

struct ReceiptState {
    queue: Arc<dyn QueueClient>,
    queue_ref: QueueRef,
    receipt_handle: String,
    message_id: Option<String>,
    outstanding: AtomicUsize,
    failed: AtomicBool,
}

impl MessageReceipt {
    pub fn new(
        queue: Arc<dyn QueueClient>,
        queue_ref: QueueRef,
        message: &RawMessage,
        item_count: usize,
    ) -> Self {
        Self {
            inner: Arc::new(ReceiptState {
                queue,
                queue_ref,
                receipt_handle: message.receipt_handle.clone(),
                message_id: message.message_id.clone(),
                outstanding: AtomicUsize::new(item_count),
                failed: AtomicBool::new(false),
            }),
        }
    }

    pub fn message_id(&self) -> Option<&str> {
        self.inner.message_id.as_deref()
    }

    /// Items of this message that have not completed yet
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Record the completion of one item
    pub async fn complete(&self, succeeded: bool) -> IngestResult<AckStatus> {
        if !succeeded {
            self.inner.failed.store(true, Ordering::SeqCst);
        }

        let previous = self
            .inner
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| {
                IngestError::Acknowledgement(format!(
                    "receipt for message {} completed more times than it has items",
                    self.message_id().unwrap_or("<unknown>")
                ))
            })?;

        if previous > 1 {
            return Ok(AckStatus::Pending);
        }

        if self.inner.failed.load(Ordering::SeqCst) {
            return Ok(AckStatus::Retained);
        }

        self.inner
            .queue
            .delete(&self.inner.queue_ref, &self.inner.receipt_handle)
            .await?;

        Ok(AckStatus::Deleted)
    }
}
