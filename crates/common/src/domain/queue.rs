use crate::domain::result::IngestResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::time::Duration;

/// A message as delivered by the notification queue
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub message_id: Option<String>,
    /// Handle required to delete (acknowledge) this delivery
    pub receipt_handle: String,
    pub body: Bytes,
}

/// A resolved queue the poller can receive from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRef {
    pub name: String,
    pub url: String,
}

/// Attributes applied when the queue has to be created
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueAttributes {
    pub visibility_timeout_secs: Option<u32>,
    pub message_retention_secs: Option<u32>,
    pub delivery_delay_secs: Option<u32>,
    pub max_message_size_bytes: Option<u32>,
    pub receive_wait_secs: Option<u32>,
    pub encryption: bool,
    /// Cost-allocation tags set on a newly created queue
    pub tags: BTreeMap<String, String>,
}

/// Trait for notification queue operations
///
/// Implementations should:
/// - Return at most `max_messages` messages per receive call
/// - Wait up to `wait` for messages when none are immediately available
/// - Return TransientFetch on connectivity failures
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Resolve the queue by name, creating it with `attributes` if absent
    async fn ensure_queue(&self, name: &str, attributes: &QueueAttributes)
        -> IngestResult<QueueRef>;

    /// Receive a batch of messages
    async fn receive(
        &self,
        queue: &QueueRef,
        max_messages: usize,
        wait: Duration,
    ) -> IngestResult<Vec<RawMessage>>;

    /// Delete a delivered message so it is not redelivered
    async fn delete(&self, queue: &QueueRef, receipt_handle: &str) -> IngestResult<()>;
}
