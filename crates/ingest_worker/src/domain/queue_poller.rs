use crate::domain::{MessageReceipt, PipelineContext, WorkItem, WorkQueueSender};
use anyhow::Result;
use common::domain::{NotificationEnvelope, ObjectLocator, RawMessage};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Receive settings for the poller
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub batch_size: usize,
    pub receive_wait: Duration,
    pub error_delay: Duration,
}

/// Pulls notification batches and turns accepted records into work items.
///
/// The poller is the only producer of the work queue; it never fetches
/// object content itself. When it returns, its sender is dropped and the
/// queue closes for the workers.
pub struct QueuePoller {
    context: Arc<PipelineContext>,
    work_queue: WorkQueueSender,
    settings: PollSettings,
}

impl QueuePoller {
    pub fn new(
        context: Arc<PipelineContext>,
        work_queue: WorkQueueSender,
        settings: PollSettings,
    ) -> Self {
        Self {
            context,
            work_queue,
            settings,
        }
    }

    /// Run the receive loop until cancellation
    pub async fn run(self, ctx: CancellationToken) -> Result<()> {
        let queue = &self.context.queue_ref;
        info!(
            queue = %queue.name,
            batch_size = self.settings.batch_size,
            receive_wait_secs = self.settings.receive_wait.as_secs(),
            "starting queue poller"
        );

        loop {
            let received = tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    info!(queue = %queue.name, "received shutdown signal, stopping queue poller");
                    break;
                }
                result = self.context.queue.receive(
                    queue,
                    self.settings.batch_size,
                    self.settings.receive_wait,
                ) => result,
            };

            match received {
                Ok(messages) => {
                    if messages.is_empty() {
                        debug!(queue = %queue.name, "no messages in batch");
                        continue;
                    }
                    debug!(queue = %queue.name, message_count = messages.len(), "received message batch");

                    if self.dispatch_batch(messages, &ctx).await.is_break() {
                        info!(queue = %queue.name, "stopping queue poller mid-batch");
                        break;
                    }
                }
                Err(e) => {
                    warn!(queue = %queue.name, error = %e, "failed to poll queue");
                    tokio::select! {
                        _ = ctx.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.error_delay) => {}
                    }
                }
            }
        }

        debug!(queue = %queue.name, "queue poller stopped, closing work queue");
        Ok(())
    }

    async fn dispatch_batch(
        &self,
        messages: Vec<RawMessage>,
        ctx: &CancellationToken,
    ) -> ControlFlow<()> {
        for message in messages {
            if self.dispatch_message(message, ctx).await.is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Parse one message and push a work item per accepted record.
    ///
    /// Breaks only when cancellation interrupts a push or the queue closed.
    pub(crate) async fn dispatch_message(
        &self,
        message: RawMessage,
        ctx: &CancellationToken,
    ) -> ControlFlow<()> {
        let message_id = message.message_id.as_deref().unwrap_or("<none>");

        let envelope = match NotificationEnvelope::from_json(&message.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Not deleted: redelivery is left to the visibility timeout
                error!(message_id = %message_id, error = %e, "dropping malformed notification");
                return ControlFlow::Continue(());
            }
        };

        let accepted: Vec<ObjectLocator> = envelope
            .records
            .into_iter()
            .filter(|record| {
                let keep = self.context.filter.accepts(record);
                if !keep {
                    debug!(
                        message_id = %message_id,
                        event_type = %record.event_type,
                        locator = %record.locator,
                        "skipping record not accepted by filter"
                    );
                }
                keep
            })
            .map(|record| record.locator)
            .collect();

        if accepted.is_empty() {
            self.acknowledge_unmatched(&message).await;
            return ControlFlow::Continue(());
        }

        let receipt = MessageReceipt::new(
            Arc::clone(&self.context.queue),
            self.context.queue_ref.clone(),
            &message,
            accepted.len(),
        );

        for locator in accepted {
            debug!(message_id = %message_id, locator = %locator, "enqueueing work item");
            let item = WorkItem::new(locator, receipt.clone());

            tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    // Abandoned items keep the message undeleted, so it is redelivered
                    info!(message_id = %message_id, "abandoning push on shutdown");
                    return ControlFlow::Break(());
                }
                pushed = self.work_queue.push(item) => {
                    if pushed.is_err() {
                        warn!(message_id = %message_id, "work queue closed, stopping poller");
                        return ControlFlow::Break(());
                    }
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Delete a well-formed message that carried nothing to process
    async fn acknowledge_unmatched(&self, message: &RawMessage) {
        let message_id = message.message_id.as_deref().unwrap_or("<none>");
        debug!(message_id = %message_id, "no accepted records, deleting notification");

        if let Err(e) = self
            .context
            .queue
            .delete(&self.context.queue_ref, &message.receipt_handle)
            .await
        {
            warn!(message_id = %message_id, error = %e, "failed to delete notification");
        }
    }
}
