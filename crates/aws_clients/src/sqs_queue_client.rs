use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use bytes::Bytes;
use common::domain::{
    IngestError, IngestResult, QueueAttributes, QueueClient, QueueRef, RawMessage,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest batch a single receive call may request
pub const MAX_RECEIVE_BATCH: usize = 10;

/// QueueClient backed by an SQS-compatible service
#[derive(Clone)]
pub struct SqsQueueClient {
    client: aws_sdk_sqs::Client,
}

impl SqsQueueClient {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }

    async fn lookup(&self, name: &str) -> IngestResult<Option<String>> {
        match self.client.get_queue_url().queue_name(name).send().await {
            Ok(output) => Ok(output.queue_url().map(str::to_string)),
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .is_some_and(|err| err.is_queue_does_not_exist());
                if missing {
                    Ok(None)
                } else {
                    Err(IngestError::TransientFetch(format!(
                        "failed to look up queue {}: {}",
                        name,
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }

    async fn create(&self, name: &str, attributes: &QueueAttributes) -> IngestResult<String> {
        let mut request = self.client.create_queue().queue_name(name);
        for (key, value) in queue_attribute_pairs(attributes) {
            request = request.attributes(key, value);
        }
        for (key, value) in &attributes.tags {
            request = request.tags(key, value);
        }

        let output = request.send().await.map_err(|e| {
            IngestError::Configuration(format!(
                "failed to create queue {}: {}",
                name,
                DisplayErrorContext(&e)
            ))
        })?;

        output.queue_url().map(str::to_string).ok_or_else(|| {
            IngestError::Configuration(format!("queue {} was created without a url", name))
        })
    }
}

fn queue_attribute_pairs(attributes: &QueueAttributes) -> Vec<(QueueAttributeName, String)> {
    let mut pairs = Vec::new();

    let numeric = [
        (
            QueueAttributeName::VisibilityTimeout,
            attributes.visibility_timeout_secs,
        ),
        (
            QueueAttributeName::MessageRetentionPeriod,
            attributes.message_retention_secs,
        ),
        (QueueAttributeName::DelaySeconds, attributes.delivery_delay_secs),
        (
            QueueAttributeName::MaximumMessageSize,
            attributes.max_message_size_bytes,
        ),
        (
            QueueAttributeName::ReceiveMessageWaitTimeSeconds,
            attributes.receive_wait_secs,
        ),
    ];
    for (name, value) in numeric {
        if let Some(value) = value {
            pairs.push((name, value.to_string()));
        }
    }

    if attributes.encryption {
        pairs.push((QueueAttributeName::SqsManagedSseEnabled, "true".to_string()));
    }

    pairs
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn ensure_queue(
        &self,
        name: &str,
        attributes: &QueueAttributes,
    ) -> IngestResult<QueueRef> {
        let url = match self.lookup(name).await? {
            Some(url) => {
                info!(queue = %name, "queue already exists");
                url
            }
            None => {
                let url = self.create(name, attributes).await?;
                info!(queue = %name, url = %url, "created queue");
                url
            }
        };

        Ok(QueueRef {
            name: name.to_string(),
            url,
        })
    }

    async fn receive(
        &self,
        queue: &QueueRef,
        max_messages: usize,
        wait: Duration,
    ) -> IngestResult<Vec<RawMessage>> {
        let max_messages = max_messages.clamp(1, MAX_RECEIVE_BATCH) as i32;
        let wait_secs = wait.as_secs().min(20) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&queue.url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|e| {
                IngestError::TransientFetch(format!(
                    "failed to receive from {}: {}",
                    queue.name,
                    DisplayErrorContext(&e)
                ))
            })?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let Some(receipt_handle) = message.receipt_handle else {
                    warn!(
                        message_id = message.message_id.as_deref().unwrap_or("<none>"),
                        "skipping message without receipt handle"
                    );
                    return None;
                };
                Some(RawMessage {
                    message_id: message.message_id,
                    receipt_handle,
                    body: Bytes::from(message.body.unwrap_or_default()),
                })
            })
            .collect::<Vec<_>>();

        debug!(queue = %queue.name, count = messages.len(), "received messages");
        Ok(messages)
    }

    async fn delete(&self, queue: &QueueRef, receipt_handle: &str) -> IngestResult<()> {
        self.client
            .delete_message()
            .queue_url(&queue.url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                IngestError::Acknowledgement(format!(
                    "failed to delete message from {}: {}",
                    queue.name,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configured_attributes_are_sent() {
        let attributes = QueueAttributes {
            visibility_timeout_secs: Some(60),
            receive_wait_secs: Some(20),
            encryption: true,
            ..Default::default()
        };

        let pairs = queue_attribute_pairs(&attributes);

        assert_eq!(
            pairs,
            vec![
                (QueueAttributeName::VisibilityTimeout, "60".to_string()),
                (QueueAttributeName::ReceiveMessageWaitTimeSeconds, "20".to_string()),
                (QueueAttributeName::SqsManagedSseEnabled, "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_attributes_are_empty() {
        assert!(queue_attribute_pairs(&QueueAttributes::default()).is_empty());
    }
}
