use crate::domain::{AckStatus, PipelineContext, WorkQueueReceiver};
use anyhow::Result;
use common::domain::{IngestError, ObjectLocator};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Step of the per-object pipeline at which processing stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Fetch,
    Decode,
    Parse,
    Emit,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStage::Fetch => write!(f, "fetch"),
            ProcessingStage::Decode => write!(f, "decode"),
            ProcessingStage::Parse => write!(f, "parse"),
            ProcessingStage::Emit => write!(f, "emit"),
        }
    }
}

/// Result of processing one work item
#[derive(Debug)]
pub enum ProcessingOutcome {
    Completed { metric_count: usize },
    Abandoned { stage: ProcessingStage, error: IngestError },
}

impl ProcessingOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ProcessingOutcome::Completed { .. })
    }

    fn abandoned(stage: ProcessingStage, error: IngestError) -> Self {
        ProcessingOutcome::Abandoned { stage, error }
    }
}

/// A pool member: pops work items and runs fetch, decode, parse and emit.
///
/// Failures are contained to the item; the worker moves on to the next one.
pub struct ObjectProcessor {
    worker_id: usize,
    context: Arc<PipelineContext>,
    work_queue: WorkQueueReceiver,
}

impl ObjectProcessor {
    pub fn new(worker_id: usize, context: Arc<PipelineContext>, work_queue: WorkQueueReceiver) -> Self {
        Self {
            worker_id,
            context,
            work_queue,
        }
    }

    /// Process items until the queue is closed and drained
    pub async fn run(self) -> Result<()> {
        debug!(worker_id = self.worker_id, "starting object processor");

        let mut processed = 0usize;
        while let Some(item) = self.work_queue.pop().await {
            let outcome = self.process(&item.locator).await;
            processed += 1;

            match item.receipt.complete(outcome.is_completed()).await {
                Ok(AckStatus::Deleted) => {
                    debug!(
                        worker_id = self.worker_id,
                        message_id = item.receipt.message_id().unwrap_or("<none>"),
                        "all objects processed, notification deleted"
                    );
                }
                Ok(AckStatus::Retained) => {
                    debug!(
                        worker_id = self.worker_id,
                        message_id = item.receipt.message_id().unwrap_or("<none>"),
                        "notification retained for redelivery"
                    );
                }
                Ok(AckStatus::Pending) => {}
                Err(e) => {
                    warn!(
                        worker_id = self.worker_id,
                        message_id = item.receipt.message_id().unwrap_or("<none>"),
                        error = %e,
                        "failed to acknowledge notification"
                    );
                }
            }
        }

        info!(worker_id = self.worker_id, processed, "object processor stopped");
        Ok(())
    }

    /// Fetch, decode, parse and emit one object
    #[instrument(skip_all, fields(worker_id = self.worker_id, locator = %locator))]
    pub async fn process(&self, locator: &ObjectLocator) -> ProcessingOutcome {
        let ctx = &self.context;

        let content = match tokio::time::timeout(ctx.fetch_timeout, ctx.store.get(locator)).await {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => return self.abandon(ProcessingStage::Fetch, e),
            Err(_) => {
                let e = IngestError::TransientFetch(format!(
                    "fetch of {} timed out after {:?}",
                    locator, ctx.fetch_timeout
                ));
                return self.abandon(ProcessingStage::Fetch, e);
            }
        };
        debug!(bytes = content.len(), "fetched object");

        let decoded = match ctx.decoder.decode(content, &ctx.content_encoding) {
            Ok(decoded) => decoded,
            Err(e) => return self.abandon(ProcessingStage::Decode, e),
        };

        let metrics = match ctx.parser.parse(&decoded) {
            Ok(metrics) => metrics,
            Err(e) => return self.abandon(ProcessingStage::Parse, e),
        };
        debug!(metric_count = metrics.len(), "parsed object");

        let metric_count = metrics.len();
        for metric in metrics {
            if let Err(e) = ctx.sink.add_metric(metric).await {
                return self.abandon(ProcessingStage::Emit, e);
            }
        }

        debug!(metric_count, "object processed");
        ProcessingOutcome::Completed { metric_count }
    }

    fn abandon(&self, stage: ProcessingStage, error: IngestError) -> ProcessingOutcome {
        match &error {
            IngestError::ObjectNotFound(_) | IngestError::ObjectAccessDenied(_) => {
                warn!(stage = %stage, error = %error, "skipping object");
            }
            _ => {
                error!(stage = %stage, error = %error, "failed to process object");
            }
        }
        ProcessingOutcome::abandoned(stage, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{work_queue, EventFilter, MessageReceipt, WorkItem};
    use bytes::Bytes;
    use common::domain::{MetricRecord, QueueRef, RawMessage};
    use common::{MockContentDecoder, MockMetricParser, MockMetricSink, MockObjectStore, MockQueueClient};
    use mockall::predicate::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn metric(name: &str) -> MetricRecord {
        let mut fields = serde_json::Map::new();
        fields.insert("value".to_string(), serde_json::json!(1));
        MetricRecord {
            name: name.to_string(),
            tags: BTreeMap::new(),
            fields,
            timestamp: None,
        }
    }

    fn queue_ref() -> QueueRef {
        QueueRef {
            name: "ingest".to_string(),
            url: "https://queue.local/ingest".to_string(),
        }
    }

    struct Mocks {
        queue: MockQueueClient,
        store: MockObjectStore,
        decoder: MockContentDecoder,
        parser: MockMetricParser,
        sink: MockMetricSink,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                queue: MockQueueClient::new(),
                store: MockObjectStore::new(),
                decoder: MockContentDecoder::new(),
                parser: MockMetricParser::new(),
                sink: MockMetricSink::new(),
            }
        }

        fn into_context(self) -> Arc<PipelineContext> {
            Arc::new(self.build())
        }

        fn build(self) -> PipelineContext {
            PipelineContext {
                queue: Arc::new(self.queue),
                queue_ref: queue_ref(),
                store: Arc::new(self.store),
                decoder: Arc::new(self.decoder),
                content_encoding: "identity".to_string(),
                parser: Arc::new(self.parser),
                sink: Arc::new(self.sink),
                filter: EventFilter::new(&["ObjectCreated:"]),
                fetch_timeout: Duration::from_millis(100),
            }
        }
    }

    fn processor(context: Arc<PipelineContext>) -> ObjectProcessor {
        let (_tx, rx) = work_queue(1);
        ObjectProcessor::new(0, context, rx)
    }

    #[tokio::test]
    async fn test_process_emits_every_parsed_metric() {
        let mut mocks = Mocks::new();
        let locator = ObjectLocator::new("bucket", "metrics.json");

        mocks
            .store
            .expect_get()
            .with(eq(locator.clone()))
            .times(1)
            .returning(|_| Ok(Bytes::from_static(b"raw")));
        mocks
            .decoder
            .expect_decode()
            .withf(|content, encoding| content.as_ref() == b"raw" && encoding == "identity")
            .times(1)
            .returning(|_, _| Ok(Bytes::from_static(b"decoded")));
        mocks
            .parser
            .expect_parse()
            .withf(|content| content == b"decoded")
            .times(1)
            .returning(|_| Ok(vec![metric("cpu"), metric("mem")]));
        mocks.sink.expect_add_metric().times(2).returning(|_| Ok(()));

        let outcome = processor(mocks.into_context()).process(&locator).await;

        assert!(matches!(outcome, ProcessingOutcome::Completed { metric_count: 2 }));
    }

    #[tokio::test]
    async fn test_missing_object_abandons_at_fetch() {
        let mut mocks = Mocks::new();
        mocks
            .store
            .expect_get()
            .times(1)
            .returning(|l| Err(IngestError::ObjectNotFound(l.to_string())));
        mocks.decoder.expect_decode().times(0);
        mocks.sink.expect_add_metric().times(0);

        let outcome = processor(mocks.into_context())
            .process(&ObjectLocator::new("bucket", "gone"))
            .await;

        assert!(matches!(
            outcome,
            ProcessingOutcome::Abandoned {
                stage: ProcessingStage::Fetch,
                error: IngestError::ObjectNotFound(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        struct SlowStore;

        #[async_trait::async_trait]
        impl common::domain::ObjectStore for SlowStore {
            async fn get(&self, _: &ObjectLocator) -> common::domain::IngestResult<Bytes> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Bytes::new())
            }
        }

        let mut context = Mocks::new().build();
        context.store = Arc::new(SlowStore);

        let outcome = processor(Arc::new(context))
            .process(&ObjectLocator::new("bucket", "slow"))
            .await;

        assert!(matches!(
            outcome,
            ProcessingOutcome::Abandoned {
                stage: ProcessingStage::Fetch,
                error: IngestError::TransientFetch(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_parse_failure_emits_nothing() {
        let mut mocks = Mocks::new();
        mocks
            .store
            .expect_get()
            .returning(|_| Ok(Bytes::from_static(b"garbage")));
        mocks.decoder.expect_decode().returning(|content, _| Ok(content));
        mocks
            .parser
            .expect_parse()
            .returning(|_| Err(IngestError::MalformedContent("line 1: expected value".into())));
        mocks.sink.expect_add_metric().times(0);

        let outcome = processor(mocks.into_context())
            .process(&ObjectLocator::new("bucket", "bad.json"))
            .await;

        assert!(matches!(
            outcome,
            ProcessingOutcome::Abandoned {
                stage: ProcessingStage::Parse,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_decode_failure_abandons_at_decode() {
        let mut mocks = Mocks::new();
        mocks.store.expect_get().returning(|_| Ok(Bytes::from_static(b"x")));
        mocks
            .decoder
            .expect_decode()
            .returning(|_, _| Err(IngestError::Decode("bad frame".into())));
        mocks.parser.expect_parse().times(0);

        let outcome = processor(mocks.into_context())
            .process(&ObjectLocator::new("bucket", "k"))
            .await;

        assert!(matches!(
            outcome,
            ProcessingOutcome::Abandoned {
                stage: ProcessingStage::Decode,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sink_failure_abandons_at_emit() {
        let mut mocks = Mocks::new();
        mocks.store.expect_get().returning(|_| Ok(Bytes::from_static(b"x")));
        mocks.decoder.expect_decode().returning(|content, _| Ok(content));
        mocks
            .parser
            .expect_parse()
            .returning(|_| Ok(vec![metric("cpu"), metric("mem")]));
        mocks
            .sink
            .expect_add_metric()
            .times(1)
            .returning(|_| Err(IngestError::Sink("closed".into())));

        let outcome = processor(mocks.into_context())
            .process(&ObjectLocator::new("bucket", "k"))
            .await;

        assert!(matches!(
            outcome,
            ProcessingOutcome::Abandoned {
                stage: ProcessingStage::Emit,
                error: IngestError::Sink(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_run_survives_failures_and_deletes_successful_messages() {
        let mut mocks = Mocks::new();
        mocks.store.expect_get().returning(|locator| {
            if locator.object_key == "bad" {
                Err(IngestError::ObjectAccessDenied(locator.to_string()))
            } else {
                Ok(Bytes::from_static(b"x"))
            }
        });
        mocks.decoder.expect_decode().returning(|content, _| Ok(content));
        mocks.parser.expect_parse().returning(|_| Ok(vec![metric("cpu")]));
        mocks.sink.expect_add_metric().times(1).returning(|_| Ok(()));

        let mut receipt_queue = MockQueueClient::new();
        receipt_queue
            .expect_delete()
            .withf(|_, handle| handle == "handle-good")
            .times(1)
            .returning(|_, _| Ok(()));
        let receipt_queue: Arc<dyn common::domain::QueueClient> = Arc::new(receipt_queue);

        let context = mocks.into_context();
        let (tx, rx) = work_queue(4);

        for key in ["bad", "good"] {
            let message = RawMessage {
                message_id: Some(key.to_string()),
                receipt_handle: format!("handle-{}", key),
                body: Bytes::new(),
            };
            let receipt = MessageReceipt::new(Arc::clone(&receipt_queue), queue_ref(), &message, 1);
            tx.push(WorkItem::new(ObjectLocator::new("bucket", key), receipt))
                .await
                .unwrap();
        }
        drop(tx);

        ObjectProcessor::new(1, context, rx).run().await.unwrap();
    }
}
