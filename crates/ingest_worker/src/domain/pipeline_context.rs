use crate::domain::EventFilter;
use common::domain::{
    ContentDecoder, MetricParser, MetricSink, ObjectStore, QueueClient, QueueRef,
};
use std::sync::Arc;
use std::time::Duration;

/// Collaborators and settings built once at start, then shared read-only by
/// the poller and every worker
pub struct PipelineContext {
    pub queue: Arc<dyn QueueClient>,
    pub queue_ref: QueueRef,
    pub store: Arc<dyn ObjectStore>,
    pub decoder: Arc<dyn ContentDecoder>,
    pub content_encoding: String,
    pub parser: Arc<dyn MetricParser>,
    pub sink: Arc<dyn MetricSink>,
    pub filter: EventFilter,
    pub fetch_timeout: Duration,
}
