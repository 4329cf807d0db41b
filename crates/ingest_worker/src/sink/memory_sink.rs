use async_trait::async_trait;
use common::domain::{IngestResult, MetricRecord, MetricSink};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory MetricSink that keeps every metric in arrival order
#[derive(Clone)]
pub struct MemorySink {
    metrics: Arc<RwLock<Vec<MetricRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Snapshot of the metrics received so far
    pub async fn metrics(&self) -> Vec<MetricRecord> {
        self.metrics.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.metrics.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.metrics.read().await.is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSink for MemorySink {
    async fn add_metric(&self, metric: MetricRecord) -> IngestResult<()> {
        let mut metrics = self.metrics.write().await;
        metrics.push(metric);
        Ok(())
    }
}
