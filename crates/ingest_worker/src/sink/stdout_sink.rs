use async_trait::async_trait;
use common::domain::{IngestError, IngestResult, MetricRecord, MetricSink};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Writes each metric as one JSON line
pub struct StdoutSink<W = Stdout> {
    writer: Mutex<W>,
}

impl StdoutSink<Stdout> {
    pub fn new() -> Self {
        Self::with_writer(tokio::io::stdout())
    }
}

impl Default for StdoutSink<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> MetricSink for StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn add_metric(&self, metric: MetricRecord) -> IngestResult<()> {
        let mut line = serde_json::to_vec(&metric)
            .map_err(|e| IngestError::Sink(format!("failed to serialize metric: {}", e)))?;
        line.push(b'\n');

        // One lock per line so concurrent workers never interleave output
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| IngestError::Sink(format!("failed to write metric: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| IngestError::Sink(format!("failed to flush metric: {}", e)))?;
        Ok(())
    }
}
