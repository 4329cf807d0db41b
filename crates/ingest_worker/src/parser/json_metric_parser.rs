use common::domain::{IngestError, IngestResult, MetricParser, MetricRecord};
use std::sync::Arc;

/// Parses metrics serialized as JSON.
///
/// Accepts either a single JSON array of metrics or newline-delimited JSON
/// with one metric per line. Blank lines are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetricParser;

impl JsonMetricParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_array(&self, content: &[u8]) -> IngestResult<Vec<MetricRecord>> {
        let metrics: Vec<MetricRecord> = serde_json::from_slice(content)
            .map_err(|e| IngestError::MalformedContent(format!("invalid metric array: {}", e)))?;

        for (index, metric) in metrics.iter().enumerate() {
            check_metric(metric).map_err(|reason| {
                IngestError::MalformedContent(format!("element {}: {}", index, reason))
            })?;
        }
        Ok(metrics)
    }

    fn parse_lines(&self, content: &[u8]) -> IngestResult<Vec<MetricRecord>> {
        let mut metrics = Vec::new();

        for (index, line) in content.split(|b| *b == b'\n').enumerate() {
            let line_number = index + 1;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let metric: MetricRecord = serde_json::from_slice(line).map_err(|e| {
                IngestError::MalformedContent(format!("line {}: {}", line_number, e))
            })?;
            check_metric(&metric).map_err(|reason| {
                IngestError::MalformedContent(format!("line {}: {}", line_number, reason))
            })?;
            metrics.push(metric);
        }

        Ok(metrics)
    }
}

impl MetricParser for JsonMetricParser {
    fn parse(&self, content: &[u8]) -> IngestResult<Vec<MetricRecord>> {
        let starts_with_array = content
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'[');

        if starts_with_array {
            self.parse_array(content)
        } else {
            self.parse_lines(content)
        }
    }
}

fn check_metric(metric: &MetricRecord) -> Result<(), &'static str> {
    if metric.name.is_empty() {
        return Err("metric name is empty");
    }
    if metric.fields.is_empty() {
        return Err("metric has no fields");
    }
    Ok(())
}

/// Select the parser for a configured data format
pub fn parser_for_format(data_format: &str) -> IngestResult<Arc<dyn MetricParser>> {
    match data_format.trim().to_ascii_lowercase().as_str() {
        "json" | "ndjson" => Ok(Arc::new(JsonMetricParser::new())),
        other => Err(IngestError::Configuration(format!(
            "unsupported data format: {}",
            other
        ))),
    }
}
