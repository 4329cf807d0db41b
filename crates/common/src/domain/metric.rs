use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::result::IngestResult;

/// A single parsed metric, the unit handed to the downstream sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub fields: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Turns decoded object content into metric records
///
/// Implementations should:
/// - Return records in the order they appear in the content
/// - Return MalformedContent if the content cannot be parsed
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait MetricParser: Send + Sync {
    fn parse(&self, content: &[u8]) -> IngestResult<Vec<MetricRecord>>;
}

/// Downstream collector of metric records
///
/// Called concurrently by every worker; implementations must be safe for
/// concurrent writers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn add_metric(&self, metric: MetricRecord) -> IngestResult<()>;
}
