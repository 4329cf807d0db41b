use common::domain::{
    ConnectionSettings, CredentialOptions, CredentialSource, IngestError, IngestResult,
    QueueAttributes,
};
use common::garde::validate_options;
use common::telemetry::TelemetryConfig;
use config::{Config, Environment, File};
use garde::Validate;
use ingest_worker::domain::IngestPipelineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Prefix of every environment option
pub const ENV_PREFIX: &str = "INGEST";
/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_VAR: &str = "INGEST_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "ingest.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
#[garde(allow_unvalidated)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Connection
    /// Region of the queue and object store
    #[serde(default = "default_region")]
    pub region: String,

    /// Endpoint override for S3/SQS-compatible services
    #[serde(default)]
    pub endpoint_url: Option<String>,

    // Credentials, first configured strategy wins: role, file, static keys
    #[serde(default)]
    pub role_arn: Option<String>,

    #[serde(default)]
    pub role_session_name: Option<String>,

    #[serde(default)]
    pub credentials_path: Option<String>,

    #[serde(default)]
    pub credentials_profile: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub session_token: Option<String>,

    // Object selection
    /// Only accept notifications for this bucket
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub key_prefix: Option<String>,

    #[serde(default)]
    pub key_suffix: Option<String>,

    /// Accepted event-type prefixes (comma-separated)
    #[serde(default = "default_event_types")]
    #[garde(custom(has_list_entry))]
    pub event_types: String,

    // Content
    /// Encoding of stored objects (identity, zstd, lz4)
    #[serde(default = "default_content_encoding")]
    pub content_encoding: String,

    /// Format of decoded objects
    #[serde(default = "default_data_format")]
    pub data_format: String,

    // Queue
    #[serde(default = "default_queue_name")]
    #[garde(length(min = 1))]
    pub queue_name: String,

    #[serde(default)]
    pub queue_visibility_timeout_secs: Option<u32>,

    #[serde(default)]
    pub queue_message_retention_secs: Option<u32>,

    #[serde(default)]
    pub queue_delivery_delay_secs: Option<u32>,

    #[serde(default)]
    pub queue_max_message_size_bytes: Option<u32>,

    /// Long-poll wait per receive call, at most 20
    #[serde(default = "default_queue_receive_wait_secs")]
    #[garde(range(max = 20))]
    pub queue_receive_wait_secs: u32,

    #[serde(default)]
    pub queue_encryption: bool,

    /// Tags for a newly created queue, as `key=value` pairs (comma-separated)
    #[serde(default)]
    #[garde(custom(is_tag_list))]
    pub queue_tags: Option<String>,

    // Pipeline sizing
    /// Capacity of the in-memory work queue
    #[serde(default = "default_prefetch_count")]
    #[garde(range(min = 1))]
    pub prefetch_count: usize,

    /// Messages per receive call (1-10)
    #[serde(default = "default_batch_size")]
    #[garde(range(min = 1, max = 10))]
    pub batch_size: usize,

    #[serde(default = "default_worker_count")]
    #[garde(range(min = 1))]
    pub worker_count: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_poll_error_delay_ms")]
    pub poll_error_delay_ms: u64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    // OpenTelemetry configuration
    /// OpenTelemetry OTLP endpoint (gRPC)
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_event_types() -> String {
    "ObjectCreated:".to_string()
}

fn default_content_encoding() -> String {
    "identity".to_string()
}

fn default_data_format() -> String {
    "json".to_string()
}

fn default_queue_name() -> String {
    "object-ingest".to_string()
}

fn default_queue_receive_wait_secs() -> u32 {
    20
}

fn default_prefetch_count() -> usize {
    10
}

fn default_batch_size() -> usize {
    10
}

fn default_worker_count() -> usize {
    4
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_poll_error_delay_ms() -> u64 {
    5000
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_enabled() -> bool {
    false
}

fn default_otel_service_name() -> String {
    "object-ingest".to_string()
}

fn list_entries(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn has_list_entry(value: &String, _ctx: &()) -> garde::Result {
    if list_entries(value).next().is_none() {
        return Err(garde::Error::new("must name at least one entry"));
    }
    Ok(())
}

fn is_tag_list(value: &Option<String>, _ctx: &()) -> garde::Result {
    let Some(value) = value else {
        return Ok(());
    };
    let invalid = list_entries(value).find(|entry| {
        !matches!(entry.split_once('='), Some((key, _)) if !key.trim().is_empty())
    });
    match invalid {
        Some(entry) => Err(garde::Error::new(format!("expected key=value, got {}", entry))),
        None => Ok(()),
    }
}

impl ServiceConfig {
    /// Load the optional config file, then `INGEST_*` environment overrides,
    /// and validate the result
    pub fn load() -> IngestResult<Self> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config: Self = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| IngestError::Configuration(e.to_string()))?;

        validate_options(&config, ENV_PREFIX)?;
        Ok(config)
    }

    pub fn event_types(&self) -> Vec<String> {
        list_entries(&self.event_types).map(str::to_string).collect()
    }

    pub fn queue_tags(&self) -> BTreeMap<String, String> {
        self.queue_tags
            .as_deref()
            .map(list_entries)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect()
    }

    pub fn credential_source(&self) -> CredentialSource {
        CredentialSource::select(&CredentialOptions {
            role_arn: self.role_arn.clone(),
            role_session_name: self.role_session_name.clone(),
            credentials_path: self.credentials_path.clone(),
            credentials_profile: self.credentials_profile.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            session_token: self.session_token.clone(),
        })
    }

    pub fn pipeline_config(&self) -> IngestPipelineConfig {
        IngestPipelineConfig {
            queue_name: self.queue_name.clone(),
            queue_attributes: QueueAttributes {
                visibility_timeout_secs: self.queue_visibility_timeout_secs,
                message_retention_secs: self.queue_message_retention_secs,
                delivery_delay_secs: self.queue_delivery_delay_secs,
                max_message_size_bytes: self.queue_max_message_size_bytes,
                receive_wait_secs: Some(self.queue_receive_wait_secs),
                encryption: self.queue_encryption,
                tags: self.queue_tags(),
            },
            event_types: self.event_types(),
            container_name: self.bucket.clone(),
            key_prefix: self.key_prefix.clone(),
            key_suffix: self.key_suffix.clone(),
            content_encoding: self.content_encoding.clone(),
            prefetch_count: self.prefetch_count,
            batch_size: self.batch_size,
            worker_count: self.worker_count,
            receive_wait: Duration::from_secs(u64::from(self.queue_receive_wait_secs)),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            poll_error_delay: Duration::from_millis(self.poll_error_delay_ms),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
            connection: ConnectionSettings {
                region: self.region.clone(),
                credentials: self.credential_source(),
                endpoint_url: self.endpoint_url.clone().filter(|url| !url.is_empty()),
            },
        }
    }
}

impl From<&ServiceConfig> for TelemetryConfig {
    fn from(config: &ServiceConfig) -> Self {
        TelemetryConfig {
            service_name: config.otel_service_name.clone(),
            log_level: config.log_level.clone(),
            otlp_endpoint: config
                .otel_enabled
                .then(|| config.otel_endpoint.clone())
                .filter(|endpoint| !endpoint.is_empty()),
        }
    }
}
