use crate::{load_sdk_config, S3ObjectStore, SqsQueueClient};
use async_trait::async_trait;
use common::domain::{ConnectionSettings, IngestResult, ServiceClients, ServiceConnector};
use std::sync::Arc;
use tracing::info;

/// Builds SQS and S3 clients from one resolved SDK config
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsConnector;

impl AwsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceConnector for AwsConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> IngestResult<ServiceClients> {
        let sdk_config = load_sdk_config(settings).await?;

        let sqs = aws_sdk_sqs::Client::new(&sdk_config);

        // Emulators and gateways generally only serve path-style bucket URLs
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.endpoint_url.is_some())
            .build();
        let s3 = aws_sdk_s3::Client::from_conf(s3_config);

        info!(
            region = %settings.region,
            custom_endpoint = settings.endpoint_url.is_some(),
            "connected to queue and object store"
        );

        Ok(ServiceClients {
            queue: Arc::new(SqsQueueClient::new(sqs)),
            store: Arc::new(S3ObjectStore::new(s3)),
        })
    }
}
