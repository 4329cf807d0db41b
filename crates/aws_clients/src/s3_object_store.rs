use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use bytes::Bytes;
use common::domain::{IngestError, IngestResult, ObjectLocator, ObjectStore};
use tracing::debug;

/// ObjectStore backed by an S3-compatible service
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, locator: &ObjectLocator) -> IngestResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&locator.container_name)
            .key(&locator.object_key)
            .send()
            .await
            .map_err(|e| classify_get_error(locator, e))?;

        let body = output.body.collect().await.map_err(|e| {
            IngestError::TransientFetch(format!("failed to read body of {}: {}", locator, e))
        })?;

        let content = body.into_bytes();
        debug!(locator = %locator, bytes = content.len(), "downloaded object");
        Ok(content)
    }
}

fn classify_get_error(locator: &ObjectLocator, error: SdkError<GetObjectError>) -> IngestError {
    if let Some(service_error) = error.as_service_error() {
        if service_error.is_no_such_key() {
            return IngestError::ObjectNotFound(locator.to_string());
        }
        if service_error.code() == Some("AccessDenied") {
            return IngestError::ObjectAccessDenied(locator.to_string());
        }
    }
    IngestError::TransientFetch(format!(
        "failed to fetch {}: {}",
        locator,
        DisplayErrorContext(&error)
    ))
}
