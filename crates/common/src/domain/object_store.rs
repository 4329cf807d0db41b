use crate::domain::{IngestResult, ObjectLocator};
use async_trait::async_trait;
use bytes::Bytes;

/// Trait for fetching object content
///
/// Implementations should:
/// - Return the full object body
/// - Return ObjectNotFound / ObjectAccessDenied for missing or forbidden objects
/// - Return TransientFetch for connectivity failures
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, locator: &ObjectLocator) -> IngestResult<Bytes>;
}

/// Trait for turning raw object bytes into parseable content
///
/// Codecs are selected by the configured encoding name.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ContentDecoder: Send + Sync {
    /// Whether `encoding` can be decoded; checked once at startup
    fn supports(&self, encoding: &str) -> bool;

    /// Decode `content` that was written with `encoding`
    fn decode(&self, content: Bytes, encoding: &str) -> IngestResult<Bytes>;
}
