pub mod domain;
pub mod garde;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockContentDecoder;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockMetricParser;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockMetricSink;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockObjectStore;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockQueueClient;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockServiceConnector;
