mod connector;
mod credentials;
mod s3_object_store;
mod sqs_queue_client;

pub use connector::*;
pub use credentials::*;
pub use s3_object_store::*;
pub use sqs_queue_client::*;
