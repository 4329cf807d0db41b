use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Malformed notification envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Transient fetch error: {0}")]
    TransientFetch(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Access denied to object: {0}")]
    ObjectAccessDenied(String),

    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Malformed content: {0}")]
    MalformedContent(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Acknowledgement error: {0}")]
    Acknowledgement(String),

    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),
}

impl IngestError {
    /// Errors that prevent the pipeline from starting at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Authentication(_) | Self::UnsupportedEncoding(_)
        )
    }
}
