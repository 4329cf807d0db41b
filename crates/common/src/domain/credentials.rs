use crate::domain::{IngestResult, ObjectStore, QueueClient};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// How credentials for the queue and object store are obtained
#[derive(Clone, PartialEq)]
pub enum CredentialSource {
    /// Assume a role on top of the default chain
    AssumeRole {
        role_arn: String,
        session_name: String,
    },
    /// Read a named profile from a shared credentials file
    SharedCredentialsFile { path: String, profile: String },
    /// Explicit access keys
    StaticKeys {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// Environment variables, default profile files, instance metadata
    DefaultChain,
}

/// Raw credential options as they appear in configuration
#[derive(Debug, Clone, Default)]
pub struct CredentialOptions {
    pub role_arn: Option<String>,
    pub role_session_name: Option<String>,
    pub credentials_path: Option<String>,
    pub credentials_profile: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

const DEFAULT_SESSION_NAME: &str = "object-ingest";
const DEFAULT_PROFILE: &str = "default";

impl CredentialSource {
    /// Pick a strategy from configured options.
    ///
    /// Precedence: role, then shared credentials file, then static keys,
    /// falling back to the default chain. Empty strings count as unset.
    pub fn select(options: &CredentialOptions) -> Self {
        let set = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(String::from);

        if let Some(role_arn) = set(&options.role_arn) {
            return Self::AssumeRole {
                role_arn,
                session_name: set(&options.role_session_name)
                    .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            };
        }

        if let Some(path) = set(&options.credentials_path) {
            return Self::SharedCredentialsFile {
                path,
                profile: set(&options.credentials_profile)
                    .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            };
        }

        if let (Some(access_key_id), Some(secret_access_key)) =
            (set(&options.access_key_id), set(&options.secret_access_key))
        {
            return Self::StaticKeys {
                access_key_id,
                secret_access_key,
                session_token: set(&options.session_token),
            };
        }

        Self::DefaultChain
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::AssumeRole { .. } => "assume_role",
            Self::SharedCredentialsFile { .. } => "shared_credentials_file",
            Self::StaticKeys { .. } => "static_keys",
            Self::DefaultChain => "default_chain",
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssumeRole {
                role_arn,
                session_name,
            } => f
                .debug_struct("AssumeRole")
                .field("role_arn", role_arn)
                .field("session_name", session_name)
                .finish(),
            Self::SharedCredentialsFile { path, profile } => f
                .debug_struct("SharedCredentialsFile")
                .field("path", path)
                .field("profile", profile)
                .finish(),
            Self::StaticKeys { access_key_id, .. } => f
                .debug_struct("StaticKeys")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .finish_non_exhaustive(),
            Self::DefaultChain => f.write_str("DefaultChain"),
        }
    }
}

/// Everything needed to reach the queue and object store services
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub region: String,
    pub credentials: CredentialSource,
    /// Override for compatible endpoints (local emulators, gateways)
    pub endpoint_url: Option<String>,
}

/// Clients produced by a connector, shared by the poller and all workers
#[derive(Clone)]
pub struct ServiceClients {
    pub queue: Arc<dyn QueueClient>,
    pub store: Arc<dyn ObjectStore>,
}

/// Resolves credentials once and builds the service clients
///
/// Implementations should return Authentication when the credential
/// strategy cannot produce valid credentials.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ServiceConnector: Send + Sync {
    async fn connect(&self, settings: &ConnectionSettings) -> IngestResult<ServiceClients>;
}
