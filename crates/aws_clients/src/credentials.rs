#[allow(deprecated)]
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, ConfigLoader, Region, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use common::domain::{ConnectionSettings, CredentialSource, IngestError, IngestResult};
use tracing::{debug, info};

const STATIC_PROVIDER_NAME: &str = "object-ingest-static";

/// Resolve the configured credential strategy into a shared SDK config.
///
/// Credentials are fetched once here so a bad role or key pair fails at
/// startup instead of on the first receive.
pub async fn load_sdk_config(settings: &ConnectionSettings) -> IngestResult<SdkConfig> {
    let loader = base_loader(settings);

    info!(
        region = %settings.region,
        credentials = settings.credentials.kind(),
        "resolving credentials"
    );

    let sdk_config = match &settings.credentials {
        CredentialSource::AssumeRole {
            role_arn,
            session_name,
        } => {
            let base = base_loader(settings).load().await;
            let provider = AssumeRoleProvider::builder(role_arn)
                .session_name(session_name)
                .region(Region::new(settings.region.clone()))
                .configure(&base)
                .build()
                .await;
            loader.credentials_provider(provider).load().await
        }
        CredentialSource::SharedCredentialsFile { path, profile } => {
            #[allow(deprecated)]
            let files = ProfileFiles::builder()
                .with_file(ProfileFileKind::Credentials, path)
                .build();
            let provider = ProfileFileCredentialsProvider::builder()
                .profile_files(files)
                .profile_name(profile)
                .build();
            loader.credentials_provider(provider).load().await
        }
        CredentialSource::StaticKeys {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                STATIC_PROVIDER_NAME,
            );
            loader.credentials_provider(credentials).load().await
        }
        CredentialSource::DefaultChain => loader.load().await,
    };

    verify_credentials(&sdk_config).await?;
    Ok(sdk_config)
}

fn base_loader(settings: &ConnectionSettings) -> ConfigLoader {
    let loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));
    match &settings.endpoint_url {
        Some(endpoint) => loader.endpoint_url(endpoint),
        None => loader,
    }
}

async fn verify_credentials(sdk_config: &SdkConfig) -> IngestResult<()> {
    let provider: SharedCredentialsProvider = sdk_config.credentials_provider().ok_or_else(|| {
        IngestError::Authentication("no credentials provider configured".to_string())
    })?;

    let credentials = provider
        .provide_credentials()
        .await
        .map_err(|e| IngestError::Authentication(format!("failed to resolve credentials: {}", e)))?;

    debug!(
        expires = credentials.expiry().is_some(),
        "credentials resolved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(credentials: CredentialSource) -> ConnectionSettings {
        ConnectionSettings {
            region: "eu-west-1".to_string(),
            credentials,
            endpoint_url: Some("http://localhost:4566".to_string()),
        }
    }

    #[tokio::test]
    async fn test_static_keys_resolve_without_network() {
        let sdk_config = load_sdk_config(&settings(CredentialSource::StaticKeys {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        }))
        .await
        .unwrap();

        assert_eq!(sdk_config.region().map(|r| r.as_ref()), Some("eu-west-1"));
        assert_eq!(sdk_config.endpoint_url(), Some("http://localhost:4566"));

        let credentials = sdk_config
            .credentials_provider()
            .unwrap()
            .provide_credentials()
            .await
            .unwrap();
        assert_eq!(credentials.access_key_id(), "AKIDEXAMPLE");
    }

    #[tokio::test]
    async fn test_missing_credentials_file_is_an_authentication_error() {
        let result = load_sdk_config(&settings(CredentialSource::SharedCredentialsFile {
            path: "/nonexistent/object-ingest/credentials".to_string(),
            profile: "default".to_string(),
        }))
        .await;

        assert!(matches!(result, Err(IngestError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_named_profile_is_read_from_credentials_file() {
        let path = std::env::temp_dir().join(format!(
            "object-ingest-credentials-{}",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[default]\naws_access_key_id = AKIDDEFAULT\naws_secret_access_key = default-secret\n\n\
             [ingest]\naws_access_key_id = AKIDINGEST\naws_secret_access_key = ingest-secret\n",
        )
        .unwrap();

        let result = load_sdk_config(&settings(CredentialSource::SharedCredentialsFile {
            path: path.to_string_lossy().into_owned(),
            profile: "ingest".to_string(),
        }))
        .await;
        std::fs::remove_file(&path).unwrap();

        let credentials = result
            .unwrap()
            .credentials_provider()
            .unwrap()
            .provide_credentials()
            .await
            .unwrap();
        assert_eq!(credentials.access_key_id(), "AKIDINGEST");
        assert_eq!(credentials.secret_access_key(), "ingest-secret");
    }
}
