#![cfg(feature = "integration-tests")]

use aws_clients::AwsConnector;
use common::domain::{
    ConnectionSettings, CredentialSource, IngestError, ObjectLocator, QueueAttributes,
    ServiceClients, ServiceConnector,
};
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::localstack::LocalStack;

const REGION: &str = "us-east-1";

async fn setup() -> (ContainerAsync<LocalStack>, ConnectionSettings, ServiceClients) {
    let localstack = LocalStack::default().start().await.unwrap();
    let host = localstack.get_host().await.unwrap();
    let port = localstack.get_host_port_ipv4(4566).await.unwrap();

    let settings = ConnectionSettings {
        region: REGION.to_string(),
        credentials: CredentialSource::StaticKeys {
            access_key_id: "test".to_string(),
            secret_access_key: "test".to_string(),
            session_token: None,
        },
        endpoint_url: Some(format!("http://{}:{}", host, port)),
    };

    let clients = AwsConnector::new()
        .connect(&settings)
        .await
        .expect("Failed to connect to LocalStack");

    (localstack, settings, clients)
}

async fn s3_client(settings: &ConnectionSettings) -> aws_sdk_s3::Client {
    let sdk_config = aws_clients::load_sdk_config(settings).await.unwrap();
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_ensure_queue_is_idempotent() {
    let (_container, _settings, clients) = setup().await;

    let attributes = QueueAttributes {
        visibility_timeout_secs: Some(30),
        receive_wait_secs: Some(1),
        tags: [("team".to_string(), "metrics".to_string())].into(),
        ..Default::default()
    };

    let created = clients.queue.ensure_queue("ingest-test", &attributes).await.unwrap();
    let existing = clients.queue.ensure_queue("ingest-test", &attributes).await.unwrap();

    assert_eq!(created, existing);
    assert!(created.url.ends_with("ingest-test"));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_created_queue_carries_tags() {
    let (_container, settings, clients) = setup().await;
    let attributes = QueueAttributes {
        tags: [("team".to_string(), "metrics".to_string())].into(),
        ..Default::default()
    };

    let queue = clients
        .queue
        .ensure_queue("ingest-tagged", &attributes)
        .await
        .unwrap();

    let sdk_config = aws_clients::load_sdk_config(&settings).await.unwrap();
    let tags = aws_sdk_sqs::Client::new(&sdk_config)
        .list_queue_tags()
        .queue_url(&queue.url)
        .send()
        .await
        .unwrap()
        .tags
        .unwrap_or_default();
    assert_eq!(tags.get("team").map(String::as_str), Some("metrics"));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_receive_and_delete_notification() {
    let (_container, settings, clients) = setup().await;
    let queue = clients
        .queue
        .ensure_queue("ingest-roundtrip", &QueueAttributes::default())
        .await
        .unwrap();

    let sdk_config = aws_clients::load_sdk_config(&settings).await.unwrap();
    let sqs = aws_sdk_sqs::Client::new(&sdk_config);
    sqs.send_message()
        .queue_url(&queue.url)
        .message_body(r#"{"Records":[]}"#)
        .send()
        .await
        .unwrap();

    let messages = clients
        .queue
        .receive(&queue, 10, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(&messages[0].body[..], br#"{"Records":[]}"#);

    clients
        .queue
        .delete(&queue, &messages[0].receipt_handle)
        .await
        .unwrap();

    let remaining = clients
        .queue
        .receive(&queue, 10, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_get_object_and_missing_key() {
    let (_container, settings, clients) = setup().await;
    let s3 = s3_client(&settings).await;

    s3.create_bucket().bucket("metrics").send().await.unwrap();
    s3.put_object()
        .bucket("metrics")
        .key("telegraf/cpu.json")
        .body(aws_sdk_s3::primitives::ByteStream::from_static(
            br#"{"name":"cpu","fields":{"usage":1}}"#,
        ))
        .send()
        .await
        .unwrap();

    let content = clients
        .store
        .get(&ObjectLocator::new("metrics", "telegraf/cpu.json"))
        .await
        .unwrap();
    assert_eq!(&content[..], br#"{"name":"cpu","fields":{"usage":1}}"#);

    let missing = clients
        .store
        .get(&ObjectLocator::new("metrics", "telegraf/missing.json"))
        .await;
    assert!(matches!(missing, Err(IngestError::ObjectNotFound(_))));
}
