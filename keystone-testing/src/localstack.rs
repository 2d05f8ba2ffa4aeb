//! LocalStack fixture for DynamoDB integration tests.
//!
//! [`LocalStack::start`] either reuses an instance named by
//! `LOCALSTACK_ENDPOINT` or launches a fresh container on a free port, then
//! waits until DynamoDB answers requests.

use std::time::{Duration, Instant};

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use keystone_aws::{AwsConfig, AwsServices, DEFAULT_REGION};

use crate::docker::{DockerContainer, DockerError, LocalStackContainer, free_port};

/// Environment variable naming an already running LocalStack.
pub const LOCALSTACK_ENDPOINT_ENV: &str = "LOCALSTACK_ENDPOINT";

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A running LocalStack and a DynamoDB client bound to it.
///
/// A container started by this handle is stopped when it is dropped.
pub struct LocalStack {
    endpoint: String,
    client: Client,
    _container: Option<DockerContainer>,
}

impl LocalStack {
    /// Reuse or start LocalStack and wait for DynamoDB to come up.
    pub async fn start() -> Result<Self, DockerError> {
        if let Ok(endpoint) = std::env::var(LOCALSTACK_ENDPOINT_ENV)
            && !endpoint.is_empty()
        {
            let client = dynamodb_client(&endpoint).await?;
            wait_until_ready(&client, 30).await?;
            return Ok(Self {
                endpoint,
                client,
                _container: None,
            });
        }

        let port = free_port().map_err(|e| DockerError::StartFailed(e.to_string()))?;
        let config = LocalStackContainer::config(port);
        let timeout = config.wait_timeout_secs;

        // pulling and starting block on the docker CLI
        let container = tokio::task::spawn_blocking(move || {
            let mut container = DockerContainer::new(config);
            container.start().map(|_| container)
        })
        .await
        .map_err(|e| DockerError::StartFailed(e.to_string()))??;

        let endpoint = format!("http://127.0.0.1:{}", port);
        let client = dynamodb_client(&endpoint).await?;
        wait_until_ready(&client, timeout).await?;

        Ok(Self {
            endpoint,
            client,
            _container: Some(container),
        })
    }

    /// Edge endpoint, e.g. `http://127.0.0.1:49153`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// DynamoDB client for this instance.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Create a session table named `table`.
    pub async fn create_session_table(&self, table: &str) -> Result<(), DockerError> {
        create_session_table(&self.client, table).await
    }
}

/// DynamoDB client for `endpoint` with LocalStack's dummy credentials.
pub async fn dynamodb_client(endpoint: &str) -> Result<Client, DockerError> {
    client_for(localstack_config(endpoint, DEFAULT_REGION)).await
}

fn localstack_config(endpoint: &str, region: &str) -> AwsConfig {
    AwsConfig::builder()
        .region(region)
        .endpoint_url(endpoint)
        .explicit_credentials("test", "test")
        .build()
}

async fn client_for(config: AwsConfig) -> Result<Client, DockerError> {
    let services = AwsServices::new(config)
        .await
        .map_err(|e| DockerError::Client(e.to_string()))?;
    Ok(services.dynamodb())
}

/// Poll `ListTables` until it succeeds or `timeout_secs` elapse.
pub async fn wait_until_ready(client: &Client, timeout_secs: u64) -> Result<(), DockerError> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        if client.list_tables().send().await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(DockerError::NotReady(timeout_secs));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Create a pay-per-request table keyed by `id` (hash) and `sessionId`
/// (range), both strings.
pub async fn create_session_table(client: &Client, table: &str) -> Result<(), DockerError> {
    let provision = |e: aws_sdk_dynamodb::error::BuildError| DockerError::Provision(e.to_string());

    client
        .create_table()
        .table_name(table)
        .billing_mode(BillingMode::PayPerRequest)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("id")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(provision)?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("sessionId")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(provision)?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("id")
                .key_type(KeyType::Hash)
                .build()
                .map_err(provision)?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("sessionId")
                .key_type(KeyType::Range)
                .build()
                .map_err(provision)?,
        )
        .send()
        .await
        .map_err(|e| {
            DockerError::Provision(aws_sdk_dynamodb::error::DisplayErrorContext(e).to_string())
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_builds_without_network() {
        assert!(dynamodb_client("http://127.0.0.1:1").await.is_ok());
    }

    #[tokio::test]
    async fn test_client_config_failure_is_client_error() {
        let err = client_for(localstack_config("http://127.0.0.1:1", " "))
            .await
            .unwrap_err();
        assert!(matches!(err, DockerError::Client(_)), "{err}");
    }

    #[tokio::test]
    async fn test_wait_until_ready_times_out() {
        let client = dynamodb_client("http://127.0.0.1:1").await.unwrap();
        let err = wait_until_ready(&client, 0).await.unwrap_err();
        assert!(matches!(err, DockerError::NotReady(0)));
    }

    #[tokio::test]
    #[ignore] // Requires Docker
    async fn test_start_and_provision() {
        let stack = LocalStack::start().await.unwrap();
        assert!(stack.endpoint().starts_with("http://"));
        stack.create_session_table("Session_Fixture").await.unwrap();

        let tables = stack.client().list_tables().send().await.unwrap();
        assert!(tables.table_names().iter().any(|t| t == "Session_Fixture"));
    }
}
