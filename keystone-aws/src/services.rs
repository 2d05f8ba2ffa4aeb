//! AWS services container.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::{AwsConfig, AwsError, CredentialsSource, Result};

/// Container for AWS service clients.
///
/// The SDK configuration is resolved once; the DynamoDB client is created
/// on first use and shared afterwards.
pub struct AwsServices {
    config: AwsConfig,
    sdk_config: aws_config::SdkConfig,
    dynamodb: RwLock<Option<aws_sdk_dynamodb::Client>>,
}

impl AwsServices {
    /// Create a new AWS services container.
    ///
    /// Resolves region and credential providers but does not contact AWS.
    pub async fn new(config: AwsConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let sdk_config = Self::build_sdk_config(&config).await?;

        info!(
            region = ?sdk_config.region(),
            endpoint = ?config.endpoint_url,
            "AWS services initialized"
        );

        Ok(Arc::new(Self {
            config,
            sdk_config,
            dynamodb: RwLock::new(None),
        }))
    }

    /// Build AWS SDK configuration.
    async fn build_sdk_config(config: &AwsConfig) -> Result<aws_config::SdkConfig> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        match &config.credentials {
            CredentialsSource::Profile(profile) => {
                loader = loader.profile_name(profile);
            }
            CredentialsSource::Explicit {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                let creds = aws_credential_types::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    session_token.clone(),
                    None,
                    "explicit",
                );
                loader = loader.credentials_provider(creds);
            }
            CredentialsSource::Auto => {
                // Use default credential chain
            }
        }

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        // DynamoDB endpoints are regional; without a region every call fails.
        if sdk_config.region().is_none() {
            return Err(AwsError::RegionNotSpecified);
        }

        Ok(sdk_config)
    }

    /// Get the configuration.
    pub fn config(&self) -> &AwsConfig {
        &self.config
    }

    /// Get the SDK configuration.
    pub fn sdk_config(&self) -> &aws_config::SdkConfig {
        &self.sdk_config
    }

    /// Get the configured region.
    pub fn region(&self) -> Option<&aws_config::Region> {
        self.sdk_config.region()
    }

    /// Get the DynamoDB client.
    pub fn dynamodb(&self) -> aws_sdk_dynamodb::Client {
        if let Some(client) = self.dynamodb.read().as_ref() {
            return client.clone();
        }

        let mut slot = self.dynamodb.write();
        slot.get_or_insert_with(|| {
            info!("DynamoDB client initialized");
            aws_sdk_dynamodb::Client::new(&self.sdk_config)
        })
        .clone()
    }
}
