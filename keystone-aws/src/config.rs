//! AWS configuration.

use serde::{Deserialize, Serialize};

use crate::{AwsError, Result};

/// Region used when nothing else is configured.
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// LocalStack edge endpoint.
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// Credentials source for AWS authentication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsSource {
    /// Use AWS profile from ~/.aws/credentials.
    Profile(String),
    /// Use explicit credentials.
    Explicit {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// Auto-detect credentials (default AWS SDK behavior).
    #[default]
    Auto,
}

/// AWS SDK configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region.
    pub region: Option<String>,
    /// Credentials source.
    #[serde(default)]
    pub credentials: CredentialsSource,
    /// Custom endpoint URL (for LocalStack, DynamoDB Local, etc.).
    pub endpoint_url: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: Some(DEFAULT_REGION.to_string()),
            credentials: CredentialsSource::Auto,
            endpoint_url: None,
        }
    }
}

impl AwsConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder.
    pub fn builder() -> AwsConfigBuilder {
        AwsConfigBuilder::new()
    }

    /// Check the configuration before handing it to the SDK.
    ///
    /// The endpoint is passed through as given; a malformed one fails when
    /// the first request is sent.
    pub fn validate(&self) -> Result<()> {
        if matches!(&self.region, Some(region) if region.trim().is_empty()) {
            return Err(AwsError::RegionNotSpecified);
        }

        Ok(())
    }
}

/// Builder for AWS configuration.
#[derive(Default)]
pub struct AwsConfigBuilder {
    config: AwsConfig,
}

impl AwsConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Set the credentials source.
    pub fn credentials(mut self, credentials: CredentialsSource) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Use explicit credentials.
    pub fn explicit_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.config.credentials = CredentialsSource::Explicit {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        };
        self
    }

    /// Use a named profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config.credentials = CredentialsSource::Profile(profile.into());
        self
    }

    /// Set a custom endpoint URL.
    ///
    /// An empty string leaves endpoint resolution to the SDK.
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.endpoint_url = if url.is_empty() { None } else { Some(url) };
        self
    }

    /// Configure for LocalStack.
    ///
    /// LocalStack accepts any credentials, so dummy ones are installed unless
    /// credentials were already chosen.
    pub fn localstack(self) -> Self {
        let builder = self.endpoint_url(LOCALSTACK_ENDPOINT);
        if builder.config.credentials == CredentialsSource::Auto {
            builder.explicit_credentials("test", "test")
        } else {
            builder
        }
    }

    /// Build the configuration.
    pub fn build(self) -> AwsConfig {
        self.config
    }
}
