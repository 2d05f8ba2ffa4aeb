//! Session table configuration.

use keystone_aws::{AwsConfig, CredentialsSource, DEFAULT_REGION};

use crate::error::{SessionError, SessionResult};

/// Environment variable naming the store endpoint.
pub const ENDPOINT_ENV: &str = "DYNAMODB_ENDPOINT";
/// Environment variable naming the session table.
pub const TABLE_ENV: &str = "DYNAMODB_TABLE";
/// Environment variable naming the AWS region.
pub const REGION_ENV: &str = "AWS_REGION";
/// Fallback for [`REGION_ENV`].
pub const DEFAULT_REGION_ENV: &str = "AWS_DEFAULT_REGION";

/// Where the session table lives.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Store endpoint; `None` uses the SDK's regional endpoint
    pub endpoint: Option<String>,
    /// Table name
    pub table: String,
    /// AWS region
    pub region: String,
    /// AWS credentials
    pub credentials: CredentialsSource,
}

impl SessionConfig {
    /// Create a configuration for `table` in the default region.
    ///
    /// # Examples
    ///
    /// ```
    /// use keystone_session::SessionConfig;
    ///
    /// let config = SessionConfig::new("Session").localstack();
    /// assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
    /// ```
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            table: table.into(),
            region: DEFAULT_REGION.to_string(),
            credentials: CredentialsSource::Auto,
        }
    }

    /// Load from `DYNAMODB_ENDPOINT`, `DYNAMODB_TABLE` and `AWS_REGION` /
    /// `AWS_DEFAULT_REGION` as answered by `lookup`.
    ///
    /// Pass `|key| std::env::var(key).ok()` to read the process environment,
    /// or layer overrides over it.
    pub fn from_lookup<F>(lookup: F) -> SessionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table = lookup(TABLE_ENV).unwrap_or_default();
        let mut config = Self::new(table);

        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            config = config.with_endpoint(endpoint);
        }
        if let Some(region) = lookup(REGION_ENV).or_else(|| lookup(DEFAULT_REGION_ENV)) {
            config = config.with_region(region);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the store endpoint. An empty string clears it.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = (!endpoint.is_empty()).then_some(endpoint);
        self
    }

    /// Set the AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Use static credentials instead of the SDK's provider chain.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = CredentialsSource::Explicit {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        };
        self
    }

    /// Point at a LocalStack edge endpoint on localhost with dummy
    /// credentials.
    pub fn localstack(self) -> Self {
        self.with_endpoint("http://localhost:4566")
            .with_credentials("test", "test")
    }

    /// Reject configurations no table can be bound to.
    pub fn validate(&self) -> SessionResult<()> {
        if self.table.is_empty() {
            return Err(SessionError::Config("empty table name".to_string()));
        }
        Ok(())
    }

    /// SDK configuration for the DynamoDB client.
    pub fn aws_config(&self) -> AwsConfig {
        let mut builder = AwsConfig::builder()
            .region(&self.region)
            .credentials(self.credentials.clone());
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("DYNAMODB_ENDPOINT", "http://localhost:4566"),
            ("DYNAMODB_TABLE", "Session"),
        ]))
        .unwrap();

        assert_eq!(config.table, "Session");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.region, DEFAULT_REGION);
    }

    #[test]
    fn test_from_lookup_region_override() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("DYNAMODB_TABLE", "Session"),
            ("AWS_DEFAULT_REGION", "us-east-1"),
        ]))
        .unwrap();
        assert_eq!(config.region, "us-east-1");
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_missing_table_is_config_error() {
        let err = SessionConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert!(SessionConfig::new("").validate().is_err());
    }

    #[test]
    fn test_aws_config() {
        let aws = SessionConfig::new("Session")
            .with_region("eu-west-1")
            .localstack()
            .aws_config();
        assert_eq!(aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(aws.endpoint_url.as_deref(), Some("http://localhost:4566"));
        assert!(matches!(aws.credentials, CredentialsSource::Explicit { .. }));

        let aws = SessionConfig::new("Session").with_endpoint("").aws_config();
        assert!(aws.endpoint_url.is_none());
    }
}
