//! # Keystone AWS
//!
//! AWS SDK configuration for Keystone: region, credentials and endpoint
//! overrides, and construction of the DynamoDB client the session store
//! talks to.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keystone_aws::{AwsConfig, AwsServices};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AwsConfig::builder()
//!         .region("ap-northeast-1")
//!         .localstack()
//!         .build();
//!
//!     let services = AwsServices::new(config).await?;
//!     let dynamodb = services.dynamodb();
//!     let tables = dynamodb.list_tables().send().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Endpoints
//!
//! The endpoint override is handed to the SDK as given. Leaving it unset
//! uses the regional DynamoDB endpoint.

mod config;
mod error;
mod services;

pub use config::{AwsConfig, AwsConfigBuilder, CredentialsSource, DEFAULT_REGION};
pub use error::{AwsError, Result};
pub use services::AwsServices;

// Re-export AWS crates for convenience
pub use aws_config;
pub use aws_credential_types;
pub use aws_sdk_dynamodb;
