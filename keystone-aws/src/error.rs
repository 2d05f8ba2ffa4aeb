//! AWS error types.

use thiserror::Error;

/// Result type for AWS operations.
pub type Result<T> = std::result::Result<T, AwsError>;

/// AWS configuration errors.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Region not specified and none could be resolved from the environment.
    #[error("AWS region not specified")]
    RegionNotSpecified,
}
