//! Error types for Keystone CLI.

use keystone_session::SessionError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    /// Session store failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Session could not be rendered
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}
