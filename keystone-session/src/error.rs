//! Error types for session operations.

use std::fmt;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Store request that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Unconditional put of a full item.
    PutItem,
    /// Key-condition query with filter and projection.
    Query,
    /// Conditional update returning the new image.
    UpdateItem,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::PutItem => f.write_str("put item"),
            Operation::Query => f.write_str("query"),
            Operation::UpdateItem => f.write_str("update item"),
        }
    }
}

/// Failure reported by an [`ItemStore`](crate::store::ItemStore) backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// A condition expression evaluated to false.
    #[error("conditional check failed: {0}")]
    ConditionFailed(String),

    /// The request was malformed, e.g. an item without its key attributes.
    #[error("validation error: {0}")]
    Validation(String),

    /// The table does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Transport, throttling, or any other service failure.
    #[error("service error: {0}")]
    Service(String),
}

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Expression construction error
    #[error("Build expression error: {0}")]
    QueryBuild(String),

    /// The store rejected or failed to execute a request
    #[error("{operation} error: {source}")]
    Store {
        operation: Operation,
        #[source]
        source: StoreError,
    },

    /// No item matched both the key and the expiration filter
    #[error("Session not found: id={id} sessionId={session_id}")]
    NotFound { id: String, session_id: String },
}

impl SessionError {
    pub(crate) fn store(operation: Operation, source: StoreError) -> Self {
        Self::Store { operation, source }
    }

    /// Whether a conditional write was rejected, e.g. refreshing a session
    /// that does not exist.
    pub fn is_condition_failed(&self) -> bool {
        matches!(
            self,
            SessionError::Store {
                source: StoreError::ConditionFailed(_),
                ..
            }
        )
    }

    /// Whether the error is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound { .. })
    }

    /// The store operation that failed, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            SessionError::Store { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

impl From<keystone_aws::AwsError> for SessionError {
    fn from(err: keystone_aws::AwsError) -> Self {
        SessionError::Config(err.to_string())
    }
}
