//! Session record and timestamp helpers.

use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};

/// Format of `createdAt` and `expire`.
///
/// Fixed width, so string order matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sliding expiration window, in seconds.
pub const SESSION_LIFETIME_SECS: i64 = 60 * 60;

/// Partition key attribute.
pub const ID_ATTRIBUTE: &str = "id";
/// Sort key attribute.
pub const SESSION_ID_ATTRIBUTE: &str = "sessionId";
/// Creation timestamp attribute.
pub const CREATED_AT_ATTRIBUTE: &str = "createdAt";
/// Expiration timestamp attribute.
pub const EXPIRE_ATTRIBUTE: &str = "expire";
/// Store-native TTL attribute (epoch seconds).
pub const TTL_ATTRIBUTE: &str = "ttl";

/// Every attribute a session item carries, in projection order.
pub const SESSION_ATTRIBUTES: [&str; 5] = [
    ID_ATTRIBUTE,
    SESSION_ID_ATTRIBUTE,
    CREATED_AT_ATTRIBUTE,
    EXPIRE_ATTRIBUTE,
    TTL_ATTRIBUTE,
];

/// One active user session.
///
/// `(id, session_id)` is the item's composite primary key. `ttl` always
/// encodes the same instant as `expire`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Owning subject (partition key)
    pub id: String,
    /// Session instance under that subject (sort key)
    pub session_id: String,
    /// Creation time, `YYYY-MM-DD HH:MM:SS` local
    pub created_at: String,
    /// Expiration time, `YYYY-MM-DD HH:MM:SS` local
    pub expire: String,
    /// Expiration as Unix epoch seconds
    pub ttl: i64,
}

impl Session {
    /// Create a session stamped with the current local time.
    pub fn new(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::starting_at(id, session_id, Local::now())
    }

    /// Create a session stamped with `at`.
    pub fn starting_at(
        id: impl Into<String>,
        session_id: impl Into<String>,
        at: DateTime<Local>,
    ) -> Self {
        let expiry = Expiry::from_reference(at);
        Self {
            id: id.into(),
            session_id: session_id.into(),
            created_at: format_timestamp(&at),
            expire: expiry.expire,
            ttl: expiry.ttl,
        }
    }

    /// Whether the session is still valid relative to `reference`, a
    /// timestamp in [`TIMESTAMP_FORMAT`].
    pub fn is_active_at(&self, reference: &str) -> bool {
        self.expire.as_str() > reference
    }
}

/// Expiration computed from a reference instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    /// `reference + lifetime`, formatted
    pub expire: String,
    /// `reference + lifetime`, epoch seconds
    pub ttl: i64,
}

impl Expiry {
    /// Compute the expiration one session lifetime after `reference`.
    pub fn from_reference(reference: DateTime<Local>) -> Self {
        let expire_at = reference + TimeDelta::seconds(SESSION_LIFETIME_SECS);
        Self {
            expire: format_timestamp(&expire_at),
            ttl: expire_at.timestamp(),
        }
    }
}

/// Format a local instant the way it is stored.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time in the stored format.
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
