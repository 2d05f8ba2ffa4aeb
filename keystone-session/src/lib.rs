//! Session storage on DynamoDB.
//!
//! Sessions live in a table keyed by a partition key (`id`, the owning
//! subject) and a sort key (`sessionId`, the session instance). Each record
//! carries a human-readable `expire` timestamp and a `ttl` epoch-seconds
//! twin that the store's native TTL feature uses to evict it.
//!
//! Three operations are provided by [`SessionTable`]:
//!
//! - [`create`](SessionTable::create) - unconditional put of a full record
//! - [`fetch_unexpired`](SessionTable::fetch_unexpired) - key lookup that only
//!   matches while `expire` is after a reference time
//! - [`refresh_expiration`](SessionTable::refresh_expiration) - conditional
//!   update that slides the one-hour window and never creates an item
//!
//! # Examples
//!
//! ## DynamoDB (or LocalStack)
//!
//! ```no_run
//! use keystone_session::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let config = SessionConfig::new("Session").localstack();
//!     let table = SessionTable::connect(config).await?;
//!
//!     let session = Session::new("1234", generate_session_id());
//!     table.create(&session).await?;
//!
//!     match table.fetch_active(&session.id, &session.session_id).await {
//!         Ok(found) => println!("expires at {}", found.expire),
//!         Err(e) if e.is_not_found() => println!("please log in again"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## In memory
//!
//! ```
//! use keystone_session::*;
//! use keystone_session::memory::{KeySchema, MemoryStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), SessionError> {
//! let store = MemoryStore::new().with_table("Session", KeySchema::new("id", "sessionId"));
//! let table = SessionTable::with_store(store, "Session")?;
//!
//! let session = Session::new("1234", "abcde");
//! table.create(&session).await?;
//! assert_eq!(table.fetch_active("1234", "abcde").await?, session);
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod config;
pub mod dynamodb;
pub mod error;
pub mod expression;
pub mod memory;
pub mod session;
pub mod store;
pub mod table;

pub use config::SessionConfig;
pub use dynamodb::DynamoDbStore;
pub use error::{Operation, SessionError, SessionResult, StoreError};
pub use session::{
    Expiry, SESSION_LIFETIME_SECS, Session, TIMESTAMP_FORMAT, format_timestamp,
    generate_session_id, now_timestamp,
};
pub use store::{ItemStore, QueryRequest, StoreResult, UpdateRequest};
pub use table::SessionTable;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::memory::{KeySchema, MemoryStore};
    pub use crate::session::{Session, format_timestamp, generate_session_id};
    pub use crate::store::ItemStore;
    pub use crate::table::SessionTable;
}
