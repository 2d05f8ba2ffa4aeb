// Keystone - session records in DynamoDB
//
// Sessions are keyed by subject and session ID, expire one hour after they
// are created or refreshed, and are evicted by the table's native TTL.

// Re-export session functionality
pub use keystone_session::*;

// Re-export AWS configuration
pub use keystone_aws;

#[cfg(feature = "testing")]
pub use keystone_testing;

// Prelude for common imports
pub mod prelude {
    pub use keystone_session::prelude::*;
}
