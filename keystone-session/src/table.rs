//! Session table adapter.

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Local};
use keystone_aws::AwsServices;
use tracing::{debug, warn};

use crate::attribute::{Item, from_item, to_item};
use crate::config::SessionConfig;
use crate::dynamodb::DynamoDbStore;
use crate::error::{Operation, SessionError, SessionResult};
use crate::expression::{Condition, ExpressionBuilder, KeyCondition, Projection, Update};
use crate::session::{
    EXPIRE_ATTRIBUTE, Expiry, ID_ATTRIBUTE, SESSION_ATTRIBUTES, SESSION_ID_ATTRIBUTE, Session,
    TTL_ATTRIBUTE, now_timestamp,
};
use crate::store::{ItemStore, QueryRequest, UpdateRequest};

/// Sessions stored in one table, keyed by `(id, sessionId)`.
///
/// Each operation is a single request to the backend; the adapter keeps no
/// state of its own and can be shared across tasks by reference.
///
/// # Examples
///
/// ```no_run
/// use keystone_session::{Session, SessionTable};
///
/// # async fn example() -> Result<(), keystone_session::SessionError> {
/// let table = SessionTable::new("http://localhost:4566", "Session").await?;
///
/// let session = Session::new("1234", "abcde");
/// table.create(&session).await?;
///
/// let found = table.fetch_unexpired("1234", "abcde", &session.created_at).await?;
/// assert_eq!(found, session);
///
/// let refreshed = table.refresh_expiration("1234", "abcde", chrono::Local::now()).await?;
/// assert_eq!(refreshed.created_at, session.created_at);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionTable<S = DynamoDbStore> {
    store: S,
    table: String,
}

impl SessionTable<DynamoDbStore> {
    /// Bind to `table` behind `endpoint`, in the default region.
    ///
    /// An empty endpoint leaves endpoint resolution to the SDK.
    pub async fn new(endpoint: &str, table: &str) -> SessionResult<Self> {
        Self::connect(SessionConfig::new(table).with_endpoint(endpoint)).await
    }

    /// Bind to the table described by `config`.
    ///
    /// Builds the DynamoDB client; no request is sent.
    pub async fn connect(config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;
        let services = AwsServices::new(config.aws_config()).await?;
        Self::with_store(DynamoDbStore::new(services.dynamodb()), config.table)
    }
}

impl<S: ItemStore> SessionTable<S> {
    /// Bind any backend to `table`.
    pub fn with_store(store: S, table: impl Into<String>) -> SessionResult<Self> {
        let table = table.into();
        if table.is_empty() {
            return Err(SessionError::Config("empty table name".to_string()));
        }
        Ok(Self { store, table })
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert or replace `session`.
    ///
    /// Fails with a store error when `id` or `session_id` is empty, since
    /// the store rejects items with empty key attributes.
    pub async fn create(&self, session: &Session) -> SessionResult<()> {
        let item = to_item(session)?;

        debug!(table = %self.table, id = %session.id, session_id = %session.session_id, "Creating session");
        self.store
            .put_item(&self.table, item)
            .await
            .map_err(|e| SessionError::store(Operation::PutItem, e))
    }

    /// Fetch the session whose `expire` is strictly after `reference`
    /// (`YYYY-MM-DD HH:MM:SS`).
    ///
    /// A missing key, a different session instance, and an expired session
    /// all surface as [`SessionError::NotFound`].
    pub async fn fetch_unexpired(
        &self,
        id: &str,
        session_id: &str,
        reference: &str,
    ) -> SessionResult<Session> {
        let expression = ExpressionBuilder::new()
            .with_key_condition(
                KeyCondition::partition(ID_ATTRIBUTE, string(id))
                    .and_sort(SESSION_ID_ATTRIBUTE, string(session_id)),
            )
            .with_projection(Projection::names(SESSION_ATTRIBUTES))
            .with_filter(Condition::greater_than(EXPIRE_ATTRIBUTE, string(reference)))
            .build()?;

        debug!(table = %self.table, id, session_id, reference, "Fetching session");
        let items = self
            .store
            .query(
                &self.table,
                QueryRequest {
                    expression,
                    limit: Some(1),
                },
            )
            .await
            .map_err(|e| SessionError::store(Operation::Query, e))?;

        match items.into_iter().next() {
            Some(item) => from_item(item),
            None => Err(SessionError::NotFound {
                id: id.to_string(),
                session_id: session_id.to_string(),
            }),
        }
    }

    /// [`fetch_unexpired`](Self::fetch_unexpired) relative to the current
    /// local time.
    pub async fn fetch_active(&self, id: &str, session_id: &str) -> SessionResult<Session> {
        self.fetch_unexpired(id, session_id, &now_timestamp()).await
    }

    /// Move the expiration to one lifetime after `reference` and return the
    /// updated record.
    ///
    /// Only existing items are updated: a missing `(id, session_id)` fails
    /// with a conditional-check error (see
    /// [`SessionError::is_condition_failed`]) instead of creating an item.
    /// The stored expiration is not consulted, so an expired item the store
    /// has not evicted yet is extended as well.
    pub async fn refresh_expiration(
        &self,
        id: &str,
        session_id: &str,
        reference: DateTime<Local>,
    ) -> SessionResult<Session> {
        let expiry = Expiry::from_reference(reference);

        let expression = ExpressionBuilder::new()
            .with_update(
                Update::new()
                    .set(EXPIRE_ATTRIBUTE, string(&expiry.expire))
                    .set(TTL_ATTRIBUTE, AttributeValue::N(expiry.ttl.to_string())),
            )
            .with_condition(
                Condition::attribute_exists(ID_ATTRIBUTE)
                    .and(Condition::attribute_exists(SESSION_ID_ATTRIBUTE)),
            )
            .build()?;

        debug!(table = %self.table, id, session_id, expire = %expiry.expire, "Refreshing session");
        let attributes = self
            .store
            .update_item(
                &self.table,
                UpdateRequest {
                    key: key(id, session_id),
                    expression,
                },
            )
            .await
            .map_err(|e| {
                let err = SessionError::store(Operation::UpdateItem, e);
                if err.is_condition_failed() {
                    warn!(table = %self.table, id, session_id, "Refresh rejected: no such session");
                }
                err
            })?;

        from_item(attributes)
    }
}

fn string(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

fn key(id: &str, session_id: &str) -> Item {
    Item::from([
        (ID_ATTRIBUTE.to_string(), string(id)),
        (SESSION_ID_ATTRIBUTE.to_string(), string(session_id)),
    ])
}
