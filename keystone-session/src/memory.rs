//! In-process item store.
//!
//! Evaluates the same typed expressions the DynamoDB backend renders, with
//! the service's observable semantics for the primitives a session table
//! uses: key attributes must be present and non-empty, `Limit` counts items
//! before the filter is applied, projections trim attributes, and a
//! conditional update checks and writes under a single lock. Intended for
//! tests and local development.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::attribute::Item;
use crate::error::StoreError;
use crate::store::{ItemStore, QueryRequest, StoreResult, UpdateRequest};

/// Partition and sort key attribute names of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: String,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

/// Key attribute values; only string keys are modelled.
type PrimaryKey = (String, String);

#[derive(Debug)]
struct Table {
    schema: KeySchema,
    items: BTreeMap<PrimaryKey, Item>,
}

impl Table {
    fn key_of(&self, item: &Item) -> StoreResult<PrimaryKey> {
        Ok((
            key_string(item, &self.schema.partition_key)?,
            key_string(item, &self.schema.sort_key)?,
        ))
    }
}

/// [`ItemStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`create_table`](Self::create_table).
    pub fn with_table(self, name: impl Into<String>, schema: KeySchema) -> Self {
        self.create_table(name, schema);
        self
    }

    /// Create (or reset) a table with the given key schema.
    pub fn create_table(&self, name: impl Into<String>, schema: KeySchema) {
        self.tables.write().insert(
            name.into(),
            Table {
                schema,
                items: BTreeMap::new(),
            },
        );
    }

    /// Number of items in `table`, or `None` if it does not exist.
    pub fn len(&self, table: &str) -> Option<usize> {
        self.tables.read().get(table).map(|t| t.items.len())
    }

    /// Raw item lookup by primary key, bypassing expressions.
    pub fn get(&self, table: &str, partition: &str, sort: &str) -> Option<Item> {
        self.tables
            .read()
            .get(table)?
            .items
            .get(&(partition.to_string(), sort.to_string()))
            .cloned()
    }

    /// Remove an item, as TTL eviction would.
    pub fn evict(&self, table: &str, partition: &str, sort: &str) -> Option<Item> {
        self.tables
            .write()
            .get_mut(table)?
            .items
            .remove(&(partition.to_string(), sort.to_string()))
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let table = lookup_mut(&mut tables, table)?;
        let key = table.key_of(&item)?;
        debug!(partition = %key.0, sort = %key.1, "put item");
        table.items.insert(key, item);
        Ok(())
    }

    async fn query(&self, table: &str, request: QueryRequest) -> StoreResult<Vec<Item>> {
        let expr = &request.expression;
        let key_condition = expr.key_condition().ok_or_else(|| {
            StoreError::Validation("query requires a key condition expression".to_string())
        })?;

        let tables = self.tables.read();
        let table = tables
            .get(table)
            .ok_or_else(|| StoreError::ResourceNotFound(format!("table '{table}'")))?;

        let (partition_name, _) = key_condition.partition_key();
        if partition_name != table.schema.partition_key {
            return Err(StoreError::Validation(format!(
                "key condition must use partition key '{}'",
                table.schema.partition_key
            )));
        }
        if let Some((sort_name, _)) = key_condition.sort_key()
            && sort_name != table.schema.sort_key
        {
            return Err(StoreError::Validation(format!(
                "key condition must use sort key '{}'",
                table.schema.sort_key
            )));
        }

        let limit = match request.limit {
            Some(limit) if limit < 1 => {
                return Err(StoreError::Validation("limit must be at least 1".to_string()));
            }
            Some(limit) => limit as usize,
            None => usize::MAX,
        };

        Ok(table
            .items
            .values()
            .filter(|item| key_condition.matches(item))
            .take(limit)
            .filter(|item| expr.filter().is_none_or(|filter| filter.evaluate(item)))
            .map(|item| match expr.projection() {
                Some(projection) => projection.apply(item),
                None => item.clone(),
            })
            .collect())
    }

    async fn update_item(&self, table: &str, request: UpdateRequest) -> StoreResult<Item> {
        let expr = &request.expression;
        let update = expr.update().ok_or_else(|| {
            StoreError::Validation("update requires an update expression".to_string())
        })?;

        let mut tables = self.tables.write();
        let table = lookup_mut(&mut tables, table)?;
        if request.key.len() != 2 {
            return Err(StoreError::Validation(
                "the provided key element does not match the schema".to_string(),
            ));
        }
        let key = table.key_of(&request.key)?;

        let current = table.items.get(&key);
        if let Some(condition) = expr.condition() {
            let empty = Item::new();
            if !condition.evaluate(current.unwrap_or(&empty)) {
                return Err(StoreError::ConditionFailed(
                    "The conditional request failed".to_string(),
                ));
            }
        }

        let mut next = current.cloned().unwrap_or_else(|| request.key.clone());
        update.apply(&mut next);
        if table.key_of(&next)? != key {
            return Err(StoreError::Validation(
                "cannot update attribute that is part of the key".to_string(),
            ));
        }

        debug!(partition = %key.0, sort = %key.1, "update item");
        table.items.insert(key, next.clone());
        Ok(next)
    }
}

fn lookup_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> StoreResult<&'a mut Table> {
    tables
        .get_mut(name)
        .ok_or_else(|| StoreError::ResourceNotFound(format!("table '{name}'")))
}

fn key_string(item: &Item, name: &str) -> StoreResult<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) if !value.is_empty() => Ok(value.clone()),
        Some(AttributeValue::S(_)) => Err(StoreError::Validation(format!(
            "the AttributeValue for key attribute '{name}' cannot contain an empty string value"
        ))),
        Some(_) => Err(StoreError::Validation(format!(
            "key attribute '{name}' must be of type S"
        ))),
        None => Err(StoreError::Validation(format!(
            "missing the key '{name}' in the item"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Condition, ExpressionBuilder, KeyCondition, Projection, Update};

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_table("Session", KeySchema::new("id", "sessionId"))
    }

    fn item(id: &str, session_id: &str, expire: &str) -> Item {
        [("id", s(id)), ("sessionId", s(session_id)), ("expire", s(expire))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn key(id: &str, session_id: &str) -> Item {
        [("id", s(id)), ("sessionId", s(session_id))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[tokio::test]
    async fn test_put_replaces_by_key() {
        let store = store();
        store.put_item("Session", item("1", "a", "x")).await.unwrap();
        store.put_item("Session", item("1", "a", "y")).await.unwrap();
        store.put_item("Session", item("1", "b", "z")).await.unwrap();

        assert_eq!(store.len("Session"), Some(2));
        assert_eq!(store.get("Session", "1", "a").unwrap()["expire"], s("y"));
    }

    #[tokio::test]
    async fn test_put_rejects_bad_keys() {
        let store = store();
        for bad in [item("", "a", "x"), item("1", "", "x")] {
            let err = store.put_item("Session", bad).await.unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }

        let mut missing = item("1", "a", "x");
        missing.remove("sessionId");
        assert!(matches!(
            store.put_item("Session", missing).await,
            Err(StoreError::Validation(_))
        ));

        assert!(matches!(
            store.put_item("Nope", item("1", "a", "x")).await,
            Err(StoreError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_query_with_filter_and_projection() {
        let store = store();
        store.put_item("Session", item("1", "a", "2025-02-01 13:00:00")).await.unwrap();
        store.put_item("Session", item("1", "b", "2025-02-01 11:00:00")).await.unwrap();
        store.put_item("Session", item("2", "a", "2025-02-01 13:00:00")).await.unwrap();

        let expression = ExpressionBuilder::new()
            .with_key_condition(KeyCondition::partition("id", s("1")))
            .with_filter(Condition::greater_than("expire", s("2025-02-01 12:00:00")))
            .with_projection(Projection::names(["sessionId"]))
            .build()
            .unwrap();
        let items = store
            .query("Session", QueryRequest { expression, limit: None })
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].len(), 1);
        assert_eq!(items[0]["sessionId"], s("a"));
    }

    #[tokio::test]
    async fn test_query_limit_applies_before_filter() {
        let store = store();
        // Sorted by sort key: "a" (expired) is evaluated first
        store.put_item("Session", item("1", "a", "2025-02-01 11:00:00")).await.unwrap();
        store.put_item("Session", item("1", "b", "2025-02-01 13:00:00")).await.unwrap();

        let expression = ExpressionBuilder::new()
            .with_key_condition(KeyCondition::partition("id", s("1")))
            .with_filter(Condition::greater_than("expire", s("2025-02-01 12:00:00")))
            .build()
            .unwrap();
        let items = store
            .query("Session", QueryRequest { expression, limit: Some(1) })
            .await
            .unwrap();

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_query_requires_schema_keys() {
        let store = store();
        let expression = ExpressionBuilder::new()
            .with_key_condition(KeyCondition::partition("userId", s("1")))
            .build()
            .unwrap();
        let err = store
            .query("Session", QueryRequest { expression, limit: None })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = store();
        store.put_item("Session", item("1", "a", "old")).await.unwrap();

        let expression = || {
            ExpressionBuilder::new()
                .with_update(Update::new().set("expire", s("new")))
                .with_condition(Condition::attribute_exists("id").and(Condition::attribute_exists("sessionId")))
                .build()
                .unwrap()
        };

        let updated = store
            .update_item("Session", UpdateRequest { key: key("1", "a"), expression: expression() })
            .await
            .unwrap();
        assert_eq!(updated["expire"], s("new"));
        assert_eq!(updated["id"], s("1"));

        let err = store
            .update_item("Session", UpdateRequest { key: key("1", "zzz"), expression: expression() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed(_)));
        assert_eq!(store.len("Session"), Some(1));
    }

    #[tokio::test]
    async fn test_unconditional_update_upserts() {
        let store = store();
        let expression = ExpressionBuilder::new()
            .with_update(Update::new().set("expire", s("x")))
            .build()
            .unwrap();
        let created = store
            .update_item("Session", UpdateRequest { key: key("9", "z"), expression })
            .await
            .unwrap();
        assert_eq!(created.len(), 3);
        assert!(store.get("Session", "9", "z").is_some());
    }

    #[tokio::test]
    async fn test_update_cannot_touch_key() {
        let store = store();
        store.put_item("Session", item("1", "a", "x")).await.unwrap();
        let expression = ExpressionBuilder::new()
            .with_update(Update::new().set("sessionId", s("b")))
            .build()
            .unwrap();
        let err = store
            .update_item("Session", UpdateRequest { key: key("1", "a"), expression })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_evict() {
        let store = store();
        assert!(store.evict("Session", "1", "a").is_none());
        assert_eq!(store.len("Missing"), None);
    }
}
