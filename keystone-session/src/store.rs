//! Backend seam: the three item-level primitives a session table needs.

use async_trait::async_trait;
use std::sync::Arc;

use crate::attribute::Item;
use crate::error::StoreError;
use crate::expression::Expression;

/// Result type for backend requests.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-condition query with optional filter and projection.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Must carry a key condition.
    pub expression: Expression,
    /// Maximum number of items to evaluate, applied before the filter.
    pub limit: Option<i32>,
}

/// Update of one item, returning the item as it is after the write.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Full primary key of the target item.
    pub key: Item,
    /// Must carry an update; may carry a condition.
    pub expression: Expression,
}

/// A managed key-value store addressed by a composite primary key.
///
/// Any store that can put whole items, query by key with a filter and a
/// projection, and conditionally update an item can back a
/// [`SessionTable`](crate::table::SessionTable).
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert or replace `item`.
    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()>;

    /// Items matching the key condition and filter.
    async fn query(&self, table: &str, request: QueryRequest) -> StoreResult<Vec<Item>>;

    /// Apply the update if the condition holds; returns every attribute of
    /// the updated item.
    async fn update_item(&self, table: &str, request: UpdateRequest) -> StoreResult<Item>;
}

#[async_trait]
impl<S: ItemStore + ?Sized> ItemStore for Arc<S> {
    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        (**self).put_item(table, item).await
    }

    async fn query(&self, table: &str, request: QueryRequest) -> StoreResult<Vec<Item>> {
        (**self).query(table, request).await
    }

    async fn update_item(&self, table: &str, request: UpdateRequest) -> StoreResult<Item> {
        (**self).update_item(table, request).await
    }
}
