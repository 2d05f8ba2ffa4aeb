//! DynamoDB backend.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::ReturnValue;
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::debug;

use crate::attribute::Item;
use crate::error::StoreError;
use crate::store::{ItemStore, QueryRequest, StoreResult, UpdateRequest};

/// [`ItemStore`] backed by the AWS SDK DynamoDB client.
///
/// Transport, signing and retries are left to the SDK.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl From<Client> for DynamoDbStore {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl ItemStore for DynamoDbStore {
    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        debug!(table, "PutItem");
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn query(&self, table: &str, request: QueryRequest) -> StoreResult<Vec<Item>> {
        let expr = &request.expression;
        debug!(table, key_condition = ?expr.key_condition_expression(), "Query");

        let output = self
            .client
            .query()
            .table_name(table)
            .set_key_condition_expression(owned(expr.key_condition_expression()))
            .set_filter_expression(owned(expr.filter_expression()))
            .set_projection_expression(owned(expr.projection_expression()))
            .set_expression_attribute_names(non_empty(expr.attribute_names()))
            .set_expression_attribute_values(non_empty(expr.attribute_values()))
            .set_limit(request.limit)
            .send()
            .await
            .map_err(classify)?;

        Ok(output.items().to_vec())
    }

    async fn update_item(&self, table: &str, request: UpdateRequest) -> StoreResult<Item> {
        let expr = &request.expression;
        debug!(table, update = ?expr.update_expression(), "UpdateItem");

        let output = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(request.key))
            .set_update_expression(owned(expr.update_expression()))
            .set_condition_expression(owned(expr.condition_expression()))
            .set_expression_attribute_names(non_empty(expr.attribute_names()))
            .set_expression_attribute_values(non_empty(expr.attribute_values()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(classify)?;

        Ok(output.attributes().cloned().unwrap_or_default())
    }
}

fn owned(expression: Option<&str>) -> Option<String> {
    expression.map(str::to_string)
}

// DynamoDB rejects empty placeholder maps.
fn non_empty<V: Clone>(map: &HashMap<String, V>) -> Option<HashMap<String, V>> {
    (!map.is_empty()).then(|| map.clone())
}

/// Map an SDK failure onto the backend error taxonomy by service error code.
fn classify<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    match code.as_deref() {
        Some("ConditionalCheckFailedException") => StoreError::ConditionFailed(message),
        Some("ValidationException") => StoreError::Validation(message),
        Some("ResourceNotFoundException") => StoreError::ResourceNotFound(message),
        _ => StoreError::Service(message),
    }
}
