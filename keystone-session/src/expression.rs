//! DynamoDB expression builder.
//!
//! Clauses are kept typed so that [`MemoryStore`](crate::memory::MemoryStore)
//! can evaluate them, and rendered into expression strings with `#n` / `:n`
//! placeholders for the real service.
//!
//! ```
//! use aws_sdk_dynamodb::types::AttributeValue;
//! use keystone_session::expression::{Condition, ExpressionBuilder, KeyCondition};
//!
//! let expr = ExpressionBuilder::new()
//!     .with_key_condition(
//!         KeyCondition::partition("id", AttributeValue::S("1234".into()))
//!             .and_sort("sessionId", AttributeValue::S("abcde".into())),
//!     )
//!     .with_filter(Condition::greater_than(
//!         "expire",
//!         AttributeValue::S("2025-02-01 12:40:00".into()),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(expr.key_condition_expression(), Some("#0 = :0 AND #1 = :1"));
//! assert_eq!(expr.filter_expression(), Some("#2 > :2"));
//! ```

use aws_sdk_dynamodb::types::AttributeValue;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::attribute::Item;
use crate::error::{SessionError, SessionResult};

/// Equality on the partition key, optionally narrowed by the sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    partition: (String, AttributeValue),
    sort: Option<(String, AttributeValue)>,
}

impl KeyCondition {
    /// `name = value` on the partition key.
    pub fn partition(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            partition: (name.into(), value),
            sort: None,
        }
    }

    /// Add `name = value` on the sort key.
    pub fn and_sort(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.sort = Some((name.into(), value));
        self
    }

    /// Partition key name and value.
    pub fn partition_key(&self) -> (&str, &AttributeValue) {
        (&self.partition.0, &self.partition.1)
    }

    /// Sort key name and value, if constrained.
    pub fn sort_key(&self) -> Option<(&str, &AttributeValue)> {
        self.sort.as_ref().map(|(name, value)| (name.as_str(), value))
    }

    /// Whether `item` satisfies the key condition.
    pub fn matches(&self, item: &Item) -> bool {
        let eq = |(name, value): &(String, AttributeValue)| {
            item.get(name)
                .is_some_and(|found| compare(found, value) == Some(Ordering::Equal))
        };
        eq(&self.partition) && self.sort.as_ref().is_none_or(eq)
    }

    fn render(&self, aliases: &mut Aliases) -> SessionResult<String> {
        let (name, value) = &self.partition;
        let mut rendered = format!("{} = {}", aliases.name(name)?, aliases.value(value));
        if let Some((name, value)) = &self.sort {
            rendered.push_str(&format!(" AND {} = {}", aliases.name(name)?, aliases.value(value)));
        }
        Ok(rendered)
    }
}

/// Predicate over a single item, used for filters and write conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `name = value`
    Equal { name: String, value: AttributeValue },
    /// `name > value`
    GreaterThan { name: String, value: AttributeValue },
    /// `attribute_exists (name)`
    AttributeExists { name: String },
    /// Both conditions hold.
    And(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn equal(name: impl Into<String>, value: AttributeValue) -> Self {
        Condition::Equal {
            name: name.into(),
            value,
        }
    }

    pub fn greater_than(name: impl Into<String>, value: AttributeValue) -> Self {
        Condition::GreaterThan {
            name: name.into(),
            value,
        }
    }

    pub fn attribute_exists(name: impl Into<String>) -> Self {
        Condition::AttributeExists { name: name.into() }
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    /// Evaluate against `item`; a missing attribute never compares true.
    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Condition::Equal { name, value } => item
                .get(name)
                .is_some_and(|found| compare(found, value) == Some(Ordering::Equal)),
            Condition::GreaterThan { name, value } => item
                .get(name)
                .is_some_and(|found| compare(found, value) == Some(Ordering::Greater)),
            Condition::AttributeExists { name } => item.contains_key(name),
            Condition::And(left, right) => left.evaluate(item) && right.evaluate(item),
        }
    }

    fn render(&self, aliases: &mut Aliases) -> SessionResult<String> {
        Ok(match self {
            Condition::Equal { name, value } => {
                format!("{} = {}", aliases.name(name)?, aliases.value(value))
            }
            Condition::GreaterThan { name, value } => {
                format!("{} > {}", aliases.name(name)?, aliases.value(value))
            }
            Condition::AttributeExists { name } => {
                format!("attribute_exists ({})", aliases.name(name)?)
            }
            Condition::And(left, right) => {
                format!("({}) AND ({})", left.render(aliases)?, right.render(aliases)?)
            }
        })
    }
}

/// Attributes to return from a read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    names: Vec<String>,
}

impl Projection {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Keep only the projected attributes of `item`.
    pub fn apply(&self, item: &Item) -> Item {
        self.names
            .iter()
            .filter_map(|name| item.get(name).map(|value| (name.clone(), value.clone())))
            .collect()
    }

    fn render(&self, aliases: &mut Aliases) -> SessionResult<String> {
        if self.names.is_empty() {
            return Err(SessionError::QueryBuild(
                "projection must name at least one attribute".to_string(),
            ));
        }
        let names = self
            .names
            .iter()
            .map(|name| aliases.name(name))
            .collect::<SessionResult<Vec<_>>>()?;
        Ok(names.join(", "))
    }
}

/// `SET` actions of an update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    sets: Vec<(String, AttributeValue)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `SET name = value`.
    pub fn set(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.sets.push((name.into(), value));
        self
    }

    /// Apply the actions to `item` in place.
    pub fn apply(&self, item: &mut Item) {
        for (name, value) in &self.sets {
            item.insert(name.clone(), value.clone());
        }
    }

    fn render(&self, aliases: &mut Aliases) -> SessionResult<String> {
        if self.sets.is_empty() {
            return Err(SessionError::QueryBuild(
                "update must contain at least one SET action".to_string(),
            ));
        }
        let mut actions = Vec::with_capacity(self.sets.len());
        for (index, (name, value)) in self.sets.iter().enumerate() {
            if self.sets[..index].iter().any(|(seen, _)| seen == name) {
                return Err(SessionError::QueryBuild(format!(
                    "attribute '{name}' is set more than once"
                )));
            }
            actions.push(format!("{} = {}", aliases.name(name)?, aliases.value(value)));
        }
        Ok(format!("SET {}", actions.join(", ")))
    }
}

/// Collects clauses and renders them into an [`Expression`].
#[derive(Debug, Clone, Default)]
pub struct ExpressionBuilder {
    key_condition: Option<KeyCondition>,
    filter: Option<Condition>,
    condition: Option<Condition>,
    projection: Option<Projection>,
    update: Option<Update>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_condition(mut self, key_condition: KeyCondition) -> Self {
        self.key_condition = Some(key_condition);
        self
    }

    pub fn with_filter(mut self, filter: Condition) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_update(mut self, update: Update) -> Self {
        self.update = Some(update);
        self
    }

    /// Render every clause, sharing one set of placeholders.
    pub fn build(self) -> SessionResult<Expression> {
        if self.key_condition.is_none()
            && self.filter.is_none()
            && self.condition.is_none()
            && self.projection.is_none()
            && self.update.is_none()
        {
            return Err(SessionError::QueryBuild(
                "no expression clause was set".to_string(),
            ));
        }

        let mut aliases = Aliases::default();
        let key_condition_expression = self
            .key_condition
            .as_ref()
            .map(|k| k.render(&mut aliases))
            .transpose()?;
        let filter_expression = self
            .filter
            .as_ref()
            .map(|c| c.render(&mut aliases))
            .transpose()?;
        let condition_expression = self
            .condition
            .as_ref()
            .map(|c| c.render(&mut aliases))
            .transpose()?;
        let projection_expression = self
            .projection
            .as_ref()
            .map(|p| p.render(&mut aliases))
            .transpose()?;
        let update_expression = self
            .update
            .as_ref()
            .map(|u| u.render(&mut aliases))
            .transpose()?;

        Ok(Expression {
            clauses: self,
            key_condition_expression,
            filter_expression,
            condition_expression,
            projection_expression,
            update_expression,
            names: aliases.names,
            values: aliases.values,
        })
    }
}

/// Built expression: rendered strings, placeholder maps and typed clauses.
#[derive(Debug, Clone)]
pub struct Expression {
    clauses: ExpressionBuilder,
    key_condition_expression: Option<String>,
    filter_expression: Option<String>,
    condition_expression: Option<String>,
    projection_expression: Option<String>,
    update_expression: Option<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Expression {
    pub fn key_condition_expression(&self) -> Option<&str> {
        self.key_condition_expression.as_deref()
    }

    pub fn filter_expression(&self) -> Option<&str> {
        self.filter_expression.as_deref()
    }

    pub fn condition_expression(&self) -> Option<&str> {
        self.condition_expression.as_deref()
    }

    pub fn projection_expression(&self) -> Option<&str> {
        self.projection_expression.as_deref()
    }

    pub fn update_expression(&self) -> Option<&str> {
        self.update_expression.as_deref()
    }

    /// `#n` placeholder to attribute name.
    pub fn attribute_names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// `:n` placeholder to value.
    pub fn attribute_values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    pub fn key_condition(&self) -> Option<&KeyCondition> {
        self.clauses.key_condition.as_ref()
    }

    pub fn filter(&self) -> Option<&Condition> {
        self.clauses.filter.as_ref()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.clauses.condition.as_ref()
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.clauses.projection.as_ref()
    }

    pub fn update(&self) -> Option<&Update> {
        self.clauses.update.as_ref()
    }
}

#[derive(Default)]
struct Aliases {
    names: HashMap<String, String>,
    by_name: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Aliases {
    fn name(&mut self, name: &str) -> SessionResult<String> {
        if name.is_empty() {
            return Err(SessionError::QueryBuild(
                "attribute name must not be empty".to_string(),
            ));
        }
        if let Some(alias) = self.by_name.get(name) {
            return Ok(alias.clone());
        }
        let alias = format!("#{}", self.names.len());
        self.names.insert(alias.clone(), name.to_string());
        self.by_name.insert(name.to_string(), alias.clone());
        Ok(alias)
    }

    fn value(&mut self, value: &AttributeValue) -> String {
        let alias = format!(":{}", self.values.len());
        self.values.insert(alias.clone(), value.clone());
        alias
    }
}

/// Order two scalar values the way DynamoDB comparators do; values of
/// different types are incomparable.
fn compare(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
    match (left, right) {
        (AttributeValue::S(l), AttributeValue::S(r)) => Some(l.cmp(r)),
        (AttributeValue::N(l), AttributeValue::N(r)) => {
            let (l, r) = (l.parse::<f64>().ok()?, r.parse::<f64>().ok()?);
            l.partial_cmp(&r)
        }
        (AttributeValue::B(l), AttributeValue::B(r)) => Some(l.as_ref().cmp(r.as_ref())),
        (l, r) if l == r => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_query_expression_rendering() {
        let expr = ExpressionBuilder::new()
            .with_key_condition(KeyCondition::partition("id", s("1234")).and_sort("sessionId", s("abcde")))
            .with_projection(Projection::names(["id", "sessionId", "expire"]))
            .with_filter(Condition::greater_than("expire", s("2025-02-01 12:40:00")))
            .build()
            .unwrap();

        assert_eq!(expr.key_condition_expression(), Some("#0 = :0 AND #1 = :1"));
        assert_eq!(expr.filter_expression(), Some("#2 > :2"));
        // Names are reused across clauses
        assert_eq!(expr.projection_expression(), Some("#0, #1, #2"));
        assert_eq!(expr.attribute_names().len(), 3);
        assert_eq!(expr.attribute_names()["#2"], "expire");
        assert_eq!(expr.attribute_values()[":2"], s("2025-02-01 12:40:00"));
        assert!(expr.update_expression().is_none());
    }

    #[test]
    fn test_update_expression_rendering() {
        let expr = ExpressionBuilder::new()
            .with_update(
                Update::new()
                    .set("expire", s("2025-02-01 14:00:00"))
                    .set("ttl", AttributeValue::N("1738386000".into())),
            )
            .with_condition(
                Condition::attribute_exists("id").and(Condition::attribute_exists("sessionId")),
            )
            .build()
            .unwrap();

        assert_eq!(
            expr.condition_expression(),
            Some("(attribute_exists (#0)) AND (attribute_exists (#1))")
        );
        assert_eq!(expr.update_expression(), Some("SET #2 = :0, #3 = :1"));
        assert_eq!(expr.attribute_values().len(), 2);
    }

    #[test]
    fn test_empty_builder_fails() {
        let err = ExpressionBuilder::new().build().unwrap_err();
        assert!(matches!(err, SessionError::QueryBuild(_)));
    }

    #[test]
    fn test_invalid_clauses_fail() {
        let empty_projection = ExpressionBuilder::new()
            .with_projection(Projection::names(Vec::<String>::new()))
            .build();
        assert!(matches!(empty_projection, Err(SessionError::QueryBuild(_))));

        let empty_update = ExpressionBuilder::new().with_update(Update::new()).build();
        assert!(matches!(empty_update, Err(SessionError::QueryBuild(_))));

        let duplicate = ExpressionBuilder::new()
            .with_update(Update::new().set("ttl", s("a")).set("ttl", s("b")))
            .build();
        assert!(matches!(duplicate, Err(SessionError::QueryBuild(_))));

        let unnamed = ExpressionBuilder::new()
            .with_condition(Condition::attribute_exists(""))
            .build();
        assert!(matches!(unnamed, Err(SessionError::QueryBuild(_))));
    }

    #[test]
    fn test_condition_evaluation() {
        let stored = item(&[
            ("id", s("1234")),
            ("expire", s("2025-02-01 13:34:56")),
            ("ttl", AttributeValue::N("1738384496".into())),
        ]);

        assert!(Condition::greater_than("expire", s("2025-02-01 12:40:00")).evaluate(&stored));
        assert!(!Condition::greater_than("expire", s("2025-02-01 13:34:56")).evaluate(&stored));
        assert!(!Condition::greater_than("missing", s("")).evaluate(&stored));
        assert!(Condition::greater_than("ttl", AttributeValue::N("999".into())).evaluate(&stored));
        // Type mismatch never matches
        assert!(!Condition::greater_than("ttl", s("0")).evaluate(&stored));

        let exists = Condition::attribute_exists("id").and(Condition::attribute_exists("sessionId"));
        assert!(!exists.evaluate(&stored));
        assert!(Condition::equal("id", s("1234")).evaluate(&stored));
    }

    #[test]
    fn test_key_condition_and_projection() {
        let stored = item(&[("id", s("1234")), ("sessionId", s("abcde")), ("ttl", AttributeValue::N("1".into()))]);

        assert!(KeyCondition::partition("id", s("1234")).matches(&stored));
        assert!(KeyCondition::partition("id", s("1234")).and_sort("sessionId", s("abcde")).matches(&stored));
        assert!(!KeyCondition::partition("id", s("1234")).and_sort("sessionId", s("abcd")).matches(&stored));

        let projected = Projection::names(["id", "createdAt"]).apply(&stored);
        assert_eq!(projected, item(&[("id", s("1234"))]));
    }

    #[test]
    fn test_update_apply() {
        let mut stored = item(&[("expire", s("old"))]);
        Update::new().set("expire", s("new")).set("ttl", AttributeValue::N("2".into())).apply(&mut stored);
        assert_eq!(stored["expire"], s("new"));
        assert_eq!(stored["ttl"], AttributeValue::N("2".into()));
    }
}
