//! Boundary to the remote backend service.
//!
//! The containers only ever see these traits; [`crate::http::ServiceClient`]
//! is the production implementation.

use async_trait::async_trait;
use serde_json::Value;
use shared::{domain::Identity, error::RemoteError, protocol::AuthChange};
use tokio::sync::broadcast;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Current user, or `None` when no session is held.
    async fn get_user(&self) -> RemoteResult<Option<Identity>>;
    async fn sign_up(&self, email: &str, password: &str) -> RemoteResult<()>;
    async fn sign_in_with_password(&self, email: &str, password: &str) -> RemoteResult<()>;
    async fn sign_out(&self) -> RemoteResult<()>;
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChange>;
}

#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> RemoteResult<Vec<Value>>;
    /// Inserts one row and returns it as stored, including generated columns.
    async fn insert_single(&self, table: &str, row: Value) -> RemoteResult<Value>;
    async fn update(&self, table: &str, patch: Value, query: &Query) -> RemoteResult<()>;
    async fn delete(&self, table: &str, query: &Query) -> RemoteResult<()>;
}

/// Message mirrored into a container's error field; never empty.
pub(crate) fn error_text(err: &RemoteError) -> String {
    if err.message.trim().is_empty() {
        format!("remote request failed ({:?})", err.code)
    } else {
        err.message.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Equality filters plus an optional ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<(String, String)>,
    order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Value the row must hold in `column` for every filter on that column.
    pub fn eq_value(&self, column: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// True when `row` satisfies every equality filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(column, expected)| match row.get(column) {
            Some(Value::String(actual)) => actual == expected,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *expected,
        })
    }

    /// Query-string pairs in the data API's filter syntax.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|(column, value)| (column.clone(), format!("eq.{value}")))
            .collect();
        if let Some(order) = &self.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_filters_and_descending_order() {
        let query = Query::new().eq("id", "42").order("date", false);
        assert_eq!(
            query.to_pairs(),
            vec![
                ("id".to_string(), "eq.42".to_string()),
                ("order".to_string(), "date.desc".to_string()),
            ]
        );
    }

    #[test]
    fn matches_string_and_numeric_columns() {
        let query = Query::new().eq("id", "7");
        assert!(query.matches(&json!({"id": "7"})));
        assert!(query.matches(&json!({"id": 7})));
        assert!(!query.matches(&json!({"id": "8"})));
        assert!(!query.matches(&json!({"title": "no id"})));
    }
}
