//! Remote tabular store capabilities.
//!
//! [`Store`] is the handle the seeding tools are given: `select` and
//! `insert` are always available, raw SQL execution is optional and
//! reports [`StoreError::Unsupported`] when the backend does not offer it.

mod memory;
mod rest;

pub use memory::{CallLog, MemoryStore, RawSupport};
pub use rest::RestStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::{errors::StoreError, models::Record};

/// Row filter for `select`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every row.
    All,
    /// Rows whose field equals the value.
    Eq { field: String, value: Value },
    /// Rows whose field equals any of the values.
    In { field: String, values: Vec<Value> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In {
            field: field.into(),
            values,
        }
    }

    /// Whether a record passes this filter.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => record.get(field) == Some(value),
            Filter::In { field, values } => record
                .get(field)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
        }
    }

    /// Query parameter in the REST filter syntax (`field=eq.value`).
    pub fn to_query(&self) -> Option<(String, String)> {
        match self {
            Filter::All => None,
            Filter::Eq { field, value } => Some((field.clone(), format!("eq.{}", plain(value)))),
            Filter::In { field, values } => {
                let list = values.iter().map(quoted).collect::<Vec<_>>().join(",");
                Some((field.clone(), format!("in.({list})")))
            }
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// List element, double-quoted so commas and parentheses survive.
fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// A handle to a remote tabular store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns at most `limit` rows of `table` matching `filter`.
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError>;

    /// Inserts all records in one call and returns them as stored,
    /// including store-assigned identities.
    async fn insert(&self, table: &str, records: &[Record]) -> Result<Vec<Record>, StoreError>;

    /// Executes one raw SQL statement and returns whatever rows it produced.
    ///
    /// An empty result is a success. Stores without the capability keep
    /// the default, which reports [`StoreError::Unsupported`].
    async fn execute_raw(&self, _sql: &str) -> Result<Vec<Record>, StoreError> {
        Err(StoreError::Unsupported("raw SQL execution".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_query_eq() {
        let filter = Filter::eq("email", "a@x.com");
        assert_eq!(
            filter.to_query(),
            Some(("email".to_string(), "eq.a@x.com".to_string()))
        );
    }

    #[test]
    fn test_filter_query_in_quotes_values() {
        let filter = Filter::any_of("title", vec![json!("a, b"), json!("say \"hi\""), json!(3)]);
        assert_eq!(
            filter.to_query(),
            Some((
                "title".to_string(),
                r#"in.("a, b","say \"hi\"",3)"#.to_string()
            ))
        );
        assert_eq!(Filter::All.to_query(), None);
    }

    #[test]
    fn test_filter_matches() {
        let record = Record::new().with("email", "a@x.com");
        assert!(Filter::All.matches(&record));
        assert!(Filter::eq("email", "a@x.com").matches(&record));
        assert!(!Filter::eq("email", "b@x.com").matches(&record));
        assert!(Filter::any_of("email", vec![json!("b@x.com"), json!("a@x.com")]).matches(&record));
        assert!(!Filter::any_of("name", vec![json!("a@x.com")]).matches(&record));
    }
}
