//! REST client for the hosted store.
//!
//! Talks to a PostgREST-style API: tables under `/rest/v1/{table}` and
//! database functions under `/rest/v1/rpc/{name}`.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Filter, Store};
use crate::{
    config::{CredentialTier, StoreConfig},
    errors::{ConfigError, StoreError},
    models::Record,
};

/// Database function used for raw SQL execution.
pub const EXEC_SQL_FUNCTION: &str = "exec_sql";

/// PostgREST error code for an unknown function.
const FUNCTION_NOT_FOUND: &str = "PGRST202";

/// Store handle backed by the REST API.
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// Creates a store handle for the given base URL and credential.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Creates a store handle using the credential of the given tier.
    pub fn from_config(config: &StoreConfig, tier: CredentialTier) -> Result<Self, ConfigError> {
        let key = config.credential(tier)?;
        Ok(Self::new(config.base_url(), key))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that the REST root answers with our credential.
    pub async fn check_health(&self) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/", self.base_url);
        let resp = self.authorized(self.client.get(&url)).send().await?;
        check_status(resp).await.map(|_| ())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl Store for RestStore {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let mut query = vec![
            ("select".to_string(), "*".to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        query.extend(filter.to_query());

        debug!("Selecting up to {} rows from {}", limit, table);

        let resp = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query)
            .send()
            .await?;

        read_records(check_status(resp).await?).await
    }

    async fn insert(&self, table: &str, records: &[Record]) -> Result<Vec<Record>, StoreError> {
        debug!("Inserting {} rows into {}", records.len(), table);

        let resp = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(records)
            .send()
            .await?;

        read_records(check_status(resp).await?).await
    }

    async fn execute_raw(&self, sql: &str) -> Result<Vec<Record>, StoreError> {
        #[derive(Serialize)]
        struct ExecSqlRequest<'a> {
            query: &'a str,
        }

        let url = format!("{}/rest/v1/rpc/{}", self.base_url, EXEC_SQL_FUNCTION);
        let resp = self
            .authorized(self.client.post(&url))
            .json(&ExecSqlRequest { query: sql })
            .send()
            .await?;

        // A 404 also carries SQL errors raised inside the function, so only
        // the function-not-found code means the capability is missing
        match check_status(resp).await {
            Err(StoreError::Rejected { body, .. }) if error_code(&body) == Some(FUNCTION_NOT_FOUND) => {
                Err(StoreError::Unsupported(format!(
                    "function {EXEC_SQL_FUNCTION} not available: {body}"
                )))
            }
            Err(e) => Err(e),
            Ok(resp) => read_records(resp).await,
        }
    }
}

/// Maps non-success statuses to store errors.
async fn check_status(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized {
            status: status.as_u16(),
            body,
        });
    }
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// Reads a response body as rows.
///
/// Empty bodies, `null` and scalar results are zero rows.
async fn read_records(resp: Response) -> Result<Vec<Record>, StoreError> {
    let text = resp.text().await?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))?;
    records_from_value(value)
}

fn records_from_value(value: Value) -> Result<Vec<Record>, StoreError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(Record::from(map)),
                other => Err(StoreError::Decode(format!("expected a row object, got {other}"))),
            })
            .collect(),
        Value::Object(map) => Ok(vec![Record::from(map)]),
        _ => Ok(Vec::new()),
    }
}

/// Extracts the `code` field of an error body, if it is JSON.
fn error_code(body: &str) -> Option<&'static str> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("code")?.as_str()? {
        FUNCTION_NOT_FOUND => Some(FUNCTION_NOT_FOUND),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rest_store_trims_base_url() {
        let store = RestStore::new("https://abc.example.co/", "anon");
        assert_eq!(store.base_url(), "https://abc.example.co");
        assert_eq!(store.table_url("teachers"), "https://abc.example.co/rest/v1/teachers");
    }

    #[test]
    fn test_records_from_value() {
        let rows = records_from_value(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(rows.len(), 2);

        let rows = records_from_value(json!({"id": 1})).unwrap();
        assert_eq!(rows.len(), 1);

        assert!(records_from_value(json!(null)).unwrap().is_empty());
        assert!(records_from_value(json!(3)).unwrap().is_empty());
        assert!(matches!(
            records_from_value(json!([1, 2])),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            error_code(r#"{"code":"PGRST202","message":"Could not find the function"}"#),
            Some(FUNCTION_NOT_FOUND)
        );
        assert_eq!(error_code(r#"{"code":"23505"}"#), None);
        assert_eq!(error_code("plain text"), None);
    }
}
