//! Hosted Row Store REST Client
//!
//! HTTP client for the BaaS REST endpoint (`{url}/rest/v1/{table}`).
//! Requests carry the key in both the `apikey` header and a bearer
//! `Authorization` header. The service-role key bypasses row-level
//! security and signs every request when configured; otherwise the
//! anon key is used.

use super::{BackendError, BackendResult, Row, RowStore, SelectQuery};
use crate::config::BackendConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// REST client for the hosted row store
pub struct RestClient {
    client: Client,
    config: BackendConfig,
}

impl RestClient {
    /// Create a new client with the given configuration
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(BackendError::Request)?;

        Ok(Self { client, config })
    }

    /// Signing key: the service-role key when configured, else the anon key
    fn key(&self) -> &str {
        match self.config.service_role_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => self.config.anon_key.as_str(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(table)
        )
    }

    fn ensure_configured(&self) -> BackendResult<()> {
        if self.config.url.is_empty() {
            return Err(BackendError::NotConfigured("backend url is empty".to_string()));
        }
        if self.config.anon_key.is_empty() {
            return Err(BackendError::NotConfigured("anon key is empty".to_string()));
        }
        Ok(())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.key();
        request
            .header("apikey", key)
            .bearer_auth(key)
            .header("Accept", "application/json")
    }

    async fn get_rows(&self, table: &str, query: &SelectQuery) -> BackendResult<Vec<Row>> {
        self.ensure_configured()?;

        let request = self
            .client
            .get(self.table_url(table))
            .query(&query.to_query_pairs());

        self.send(self.authorize(request)).await
    }

    async fn delete_rows(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> BackendResult<Vec<Row>> {
        self.ensure_configured()?;

        let filter = SelectQuery::new().eq(column, value.clone());
        let params: Vec<(String, String)> = filter
            .to_query_pairs()
            .into_iter()
            .filter(|(k, _)| k != "select")
            .collect();

        let request = self
            .client
            .delete(self.table_url(table))
            .query(&params)
            .header("Prefer", "return=representation");

        self.send(self.authorize(request)).await
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Vec<Row>> {
        let response = request.send().await.map_err(BackendError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_response(status.as_u16(), &text));
        }

        let text = response.text().await.map_err(BackendError::from_transport)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))?;

        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(BackendError::Decode(format!(
                        "expected object row, got {}",
                        other
                    ))),
                })
                .collect(),
            Value::Object(row) => Ok(vec![row]),
            other => Err(BackendError::Decode(format!(
                "expected array of rows, got {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl RowStore for RestClient {
    fn name(&self) -> &str {
        "rest"
    }

    async fn select(&self, table: &str, query: &SelectQuery) -> BackendResult<Vec<Row>> {
        self.get_rows(table, query).await
    }

    async fn delete_eq(&self, table: &str, column: &str, value: &Value) -> BackendResult<Vec<Row>> {
        self.delete_rows(table, column, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            url: "https://example.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: None,
            request_timeout_ms: 1000,
        }
    }

    #[test]
    fn test_table_url() {
        let client = RestClient::new(config()).unwrap();
        assert_eq!(
            client.table_url("post_comments"),
            "https://example.supabase.co/rest/v1/post_comments"
        );
    }

    #[test]
    fn test_service_role_falls_back_to_anon() {
        let client = RestClient::new(config()).unwrap();
        assert_eq!(client.key(), "anon");

        let mut cfg = config();
        cfg.service_role_key = Some(String::new());
        assert_eq!(RestClient::new(cfg).unwrap().key(), "anon");

        let mut cfg = config();
        cfg.service_role_key = Some("service".to_string());
        let client = RestClient::new(cfg).unwrap();
        assert_eq!(client.key(), "service");
    }

    #[tokio::test]
    async fn test_unconfigured_is_unreachable() {
        let mut cfg = config();
        cfg.url = String::new();
        let client = RestClient::new(cfg).unwrap();

        let err = client
            .select("posts", &SelectQuery::probe())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured(_)));
        assert!(err.is_unreachable());
    }
}
