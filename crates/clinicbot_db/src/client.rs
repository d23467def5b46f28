//! Client for the remote data backend's REST gateway.
//!
//! Tables live under `{rest_url}/{table}` and accept PostgREST filters as
//! query parameters (`id=eq.3`); functions live under `{rest_url}/rpc/{name}`.
//! Every request carries the `apikey` header and a bearer token.

use crate::error::DbError;
use clinicbot_config::{AppConfig, DatabaseConfig};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

/// `column=eq.value` filter value.
pub fn eq(value: impl Display) -> String {
    format!("eq.{}", value)
}

#[derive(Debug, Clone)]
pub struct DbClient {
    http: Client,
    rest_url: String,
    api_key: String,
    bearer: String,
    timeout: Duration,
}

impl DbClient {
    /// Build a client from the `database` config section.
    pub fn new(db_config: &DatabaseConfig, http: Client) -> Result<Self, DbError> {
        let rest_url = db_config.rest_url.trim_end_matches('/').to_string();
        if rest_url.is_empty() {
            return Err(DbError::ConfigError("database.rest_url is empty".to_string()));
        }
        if db_config.api_key.is_empty() || db_config.api_key == "secret_from_env" {
            return Err(DbError::ConfigError(
                "database.api_key is not set".to_string(),
            ));
        }
        let bearer = db_config
            .service_key
            .clone()
            .filter(|k| !k.is_empty() && k != "secret_from_env")
            .unwrap_or_else(|| db_config.api_key.clone());

        Ok(Self {
            http,
            rest_url,
            api_key: db_config.api_key.clone(),
            bearer,
            timeout: Duration::from_secs(db_config.request_timeout_secs),
        })
    }

    pub fn from_app_config(config: &AppConfig, http: Client) -> Result<Self, DbError> {
        let db_config = config
            .database
            .as_ref()
            .ok_or_else(|| DbError::ConfigError("Database configuration is missing".to_string()))?;
        Self::new(db_config, http)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .timeout(self.timeout)
    }

    /// Rows of `table` matching `filters`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, DbError> {
        debug!("select {} {:?}", table, filters);
        let response = self
            .request(Method::GET, table)
            .query(filters)
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// One page of rows plus the total count reported in `Content-Range`.
    pub async fn select_page<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        rows: (u64, u64),
    ) -> Result<(Vec<T>, Option<u64>), DbError> {
        debug!("select {} {:?} rows {}-{}", table, filters, rows.0, rows.1);
        let response = self
            .request(Method::GET, table)
            .query(filters)
            .header("Range-Unit", "items")
            .header(header::RANGE, format!("{}-{}", rows.0, rows.1))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check(response).await?;
        let total = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total);
        Ok((decode(response).await?, total))
    }

    /// Patch every row matching `filters` and return the updated rows.
    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, DbError> {
        debug!("update {} {:?}", table, filters);
        let response = self
            .request(Method::PATCH, table)
            .query(filters)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        decode(check(response).await?).await
    }

    /// Invoke a database function.
    pub async fn rpc<A: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<T, DbError> {
        debug!("rpc {}", function);
        let response = self
            .request(Method::POST, &format!("rpc/{}", function))
            .json(args)
            .send()
            .await?;
        decode(check(response).await?).await
    }
}

async fn check(response: Response) -> Result<Response, DbError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);
    warn!("Data backend returned {}: {}", status, message);
    Err(DbError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DbError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| DbError::Decode(e.to_string()))
}

/// Total from a `Content-Range` value like `0-49/1234` or `*/0`.
fn parse_total(content_range: &str) -> Option<u64> {
    content_range.rsplit_once('/')?.1.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total("0-49/1234"), Some(1234));
        assert_eq!(parse_total("*/0"), Some(0));
        assert_eq!(parse_total("0-49/*"), None);
    }

    #[test]
    fn test_placeholder_key_is_rejected() {
        let config = DatabaseConfig {
            rest_url: "https://db.example.com/rest/v1/".to_string(),
            auth_url: None,
            api_key: "secret_from_env".to_string(),
            service_key: None,
            postgres_url: None,
            request_timeout_secs: 5,
        };
        assert!(matches!(
            DbClient::new(&config, Client::new()),
            Err(DbError::ConfigError(_))
        ));
    }
}
