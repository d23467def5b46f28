// --- File: crates/clinicbot_auth/src/session.rs ---
//! Session lookup against the backend auth endpoint.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use clinicbot_config::DatabaseConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::AuthError;

/// Cookie the browser dashboard keeps its access token in.
pub const SESSION_COOKIE: &str = "sb-access-token";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// The signed-in user, as reported by `GET {auth_url}/user`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

impl AuthUser {
    pub fn role(&self) -> Option<&str> {
        self.app_metadata.role.as_deref()
    }
}

#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// The user owning `access_token`, or `InvalidSession`.
    async fn verify(&self, access_token: &str) -> Result<AuthUser, AuthError>;
}

/// Asks the backend auth gateway who owns the token.
pub struct RemoteSessionVerifier {
    http: Client,
    user_url: String,
    api_key: String,
}

impl RemoteSessionVerifier {
    pub fn new(db_config: &DatabaseConfig, http: Client) -> Result<Self, AuthError> {
        let auth_url = db_config
            .auth_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AuthError::Config("database.auth_url is not set".to_string()))?;
        Ok(Self {
            http,
            user_url: format!("{}/user", auth_url),
            api_key: db_config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SessionVerifier for RemoteSessionVerifier {
    async fn verify(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .http
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<AuthUser>()
                .await
                .map_err(|e| AuthError::Upstream(format!("unexpected user payload: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Session rejected by auth gateway");
                Err(AuthError::InvalidSession)
            }
            status => {
                warn!("Auth gateway answered {}", status);
                Err(AuthError::Upstream(format!("status {}", status)))
            }
        }
    }
}

/// Bearer token from `Authorization`, else the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let cookies: HashMap<&str, &str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();
    cookies
        .get(SESSION_COOKIE)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=xyz; lang=pt-BR"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_user_role_from_app_metadata() {
        let user: AuthUser = serde_json::from_value(serde_json::json!({
            "id": "8f1c",
            "email": "recepcao@clinica.com.br",
            "app_metadata": {"provider": "email", "role": "staff"}
        }))
        .unwrap();
        assert_eq!(user.role(), Some("staff"));
    }
}
