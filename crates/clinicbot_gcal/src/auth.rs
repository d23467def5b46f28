// File: crates/clinicbot_gcal/src/auth.rs
//! OAuth2 authorization-code flow against Google, and the calendar hub built
//! from the resulting access token.

use chrono::{Duration, Utc};
use clinicbot_config::GcalConfig;
use google_calendar3::{
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    CalendarHub,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::logic::GcalError;
use crate::token_store::StoredToken;

// Type aliases for clarity
type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type HubType = CalendarHub<Connector>;

/// Read/write access to events and read access to the calendar list.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Build a hub that authenticates every call with `access_token`.
pub fn create_calendar_hub(access_token: String) -> Result<HubType, GcalError> {
    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| GcalError::OAuth(format!("Failed to load TLS roots: {}", e)))?
        .https_or_http()
        .enable_http1()
        .build();

    // Create client without specifying body type
    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(https);

    Ok(CalendarHub::new(client, access_token))
}

/// The consent screen URL for the popup. `state` is echoed back to the callback.
pub fn consent_url(config: &GcalConfig, state: &str) -> Result<String, GcalError> {
    let query = serde_urlencoded::to_string([
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", CALENDAR_SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("include_granted_scopes", "true"),
        ("state", state),
    ])
    .map_err(|e| GcalError::OAuth(e.to_string()))?;
    Ok(format!("{}?{}", config.auth_url, query))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            // refresh responses usually omit the refresh token
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

async fn request_token(
    client: &reqwest::Client,
    config: &GcalConfig,
    form: &[(&str, &str)],
) -> Result<TokenResponse, GcalError> {
    let response = client
        .post(&config.token_url)
        .form(form)
        .send()
        .await
        .map_err(|e| GcalError::OAuth(format!("Token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Token endpoint answered {}: {}", status, body);
        if status.as_u16() == 400 || status.as_u16() == 401 {
            return Err(GcalError::Unauthorized(format!(
                "Google refused the grant ({}): {}",
                status, body
            )));
        }
        return Err(GcalError::OAuth(format!("Token endpoint error {}: {}", status, body)));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| GcalError::OAuth(format!("Failed to parse token response: {}", e)))
}

/// Exchange the authorization code from the callback for tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &GcalConfig,
    code: &str,
) -> Result<StoredToken, GcalError> {
    let response = request_token(
        client,
        config,
        &[
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;

    if response.refresh_token.is_none() {
        warn!("Google did not return a refresh token; the connection will expire");
    }
    info!("Google Calendar authorization completed");
    Ok(response.into_stored(None))
}

/// Use the refresh token to obtain a new access token.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    config: &GcalConfig,
    refresh_token: &str,
) -> Result<StoredToken, GcalError> {
    let response = request_token(
        client,
        config,
        &[
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ],
    )
    .await?;

    info!("Refreshed Google Calendar access token");
    Ok(response.into_stored(Some(refresh_token.to_string())))
}

/// Page served to the OAuth popup. It reports the outcome to the opener
/// window and closes itself.
pub fn callback_page(success: bool, message: &str) -> String {
    let payload = serde_json::json!({
        "type": "gcal-auth",
        "success": success,
        "message": message,
    });
    // `</` inside a script block would end it early
    let payload = payload.to_string().replace("</", "<\\/");
    let title = if success {
        "Google Calendar conectado"
    } else {
        "Falha ao conectar o Google Calendar"
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<p>{title}</p>
<script>
  (function () {{
    var payload = {payload};
    if (window.opener) {{
      window.opener.postMessage(payload, "*");
    }}
    window.close();
  }})();
</script>
</body>
</html>"#
    )
}
