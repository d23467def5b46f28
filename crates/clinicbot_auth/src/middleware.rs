// --- File: crates/clinicbot_auth/src/middleware.rs ---

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use clinicbot_common::{DashboardError, HTTP_CLIENT};
use clinicbot_config::{AppConfig, AuthConfig};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::session::{session_token, AuthUser, RemoteSessionVerifier, SessionVerifier};

/// State shared by both gates.
pub struct AuthState {
    pub verifier: Arc<dyn SessionVerifier>,
    pub config: AuthConfig,
}

impl AuthState {
    pub fn new(verifier: Arc<dyn SessionVerifier>, config: AuthConfig) -> Self {
        Self { verifier, config }
    }

    /// Verifies sessions against `database.auth_url`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        let db_config = config
            .database
            .as_ref()
            .ok_or_else(|| AuthError::Config("database section missing".to_string()))?;
        let verifier = RemoteSessionVerifier::new(db_config, HTTP_CLIENT.clone())?;
        Ok(Self::new(Arc::new(verifier), config.auth.clone()))
    }
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn reject(config: &AuthConfig, req: &Request, err: AuthError) -> Response {
    if wants_html(req.headers()) {
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = match serde_urlencoded::to_string([("redirect_to", target)]) {
            Ok(query) => format!("{}?{}", config.login_path, query),
            Err(_) => config.login_path.clone(),
        };
        return Redirect::to(&location).into_response();
    }
    DashboardError::from(err).into_response()
}

/// Requires a valid session. The verified `AuthUser` is stored in the
/// request extensions for later layers and handlers.
pub async fn session_gate(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(req.headers()) else {
        debug!("No session token on {}", req.uri().path());
        return reject(&state.config, &req, AuthError::MissingToken);
    };

    match state.verifier.verify(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(AuthError::InvalidSession) => reject(&state.config, &req, AuthError::InvalidSession),
        Err(e) => {
            warn!("Session check failed: {}", e);
            DashboardError::from(e).into_response()
        }
    }
}

/// Checks the user's role when `auth.enforce_dashboard_permission` is on;
/// passes everything through otherwise. Must run after `session_gate`.
pub async fn permission_gate(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Response {
    if !state.config.enforce_dashboard_permission {
        return next.run(req).await;
    }

    let Some(user) = req.extensions().get::<AuthUser>() else {
        return reject(&state.config, &req, AuthError::MissingToken);
    };
    let allowed = user
        .role()
        .is_some_and(|role| state.config.allowed_roles.iter().any(|r| r == role));
    if allowed {
        return next.run(req).await;
    }

    warn!("User {} with role {:?} denied dashboard access", user.id, user.role());
    DashboardError::from(AuthError::Forbidden(user.role().map(str::to_string))).into_response()
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = DashboardError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}
