// File: crates/services/clinicbot_backend/src/app.rs

use axum::{middleware::from_fn_with_state, response::IntoResponse, routing::any, Router};
use clinicbot_auth::{permission_gate, session_gate, AuthError, AuthState};
use clinicbot_common::{is_dashboard_enabled, is_gcal_enabled, DashboardError};
use clinicbot_config::AppConfig;
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("auth setup failed: {0}")]
    Auth(#[from] AuthError),

    #[cfg(feature = "gcal")]
    #[error("calendar setup failed: {0}")]
    Gcal(#[from] clinicbot_gcal::logic::GcalError),

    #[error("dashboard setup failed: {0}")]
    Dashboard(#[from] DashboardError),
}

/// Assembles the whole application from the loaded config.
///
/// Everything under `/api` except the health probe and the Google OAuth
/// callback sits behind the session gate. Features that are switched off
/// answer 503 under their prefix.
pub async fn build_app(config: Arc<AppConfig>) -> Result<Router, StartupError> {
    let auth = Arc::new(AuthState::from_config(&config)?);

    #[allow(unused_mut)] // only mutated with the calendar feature on
    let mut public = clinicbot_common::routes();
    let mut protected = clinicbot_auth::handlers::routes();

    #[allow(unused_mut)]
    let mut gcal_mounted = false;
    #[cfg(feature = "gcal")]
    {
        if is_gcal_enabled(&config) {
            let gcal = clinicbot_gcal::routes::routes(config.clone()).await?;
            public = public.merge(gcal.public);
            protected = protected.merge(gcal.protected);
            gcal_mounted = true;
            info!("Google Calendar routes mounted");
        }
    }
    if !gcal_mounted {
        protected = protected.merge(unavailable("gcal"));
    }

    #[allow(unused_mut)]
    let mut dashboard_mounted = false;
    #[cfg(feature = "dashboard")]
    {
        if is_dashboard_enabled(&config) {
            protected = protected.merge(clinicbot_dashboard::routes::routes(config.clone())?);
            dashboard_mounted = true;
            info!("Dashboard routes mounted");
        }
    }
    if !dashboard_mounted {
        protected = protected.merge(unavailable("dashboard"));
    }

    #[allow(unused_mut)] // only mutated with the openapi feature on
    let mut app = compose(auth, public, protected);

    #[cfg(feature = "openapi")]
    {
        info!("Adding Swagger UI at /api/docs");
        app = app.merge(crate::doc::swagger_ui());
    }

    if let Some(dir) = config.server.static_dir.as_deref() {
        info!("Serving dashboard frontend from {}", dir);
        let index = format!("{}/index.html", dir.trim_end_matches('/'));
        app = app.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)));
    }

    Ok(app)
}

/// Nests both route sets under `/api`, gating the protected ones.
///
/// `session_gate` runs first and hands the user to `permission_gate`.
pub fn compose(auth: Arc<AuthState>, public: Router, protected: Router) -> Router {
    let protected = protected
        .layer(from_fn_with_state(auth.clone(), permission_gate))
        .layer(from_fn_with_state(auth, session_gate));
    Router::new().nest("/api", public.merge(protected))
}

fn unavailable(feature: &'static str) -> Router {
    Router::new().route(
        &format!("/{}/{{*rest}}", feature),
        any(move || async move {
            DashboardError::UnavailableError(format!("{} is disabled", feature)).into_response()
        }),
    )
}
