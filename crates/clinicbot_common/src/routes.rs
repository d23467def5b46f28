// --- File: crates/clinicbot_common/src/routes.rs ---

use crate::handlers::health_handler;
use axum::{routing::get, Router};

/// Routes shared by every deployment. Mounted outside the session gate.
pub fn routes() -> Router {
    Router::new().route("/health", get(health_handler))
}
