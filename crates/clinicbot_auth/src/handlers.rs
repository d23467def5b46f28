use axum::{routing::get, Json, Router};

use crate::session::AuthUser;

/// The user behind the current session.
pub async fn me_handler(user: AuthUser) -> Json<AuthUser> {
    Json(user)
}

/// Routes that sit behind the session gate.
pub fn routes() -> Router {
    Router::new().route("/auth/me", get(me_handler))
}
