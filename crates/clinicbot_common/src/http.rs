// --- File: crates/clinicbot_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{DashboardError, HttpStatusCode};

// Include the client module
pub mod client;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // The dashboard shows `error.message` in its toast.
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "code": status_code.as_u16(),
            }
        }));

        (status_code, body).into_response()
    }
}
