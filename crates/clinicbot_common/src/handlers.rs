// --- File: crates/clinicbot_common/src/handlers.rs ---

use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub time: String,
}

/// Liveness probe.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        time: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use crate::routes::routes;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_route_returns_ok() {
        let response = routes()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router should respond");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
