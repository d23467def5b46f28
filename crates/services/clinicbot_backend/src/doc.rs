// File: crates/services/clinicbot_backend/src/doc.rs

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinicbot API",
        version = "0.1.0",
        description = "Clinic dashboard backend: calendar blocks, automation controls and metrics",
    ),
    components(),
    tags((name = "Clinicbot", description = "Core service endpoints")),
    servers((url = "/api", description = "Main API Prefix")),
)]
struct ApiDoc;

/// Swagger UI at `/api/docs` over the merged document of every compiled-in feature.
pub fn swagger_ui() -> SwaggerUi {
    #[allow(unused_mut)]
    let mut doc = ApiDoc::openapi();
    #[cfg(feature = "gcal")]
    doc.merge(clinicbot_gcal::doc::GcalApiDoc::openapi());
    #[cfg(feature = "dashboard")]
    doc.merge(clinicbot_dashboard::doc::DashboardApiDoc::openapi());

    SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", doc)
}
