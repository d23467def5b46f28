// File: crates/clinicbot_dashboard/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use clinicbot_common::DashboardError;
use clinicbot_db::models::{
    Alert, Appointment, AppointmentStatus, ClientControl, DashboardSummary, HeatmapCell, LogPage,
    LogQuery, TrendPoint, WorkflowControl,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::logic::DashboardService;
use crate::poller::QueryState;

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct LogsParams {
    /// 1-based, defaults to 1
    pub page: Option<u32>,
    /// Defaults to 50, capped at 100
    pub page_size: Option<u32>,
    /// Exact phone number
    pub phone: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AppointmentsParams {
    pub status: Option<AppointmentStatus>,
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/summary",
    responses((status = 200, description = "Cached summary: {loading, data, error, updated_at}")),
    tag = "Dashboard"
))]
pub async fn summary_handler(
    State(service): State<Arc<DashboardService>>,
) -> Json<QueryState<DashboardSummary>> {
    Json(service.summary.snapshot().await)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/alerts",
    responses((status = 200, description = "Cached alerts")),
    tag = "Dashboard"
))]
pub async fn alerts_handler(
    State(service): State<Arc<DashboardService>>,
) -> Json<QueryState<Vec<Alert>>> {
    Json(service.alerts.snapshot().await)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/trends",
    responses((status = 200, description = "Cached daily message counts")),
    tag = "Dashboard"
))]
pub async fn trends_handler(
    State(service): State<Arc<DashboardService>>,
) -> Json<QueryState<Vec<TrendPoint>>> {
    Json(service.trends.snapshot().await)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/heatmap",
    responses((status = 200, description = "Cached weekday/hour message counts")),
    tag = "Dashboard"
))]
pub async fn heatmap_handler(
    State(service): State<Arc<DashboardService>>,
) -> Json<QueryState<Vec<HeatmapCell>>> {
    Json(service.heatmap.snapshot().await)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/bot",
    responses((status = 200, description = "Cached bot activation state")),
    tag = "Dashboard"
))]
pub async fn bot_status_handler(
    State(service): State<Arc<DashboardService>>,
) -> Json<QueryState<ClientControl>> {
    Json(service.bot_status.snapshot().await)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/dashboard/bot",
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Updated control row", body = ClientControl),
        (status = 502, description = "Data backend failed")
    ),
    tag = "Dashboard"
))]
pub async fn set_bot_active_handler(
    State(service): State<Arc<DashboardService>>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<ClientControl>, DashboardError> {
    Ok(Json(service.set_bot_active(payload.active).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/workflows",
    responses((status = 200, description = "Cached workflow switches")),
    tag = "Dashboard"
))]
pub async fn workflows_handler(
    State(service): State<Arc<DashboardService>>,
) -> Json<QueryState<Vec<WorkflowControl>>> {
    Json(service.workflows.snapshot().await)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/dashboard/workflows/{id}",
    params(("id" = i64, Path, description = "workflow_control id")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Updated workflow", body = WorkflowControl),
        (status = 404, description = "No workflow with this id")
    ),
    tag = "Dashboard"
))]
pub async fn set_workflow_active_handler(
    State(service): State<Arc<DashboardService>>,
    Path(id): Path<i64>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<WorkflowControl>, DashboardError> {
    Ok(Json(service.set_workflow_active(id, payload.active).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/appointments",
    params(AppointmentsParams),
    responses((status = 200, description = "Cached upcoming appointments")),
    tag = "Dashboard"
))]
pub async fn appointments_handler(
    State(service): State<Arc<DashboardService>>,
    Query(params): Query<AppointmentsParams>,
) -> Json<QueryState<Vec<Appointment>>> {
    Json(service.appointments_with_status(params.status).await)
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/dashboard/logs",
    params(LogsParams),
    responses((status = 200, description = "Conversation log page, newest first", body = LogPage)),
    tag = "Dashboard"
))]
pub async fn logs_handler(
    State(service): State<Arc<DashboardService>>,
    Query(params): Query<LogsParams>,
) -> Result<Json<LogPage>, DashboardError> {
    let query = LogQuery {
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(LogQuery::DEFAULT_PAGE_SIZE),
        phone: params.phone,
    };
    Ok(Json(service.message_logs(&query).await?))
}
