// --- File: crates/clinicbot_dashboard/src/routes.rs ---

use axum::{
    routing::{get, put},
    Router,
};
use clinicbot_common::{DashboardError, HTTP_CLIENT};
use clinicbot_config::AppConfig;
use clinicbot_db::{DashboardRepository, DbClient, RestDashboardRepository};
use std::sync::Arc;

use crate::handlers::{
    alerts_handler, appointments_handler, bot_status_handler, heatmap_handler, logs_handler,
    set_bot_active_handler, set_workflow_active_handler, summary_handler, trends_handler,
    workflows_handler,
};
use crate::logic::DashboardService;

/// Starts the pollers against the REST gateway and returns the dashboard router.
pub fn routes(config: Arc<AppConfig>) -> Result<Router, DashboardError> {
    let client = DbClient::from_app_config(&config, HTTP_CLIENT.clone())?;
    let repo: Arc<dyn DashboardRepository> = Arc::new(RestDashboardRepository::new(client));
    let service = DashboardService::start(repo, &config.dashboard);
    Ok(router(Arc::new(service)))
}

pub fn router(service: Arc<DashboardService>) -> Router {
    Router::new()
        .route("/dashboard/summary", get(summary_handler))
        .route("/dashboard/alerts", get(alerts_handler))
        .route("/dashboard/trends", get(trends_handler))
        .route("/dashboard/heatmap", get(heatmap_handler))
        .route("/dashboard/bot", get(bot_status_handler).put(set_bot_active_handler))
        .route("/dashboard/workflows", get(workflows_handler))
        .route("/dashboard/workflows/{id}", put(set_workflow_active_handler))
        .route("/dashboard/appointments", get(appointments_handler))
        .route("/dashboard/logs", get(logs_handler))
        .with_state(service)
}
