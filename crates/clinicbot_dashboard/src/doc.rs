// File: crates/clinicbot_dashboard/src/doc.rs
#![cfg(feature = "openapi")]

use utoipa::OpenApi;

use crate::handlers::SetActiveRequest;
use clinicbot_db::models::{
    Alert, AlertSeverity, Appointment, AppointmentStatus, ClientControl, DashboardSummary,
    HeatmapCell, LogPage, MessageDirection, MessageLog, TrendPoint, WorkflowControl,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::summary_handler,
        crate::handlers::alerts_handler,
        crate::handlers::trends_handler,
        crate::handlers::heatmap_handler,
        crate::handlers::bot_status_handler,
        crate::handlers::set_bot_active_handler,
        crate::handlers::workflows_handler,
        crate::handlers::set_workflow_active_handler,
        crate::handlers::appointments_handler,
        crate::handlers::logs_handler
    ),
    components(
        schemas(
            SetActiveRequest,
            DashboardSummary,
            Alert,
            AlertSeverity,
            TrendPoint,
            HeatmapCell,
            ClientControl,
            WorkflowControl,
            Appointment,
            AppointmentStatus,
            MessageLog,
            MessageDirection,
            LogPage
        )
    ),
    tags(
        (name = "Dashboard", description = "Metrics, automation controls and conversation logs")
    ),
    servers(
        (url = "/api", description = "Dashboard API server")
    )
)]
pub struct DashboardApiDoc;
