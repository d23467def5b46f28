//! Data access used by the dashboard.
//!
//! The dashboard crate only sees this trait, so its tests can swap the REST
//! gateway for an in-memory fake.

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{
    Alert, Appointment, AppointmentQuery, ClientControl, DashboardSummary, HeatmapCell, LogPage,
    LogQuery, TrendPoint, WorkflowControl,
};

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, DbError>;

    async fn dashboard_alerts(&self) -> Result<Vec<Alert>, DbError>;

    async fn message_trends(&self, days: u32) -> Result<Vec<TrendPoint>, DbError>;

    async fn message_heatmap(&self, days: u32) -> Result<Vec<HeatmapCell>, DbError>;

    /// The single `client_control` row.
    async fn client_control(&self) -> Result<ClientControl, DbError>;

    /// Last write wins; there is no version check.
    async fn set_bot_active(&self, active: bool) -> Result<ClientControl, DbError>;

    async fn workflows(&self) -> Result<Vec<WorkflowControl>, DbError>;

    async fn set_workflow_active(&self, id: i64, active: bool)
        -> Result<WorkflowControl, DbError>;

    /// Newest first.
    async fn message_logs(&self, query: &LogQuery) -> Result<LogPage, DbError>;

    /// Ordered by `scheduled_at`.
    async fn appointments(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, DbError>;
}
