//! `DashboardRepository` over the REST gateway.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::info;

use crate::client::{eq, DbClient};
use crate::error::DbError;
use crate::models::{
    Alert, Appointment, AppointmentQuery, ClientControl, DashboardSummary, HeatmapCell, LogPage,
    LogQuery, TrendPoint, WorkflowControl,
};
use crate::repository::DashboardRepository;

pub const CLIENT_CONTROL: &str = "client_control";
pub const WORKFLOW_CONTROL: &str = "workflow_control";
pub const MESSAGE_LOGS: &str = "message_logs";
pub const APPOINTMENTS: &str = "appointments";

#[derive(Debug, Clone)]
pub struct RestDashboardRepository {
    client: DbClient,
}

impl RestDashboardRepository {
    pub fn new(client: DbClient) -> Self {
        Self { client }
    }
}

fn first<T>(rows: Vec<T>, table: &str, filter: String) -> Result<T, DbError> {
    rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        table: table.to_string(),
        filter,
    })
}

#[async_trait]
impl DashboardRepository for RestDashboardRepository {
    async fn dashboard_summary(&self) -> Result<DashboardSummary, DbError> {
        self.client.rpc("get_dashboard_summary", &json!({})).await
    }

    async fn dashboard_alerts(&self) -> Result<Vec<Alert>, DbError> {
        self.client.rpc("get_dashboard_alerts", &json!({})).await
    }

    async fn message_trends(&self, days: u32) -> Result<Vec<TrendPoint>, DbError> {
        self.client
            .rpc("get_message_trends", &json!({ "days": days }))
            .await
    }

    async fn message_heatmap(&self, days: u32) -> Result<Vec<HeatmapCell>, DbError> {
        self.client
            .rpc("get_message_heatmap", &json!({ "days": days }))
            .await
    }

    async fn client_control(&self) -> Result<ClientControl, DbError> {
        let rows = self
            .client
            .select(
                CLIENT_CONTROL,
                &[("order", "id.asc".to_string()), ("limit", "1".to_string())],
            )
            .await?;
        first(rows, CLIENT_CONTROL, "limit=1".to_string())
    }

    async fn set_bot_active(&self, active: bool) -> Result<ClientControl, DbError> {
        let current = self.client_control().await?;
        let rows = self
            .client
            .update(
                CLIENT_CONTROL,
                &[("id", eq(current.id))],
                &json!({ "bot_active": active, "updated_at": Utc::now() }),
            )
            .await?;
        info!("Bot for {} set active={}", current.client_name, active);
        first(rows, CLIENT_CONTROL, format!("id=eq.{}", current.id))
    }

    async fn workflows(&self) -> Result<Vec<WorkflowControl>, DbError> {
        self.client
            .select(WORKFLOW_CONTROL, &[("order", "workflow_name.asc".to_string())])
            .await
    }

    async fn set_workflow_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<WorkflowControl, DbError> {
        let rows = self
            .client
            .update(
                WORKFLOW_CONTROL,
                &[("id", eq(id))],
                &json!({ "active": active, "updated_at": Utc::now() }),
            )
            .await?;
        let updated: WorkflowControl = first(rows, WORKFLOW_CONTROL, format!("id=eq.{}", id))?;
        info!("Workflow {} set active={}", updated.workflow_name, active);
        Ok(updated)
    }

    async fn message_logs(&self, query: &LogQuery) -> Result<LogPage, DbError> {
        let query = query.normalized();
        let mut filters = vec![("order", "created_at.desc".to_string())];
        if let Some(phone) = &query.phone {
            filters.push(("phone", eq(phone)));
        }
        let (items, total) = self
            .client
            .select_page(MESSAGE_LOGS, &filters, query.row_range())
            .await?;
        Ok(LogPage {
            page: query.page,
            page_size: query.page_size,
            total,
            items,
        })
    }

    async fn appointments(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, DbError> {
        let mut filters = vec![("order", "scheduled_at.asc".to_string())];
        if let Some(status) = query.status {
            filters.push(("status", eq(status.as_str())));
        }
        if let Some(from) = query.from {
            filters.push((
                "scheduled_at",
                format!("gte.{}", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ));
        }
        if let Some(limit) = query.limit {
            filters.push(("limit", limit.to_string()));
        }
        self.client.select(APPOINTMENTS, &filters).await
    }
}
