// --- File: crates/clinicbot_dashboard/src/logic.rs ---
//! The dashboard's cached queries and the mutations that invalidate them.

use chrono::{Duration as ChronoDuration, Utc};
use clinicbot_config::DashboardConfig;
use clinicbot_db::models::{
    Alert, Appointment, AppointmentQuery, AppointmentStatus, ClientControl, DashboardSummary,
    HeatmapCell, LogPage, LogQuery, TrendPoint, WorkflowControl,
};
use clinicbot_db::{DashboardRepository, DbError};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::poller::{FetchFuture, Poller, QueryState};

/// How far back the appointment list reaches, so today's earlier
/// appointments stay visible.
const APPOINTMENT_LOOKBACK_HOURS: i64 = 12;
const APPOINTMENT_LIMIT: u32 = 200;

fn every(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

/// Poll `f` against the shared repository.
fn poll<T, F>(
    repo: &Arc<dyn DashboardRepository>,
    name: &'static str,
    secs: u64,
    f: F,
) -> Poller<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Arc<dyn DashboardRepository>) -> FetchFuture<T> + Send + Sync + 'static,
{
    let repo = repo.clone();
    Poller::spawn(name, every(secs), move || f(repo.clone()))
}

pub struct DashboardService {
    repo: Arc<dyn DashboardRepository>,
    pub summary: Poller<DashboardSummary>,
    pub alerts: Poller<Vec<Alert>>,
    pub bot_status: Poller<ClientControl>,
    pub workflows: Poller<Vec<WorkflowControl>>,
    pub appointments: Poller<Vec<Appointment>>,
    pub trends: Poller<Vec<TrendPoint>>,
    pub heatmap: Poller<Vec<HeatmapCell>>,
}

impl DashboardService {
    /// Spawn every poller. Must be called inside a Tokio runtime.
    pub fn start(repo: Arc<dyn DashboardRepository>, config: &DashboardConfig) -> Self {
        let days = config.trend_days.max(1);
        let service = Self {
            summary: poll(&repo, "summary", config.summary_interval_secs, |r| {
                Box::pin(async move { r.dashboard_summary().await })
            }),
            alerts: poll(&repo, "alerts", config.alerts_interval_secs, |r| {
                Box::pin(async move { r.dashboard_alerts().await })
            }),
            bot_status: poll(&repo, "bot_status", config.controls_interval_secs, |r| {
                Box::pin(async move { r.client_control().await })
            }),
            workflows: poll(&repo, "workflows", config.controls_interval_secs, |r| {
                Box::pin(async move { r.workflows().await })
            }),
            appointments: poll(
                &repo,
                "appointments",
                config.appointments_interval_secs,
                |r| {
                    Box::pin(async move {
                        let query = AppointmentQuery {
                            status: None,
                            from: Some(Utc::now() - ChronoDuration::hours(APPOINTMENT_LOOKBACK_HOURS)),
                            limit: Some(APPOINTMENT_LIMIT),
                        };
                        r.appointments(&query).await
                    })
                },
            ),
            trends: poll(&repo, "trends", config.trends_interval_secs, move |r| {
                Box::pin(async move { r.message_trends(days).await })
            }),
            heatmap: poll(&repo, "heatmap", config.heatmap_interval_secs, move |r| {
                Box::pin(async move { r.message_heatmap(days).await })
            }),
            repo,
        };
        info!("Dashboard pollers started");
        service
    }

    /// Flip the bot switch, then refresh everything that shows it.
    pub async fn set_bot_active(&self, active: bool) -> Result<ClientControl, DbError> {
        let control = self.repo.set_bot_active(active).await?;
        self.bot_status.invalidate();
        self.summary.invalidate();
        self.alerts.invalidate();
        Ok(control)
    }

    pub async fn set_workflow_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<WorkflowControl, DbError> {
        let workflow = self.repo.set_workflow_active(id, active).await?;
        self.workflows.invalidate();
        self.alerts.invalidate();
        Ok(workflow)
    }

    /// Conversation log page, fetched on demand.
    pub async fn message_logs(&self, query: &LogQuery) -> Result<LogPage, DbError> {
        self.repo.message_logs(query).await
    }

    /// Cached appointments, optionally narrowed to one status.
    pub async fn appointments_with_status(
        &self,
        status: Option<AppointmentStatus>,
    ) -> QueryState<Vec<Appointment>> {
        let mut state = self.appointments.snapshot().await;
        if let (Some(status), Some(items)) = (status, state.data.as_mut()) {
            items.retain(|a| a.status == status);
        }
        state
    }

    /// Re-fetch every query and wait for the results.
    pub async fn refresh_all(&self) {
        tokio::join!(
            self.summary.refresh(),
            self.alerts.refresh(),
            self.bot_status.refresh(),
            self.workflows.refresh(),
            self.appointments.refresh(),
            self.trends.refresh(),
            self.heatmap.refresh(),
        );
    }
}
