//! Rows and RPC payloads of the remote data backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClientControl {
    pub id: i64,
    pub client_name: String,
    pub bot_active: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WorkflowControl {
    pub id: i64,
    pub workflow_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageLog {
    pub id: i64,
    pub phone: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    pub direction: MessageDirection,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    /// Value used in PostgREST filters.
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Appointment {
    pub id: i64,
    pub patient_name: String,
    pub phone: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Result of `get_dashboard_summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DashboardSummary {
    pub messages_today: i64,
    pub inbound_today: i64,
    pub outbound_today: i64,
    pub active_conversations: i64,
    pub appointments_today: i64,
    pub confirmed_today: i64,
    pub pending_confirmations: i64,
    pub confirmation_rate: f64,
    pub bot_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// One row of `get_dashboard_alerts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Alert {
    pub kind: String,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One day of `get_message_trends`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TrendPoint {
    pub day: NaiveDate,
    pub inbound: i64,
    pub outbound: i64,
}

/// One cell of `get_message_heatmap`; `weekday` is 0 = Sunday as in Postgres `dow`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HeatmapCell {
    pub weekday: i32,
    pub hour: i32,
    pub count: i64,
}

/// Filters for the conversation log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub phone: Option<String>,
}

impl LogQuery {
    pub const MAX_PAGE_SIZE: u32 = 100;
    pub const DEFAULT_PAGE_SIZE: u32 = 50;

    /// Clamp page and page size into the accepted bounds.
    pub fn normalized(&self) -> Self {
        let page_size = match self.page_size {
            0 => Self::DEFAULT_PAGE_SIZE,
            n => n.min(Self::MAX_PAGE_SIZE),
        };
        Self {
            page: self.page.max(1),
            page_size,
            phone: self
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }

    /// Zero-based inclusive row range for the `Range` header.
    pub fn row_range(&self) -> (u64, u64) {
        let start = (self.page.max(1) as u64 - 1) * self.page_size as u64;
        (start, start + self.page_size as u64 - 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LogPage {
    pub page: u32,
    pub page_size: u32,
    /// Total matching rows, when the backend reported it.
    pub total: Option<u64>,
    pub items: Vec<MessageLog>,
}

/// Filters for the appointment confirmation list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    /// Only appointments scheduled at or after this instant.
    pub from: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}
