// File: crates/clinicbot_gcal/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Json},
};
use chrono::{DateTime, NaiveDate, Utc};
use clinicbot_common::services::{CalendarService, CalendarSummary, EventDraft, EventQuery, RemoteEvent};
use clinicbot_common::DashboardError;
use clinicbot_config::{AppConfig, GcalConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::auth::{callback_page, consent_url, create_calendar_hub, exchange_code, refresh_access_token};
use crate::blocks::{BlockSettings, DateBlocks, WeeklyBlocks};
use crate::logic::{
    blocked_dates, load_date_blocks, load_weekly_blocks, save_date_blocks, save_weekly_blocks,
    GcalError,
};
use crate::reconcile::ReconcileReport;
use crate::service::{GcalServiceError, GoogleCalendarService};
use crate::slots::SlotRange;
use crate::token_store::TokenStore;

/// How long an issued OAuth `state` stays valid.
const AUTH_STATE_TTL: Duration = Duration::from_secs(600);

pub type SharedCalendar = Arc<dyn CalendarService<Error = GcalServiceError>>;

/// Turns an access token into a calendar client.
pub trait CalendarConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> Result<SharedCalendar, GcalError>;
}

/// Connects to the Google Calendar v3 API.
pub struct GoogleConnector;

impl CalendarConnector for GoogleConnector {
    fn connect(&self, access_token: &str) -> Result<SharedCalendar, GcalError> {
        let hub = create_calendar_hub(access_token.to_string())?;
        Ok(Arc::new(GoogleCalendarService::new(Arc::new(hub))))
    }
}

// Define shared state needed by GCal handlers
pub struct GcalState {
    pub gcal: GcalConfig,
    pub settings: BlockSettings,
    pub tokens: Arc<TokenStore>,
    pub connector: Arc<dyn CalendarConnector>,
    pub http_client: reqwest::Client,
    pending_auth: Mutex<HashMap<String, Instant>>,
    calendar_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GcalState {
    pub fn new(
        config: &AppConfig,
        tokens: Arc<TokenStore>,
        connector: Arc<dyn CalendarConnector>,
        http_client: reqwest::Client,
    ) -> Result<Self, GcalError> {
        let gcal = config
            .gcal
            .clone()
            .ok_or_else(|| GcalError::Config("gcal section missing".to_string()))?;
        let settings = BlockSettings::from_config(&gcal)?;
        Ok(Self {
            gcal,
            settings,
            tokens,
            connector,
            http_client,
            pending_auth: Mutex::new(HashMap::new()),
            calendar_locks: Mutex::new(HashMap::new()),
        })
    }

    async fn issue_auth_state(&self) -> String {
        let state = uuid::Uuid::new_v4().to_string();
        let mut pending = self.pending_auth.lock().await;
        pending.retain(|_, issued| issued.elapsed() < AUTH_STATE_TTL);
        pending.insert(state.clone(), Instant::now());
        state
    }

    async fn consume_auth_state(&self, state: &str) -> bool {
        let mut pending = self.pending_auth.lock().await;
        matches!(pending.remove(state), Some(issued) if issued.elapsed() < AUTH_STATE_TTL)
    }

    /// A usable access token, refreshed first if it has expired.
    async fn access_token(&self) -> Result<String, GcalError> {
        let token = self.tokens.token().await.ok_or(GcalError::NotConnected)?;
        if !token.is_expired(Utc::now()) {
            return Ok(token.access_token);
        }
        let Some(refresh_token) = token.refresh_token.as_deref() else {
            self.tokens.clear_token().await?;
            return Err(GcalError::Unauthorized(
                "access token expired and no refresh token is stored".to_string(),
            ));
        };
        let refreshed = refresh_access_token(&self.http_client, &self.gcal, refresh_token).await;
        let refreshed = self.guard(refreshed).await?;
        let access_token = refreshed.access_token.clone();
        self.tokens.set_token(refreshed).await?;
        Ok(access_token)
    }

    async fn calendar(&self) -> Result<SharedCalendar, GcalError> {
        let token = self.access_token().await?;
        self.connector.connect(&token)
    }

    async fn calendar_id(&self) -> Result<String, GcalError> {
        self.tokens
            .calendar_id()
            .await
            .or_else(|| self.gcal.default_calendar_id.clone())
            .ok_or(GcalError::NoCalendarSelected)
    }

    /// Serializes block saves on one calendar.
    async fn lock_calendar(&self, calendar_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.calendar_locks.lock().await;
            locks
                .entry(calendar_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Clears the stored token when Google rejected it.
    async fn guard<T>(&self, result: Result<T, GcalError>) -> Result<T, GcalError> {
        if let Err(GcalError::Unauthorized(reason)) = &result {
            warn!("Google Calendar token rejected, disconnecting: {}", reason);
            if let Err(e) = self.tokens.clear_token().await {
                warn!("Failed to clear token: {}", e);
            }
        }
        result
    }

    fn today(&self) -> NaiveDate {
        self.settings.today(Utc::now())
    }
}

// --- Request/response types ---

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthStatusResponse {
    pub connected: bool,
    pub calendar_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SelectCalendarRequest {
    pub calendar_id: String,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct EventsQuery {
    /// RFC 3339 start of the window
    pub start: DateTime<Utc>,
    /// RFC 3339 end of the window
    pub end: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DateBlocksRequest {
    pub ranges: Vec<SlotRange>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BlockedDatesResponse {
    pub from: NaiveDate,
    /// Exclusive end of the lookahead window.
    pub to: NaiveDate,
    pub dates: Vec<NaiveDate>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, DashboardError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        DashboardError::ValidationError(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}

fn validate_draft(draft: &EventDraft) -> Result<(), DashboardError> {
    if draft.summary.trim().is_empty() {
        return Err(DashboardError::ValidationError("summary is required".to_string()));
    }
    match (draft.start.instant(), draft.end.instant()) {
        (Some(start), Some(end)) if end > start => Ok(()),
        (Some(_), Some(_)) => Err(DashboardError::ValidationError(
            "end must be after start".to_string(),
        )),
        _ => Err(DashboardError::ValidationError(
            "start and end need a date or dateTime".to_string(),
        )),
    }
}

// --- OAuth ---

/// Consent URL for the OAuth popup.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/auth/url",
    responses((status = 200, description = "Consent URL", body = AuthUrlResponse)),
    tag = "GCal"
))]
pub async fn auth_url_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<AuthUrlResponse>, DashboardError> {
    let auth_state = state.issue_auth_state().await;
    let url = consent_url(&state.gcal, &auth_state)?;
    Ok(Json(AuthUrlResponse { url }))
}

/// OAuth redirect target. Always answers with the popup page so the opener
/// learns about failures too.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/auth/callback",
    params(AuthCallbackQuery),
    responses((status = 200, description = "HTML page that notifies the opener", content_type = "text/html")),
    tag = "GCal"
))]
pub async fn auth_callback_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<AuthCallbackQuery>,
) -> (StatusCode, Html<String>) {
    if let Some(error) = query.error {
        warn!("Google consent was not granted: {}", error);
        return (StatusCode::OK, Html(callback_page(false, &error)));
    }
    let (Some(code), Some(auth_state)) = (query.code, query.state) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(callback_page(false, "missing code or state")),
        );
    };
    if !state.consume_auth_state(&auth_state).await {
        warn!("Rejected OAuth callback with unknown state");
        return (
            StatusCode::BAD_REQUEST,
            Html(callback_page(false, "invalid or expired state")),
        );
    }

    let stored = match exchange_code(&state.http_client, &state.gcal, &code).await {
        Ok(token) => state.tokens.set_token(token).await,
        Err(e) => Err(e),
    };
    match stored {
        Ok(()) => (StatusCode::OK, Html(callback_page(true, "connected"))),
        Err(e) => {
            warn!("Google Calendar authorization failed: {}", e);
            (StatusCode::OK, Html(callback_page(false, &e.to_string())))
        }
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/auth/status",
    responses((status = 200, description = "Connection state", body = AuthStatusResponse)),
    tag = "GCal"
))]
pub async fn auth_status_handler(State(state): State<Arc<GcalState>>) -> Json<AuthStatusResponse> {
    let snapshot = state.tokens.snapshot().await;
    Json(AuthStatusResponse {
        connected: snapshot.token.is_some(),
        calendar_id: snapshot
            .calendar_id
            .or_else(|| state.gcal.default_calendar_id.clone()),
        expires_at: snapshot.token.and_then(|t| t.expires_at),
    })
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/gcal/auth/logout",
    responses((status = 200, description = "Token cleared", body = ActionResponse)),
    tag = "GCal"
))]
pub async fn logout_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<ActionResponse>, DashboardError> {
    state.tokens.clear_token().await?;
    info!("Google Calendar disconnected");
    Ok(Json(ActionResponse {
        success: true,
        message: "Google Calendar disconnected.".to_string(),
    }))
}

// --- Calendars and events ---

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/calendars",
    responses(
        (status = 200, description = "Calendars of the connected account", body = Vec<CalendarSummary>),
        (status = 401, description = "Not connected or token rejected")
    ),
    tag = "GCal"
))]
pub async fn list_calendars_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<Vec<CalendarSummary>>, DashboardError> {
    let calendar = state.calendar().await?;
    let result = calendar.list_calendars().await.map_err(GcalError::from);
    Ok(Json(state.guard(result).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/gcal/calendar",
    request_body = SelectCalendarRequest,
    responses((status = 200, description = "Calendar selected", body = ActionResponse)),
    tag = "GCal"
))]
pub async fn select_calendar_handler(
    State(state): State<Arc<GcalState>>,
    Json(payload): Json<SelectCalendarRequest>,
) -> Result<Json<ActionResponse>, DashboardError> {
    let calendar_id = payload.calendar_id.trim();
    if calendar_id.is_empty() {
        return Err(DashboardError::ValidationError("calendar_id is required".to_string()));
    }
    state.tokens.set_calendar_id(calendar_id.to_string()).await?;
    info!("Selected calendar {}", calendar_id);
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Calendar {} selected.", calendar_id),
    }))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/events",
    params(EventsQuery),
    responses((status = 200, description = "Events in the window", body = Vec<RemoteEvent>)),
    tag = "GCal"
))]
pub async fn list_events_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<RemoteEvent>>, DashboardError> {
    if query.end <= query.start {
        return Err(DashboardError::ValidationError("end must be after start".to_string()));
    }
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let result = calendar
        .list_events(&calendar_id, EventQuery::between(query.start, query.end))
        .await
        .map_err(GcalError::from);
    Ok(Json(state.guard(result).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/gcal/events",
    request_body = EventDraft,
    responses((status = 201, description = "Created event", body = RemoteEvent)),
    tag = "GCal"
))]
pub async fn create_event_handler(
    State(state): State<Arc<GcalState>>,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<RemoteEvent>), DashboardError> {
    validate_draft(&draft)?;
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let result = calendar
        .create_event(&calendar_id, draft)
        .await
        .map_err(GcalError::from);
    let created = state.guard(result).await?;
    info!("Created event {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    patch,
    path = "/gcal/events/{event_id}",
    params(("event_id" = String, Path, description = "Google Calendar event id")),
    request_body = EventDraft,
    responses(
        (status = 200, description = "Updated event", body = RemoteEvent),
        (status = 404, description = "Event not found")
    ),
    tag = "GCal"
))]
pub async fn update_event_handler(
    State(state): State<Arc<GcalState>>,
    Path(event_id): Path<String>,
    Json(draft): Json<EventDraft>,
) -> Result<Json<RemoteEvent>, DashboardError> {
    validate_draft(&draft)?;
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let result = calendar
        .update_event(&calendar_id, &event_id, draft)
        .await
        .map_err(GcalError::from);
    Ok(Json(state.guard(result).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/gcal/events/{event_id}",
    params(("event_id" = String, Path, description = "Google Calendar event id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Event not found")
    ),
    tag = "GCal"
))]
pub async fn delete_event_handler(
    State(state): State<Arc<GcalState>>,
    Path(event_id): Path<String>,
) -> Result<StatusCode, DashboardError> {
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let result = calendar
        .delete_event(&calendar_id, &event_id)
        .await
        .map_err(GcalError::from);
    state.guard(result).await?;
    info!("Deleted event {}", event_id);
    Ok(StatusCode::NO_CONTENT)
}

// --- Blocked time ---

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/blocks/weekly",
    responses((status = 200, description = "Weekly blocks read from the calendar", body = WeeklyBlocks)),
    tag = "GCal"
))]
pub async fn get_weekly_blocks_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<WeeklyBlocks>, DashboardError> {
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let result = load_weekly_blocks(calendar.as_ref(), &calendar_id, &state.settings, state.today()).await;
    Ok(Json(state.guard(result).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/gcal/blocks/weekly",
    request_body = WeeklyBlocks,
    responses(
        (status = 200, description = "Reconciliation outcome", body = ReconcileReport),
        (status = 401, description = "Calendar token rejected and cleared")
    ),
    tag = "GCal"
))]
pub async fn put_weekly_blocks_handler(
    State(state): State<Arc<GcalState>>,
    Json(blocks): Json<WeeklyBlocks>,
) -> Result<Json<ReconcileReport>, DashboardError> {
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let _guard = state.lock_calendar(&calendar_id).await;
    let result = save_weekly_blocks(
        calendar.as_ref(),
        &calendar_id,
        &state.settings,
        &blocks,
        state.today(),
    )
    .await;
    Ok(Json(state.guard(result).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/blocks/dates/{date}",
    params(("date" = String, Path, description = "YYYY-MM-DD", format = "date")),
    responses((status = 200, description = "Blocks on the date", body = DateBlocks)),
    tag = "GCal"
))]
pub async fn get_date_blocks_handler(
    State(state): State<Arc<GcalState>>,
    Path(date): Path<String>,
) -> Result<Json<DateBlocks>, DashboardError> {
    let date = parse_date(&date)?;
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let result = load_date_blocks(calendar.as_ref(), &calendar_id, &state.settings, date).await;
    Ok(Json(state.guard(result).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/gcal/blocks/dates/{date}",
    params(("date" = String, Path, description = "YYYY-MM-DD", format = "date")),
    request_body = DateBlocksRequest,
    responses((status = 200, description = "Reconciliation outcome", body = ReconcileReport)),
    tag = "GCal"
))]
pub async fn put_date_blocks_handler(
    State(state): State<Arc<GcalState>>,
    Path(date): Path<String>,
    Json(payload): Json<DateBlocksRequest>,
) -> Result<Json<ReconcileReport>, DashboardError> {
    let date = parse_date(&date)?;
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let _guard = state.lock_calendar(&calendar_id).await;
    let result = save_date_blocks(
        calendar.as_ref(),
        &calendar_id,
        &state.settings,
        date,
        &payload.ranges,
        state.today(),
    )
    .await;
    Ok(Json(state.guard(result).await?))
}

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/blocks/blocked-dates",
    responses((status = 200, description = "Dates in the lookahead window with any block", body = BlockedDatesResponse)),
    tag = "GCal"
))]
pub async fn blocked_dates_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<BlockedDatesResponse>, DashboardError> {
    let calendar = state.calendar().await?;
    let calendar_id = state.calendar_id().await?;
    let today = state.today();
    let result = blocked_dates(calendar.as_ref(), &calendar_id, &state.settings, today).await;
    let dates = state.guard(result).await?;
    Ok(Json(BlockedDatesResponse {
        from: today,
        to: today + chrono::Duration::weeks(state.settings.lookahead_weeks as i64),
        dates,
    }))
}
