// --- File: crates/clinicbot_gcal/src/logic.rs ---
//! Loading and saving block configuration against a calendar.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clinicbot_common::services::{CalendarService, EventQuery, RemoteEvent};
use clinicbot_common::DashboardError;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::blocks::{
    is_app_block, local_instant, local_range, occurrence_dates, scope_of, BlockScope,
    BlockSettings, DateBlocks, DayOfWeek, WeeklyBlocks,
};
use crate::reconcile::{apply, plan, ExistingBlock, ReconcileReport};
use crate::service::GcalServiceError;
use crate::slots::{normalize_ranges, Slot, SlotRange};

// --- Error Handling ---
#[derive(Error, Debug)]
pub enum GcalError {
    #[error("Google Calendar is not connected")]
    NotConnected,
    #[error("No calendar has been selected")]
    NoCalendarSelected,
    /// The stored token was rejected; it has been or must be cleared.
    #[error("Google Calendar authorization expired: {0}")]
    Unauthorized(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("Token store error: {0}")]
    Storage(String),
    #[error("Calendar service error: {0}")]
    Service(GcalServiceError),
}

impl From<GcalServiceError> for GcalError {
    fn from(err: GcalServiceError) -> Self {
        match err {
            GcalServiceError::Unauthorized(msg) => GcalError::Unauthorized(msg),
            other => GcalError::Service(other),
        }
    }
}

impl From<GcalError> for DashboardError {
    fn from(err: GcalError) -> Self {
        match err {
            GcalError::NotConnected | GcalError::Unauthorized(_) => {
                DashboardError::AuthError(err.to_string())
            }
            GcalError::NoCalendarSelected => DashboardError::ConflictError(err.to_string()),
            GcalError::InvalidInput(msg) => DashboardError::ValidationError(msg),
            GcalError::Config(msg) => DashboardError::ConfigError(msg),
            GcalError::Storage(msg) => DashboardError::InternalError(msg),
            GcalError::OAuth(msg) => DashboardError::ExternalServiceError {
                service_name: "Google OAuth".to_string(),
                message: msg,
            },
            GcalError::Service(GcalServiceError::NotFound(msg)) => {
                DashboardError::NotFoundError(msg)
            }
            GcalError::Service(e) => DashboardError::ExternalServiceError {
                service_name: "Google Calendar".to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// App-owned blocks touching `[time_min, time_max)`, recurring ones as masters.
async fn app_blocks<S>(
    service: &S,
    calendar_id: &str,
    settings: &BlockSettings,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<Vec<RemoteEvent>, GcalError>
where
    S: CalendarService<Error = GcalServiceError> + ?Sized,
{
    let events = service
        .list_events(calendar_id, EventQuery::between(window.0, window.1).masters())
        .await?;
    let total = events.len();
    let blocks: Vec<RemoteEvent> = events
        .into_iter()
        .filter(|e| is_app_block(e, &settings.summary))
        .collect();
    debug!("{} of {} events are app blocks", blocks.len(), total);
    Ok(blocks)
}

fn day_window(
    settings: &BlockSettings,
    date: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), GcalError> {
    Ok((
        local_instant(settings.time_zone, date, Slot::MIDNIGHT)?,
        local_instant(settings.time_zone, date, Slot::END_OF_DAY)?,
    ))
}

fn existing_block(event: &RemoteEvent, settings: &BlockSettings) -> ExistingBlock {
    ExistingBlock {
        event_id: event.id.clone(),
        range: local_range(event, settings.time_zone),
    }
}

/// Read the weekly configuration back from the calendar.
pub async fn load_weekly_blocks<S>(
    service: &S,
    calendar_id: &str,
    settings: &BlockSettings,
    today: NaiveDate,
) -> Result<WeeklyBlocks, GcalError>
where
    S: CalendarService<Error = GcalServiceError> + ?Sized,
{
    let window = settings.lookahead_window(today)?;
    let mut ranges: BTreeMap<DayOfWeek, Vec<SlotRange>> = BTreeMap::new();
    for event in app_blocks(service, calendar_id, settings, window).await? {
        if let (Some(BlockScope::Weekly(day)), Some(range)) = (
            scope_of(&event, settings.time_zone),
            local_range(&event, settings.time_zone),
        ) {
            ranges.entry(day).or_default().push(range);
        }
    }
    Ok(WeeklyBlocks::from_ranges(ranges))
}

/// Make the weekly block events match `blocks`.
pub async fn save_weekly_blocks<S>(
    service: &S,
    calendar_id: &str,
    settings: &BlockSettings,
    blocks: &WeeklyBlocks,
    today: NaiveDate,
) -> Result<ReconcileReport, GcalError>
where
    S: CalendarService<Error = GcalServiceError> + ?Sized,
{
    let window = settings.lookahead_window(today)?;
    let mut existing: BTreeMap<DayOfWeek, Vec<ExistingBlock>> = BTreeMap::new();
    for event in app_blocks(service, calendar_id, settings, window).await? {
        if let Some(BlockScope::Weekly(day)) = scope_of(&event, settings.time_zone) {
            existing
                .entry(day)
                .or_default()
                .push(existing_block(&event, settings));
        }
    }

    let mut report = ReconcileReport::default();
    for day in DayOfWeek::ALL {
        let current = existing.remove(&day).unwrap_or_default();
        let desired = blocks.day(day).desired();
        let day_plan = plan(&current, &desired);
        apply(
            service,
            calendar_id,
            BlockScope::Weekly(day),
            day_plan,
            settings,
            today,
            &mut report,
        )
        .await?;
    }

    info!(
        "Weekly blocks saved: {} created, {} deleted, {} unchanged, {} failed",
        report.created,
        report.deleted,
        report.unchanged,
        report.failures.len()
    );
    Ok(report)
}

/// Blocks configured for one date.
pub async fn load_date_blocks<S>(
    service: &S,
    calendar_id: &str,
    settings: &BlockSettings,
    date: NaiveDate,
) -> Result<DateBlocks, GcalError>
where
    S: CalendarService<Error = GcalServiceError> + ?Sized,
{
    let window = day_window(settings, date)?;
    let ranges: Vec<SlotRange> = app_blocks(service, calendar_id, settings, window)
        .await?
        .iter()
        .filter(|e| scope_of(e, settings.time_zone) == Some(BlockScope::Date(date)))
        .filter_map(|e| local_range(e, settings.time_zone))
        .collect();
    Ok(DateBlocks {
        date,
        ranges: normalize_ranges(&ranges),
    })
}

/// Make the single-date block events on `date` match `ranges`.
pub async fn save_date_blocks<S>(
    service: &S,
    calendar_id: &str,
    settings: &BlockSettings,
    date: NaiveDate,
    ranges: &[SlotRange],
    today: NaiveDate,
) -> Result<ReconcileReport, GcalError>
where
    S: CalendarService<Error = GcalServiceError> + ?Sized,
{
    let window = day_window(settings, date)?;
    let current: Vec<ExistingBlock> = app_blocks(service, calendar_id, settings, window)
        .await?
        .iter()
        .filter(|e| scope_of(e, settings.time_zone) == Some(BlockScope::Date(date)))
        .map(|e| existing_block(e, settings))
        .collect();

    let mut report = ReconcileReport::default();
    let date_plan = plan(&current, &normalize_ranges(ranges));
    apply(
        service,
        calendar_id,
        BlockScope::Date(date),
        date_plan,
        settings,
        today,
        &mut report,
    )
    .await?;

    info!(
        "Blocks for {} saved: {} created, {} deleted, {} unchanged, {} failed",
        date,
        report.created,
        report.deleted,
        report.unchanged,
        report.failures.len()
    );
    Ok(report)
}

/// Dates in the lookahead window that carry at least one block, in order.
pub async fn blocked_dates<S>(
    service: &S,
    calendar_id: &str,
    settings: &BlockSettings,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>, GcalError>
where
    S: CalendarService<Error = GcalServiceError> + ?Sized,
{
    let window = settings.lookahead_window(today)?;
    let end = today + Duration::weeks(settings.lookahead_weeks as i64);
    let dates: BTreeSet<NaiveDate> = app_blocks(service, calendar_id, settings, window)
        .await?
        .iter()
        .flat_map(|e| occurrence_dates(e, settings.time_zone, today, end))
        .collect();
    Ok(dates.into_iter().collect())
}
