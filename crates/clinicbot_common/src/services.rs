// --- File: crates/clinicbot_common/src/services.rs ---
//! Service abstractions for external services.
//!
//! The calendar integration is written against [`CalendarService`] so that the
//! block reconciliation can be exercised with an in-memory calendar in tests
//! and with Google Calendar in production.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A trait for calendar service operations.
pub trait CalendarService: Send + Sync {
    /// Error type returned by calendar service operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// List the calendars visible to the connected account.
    fn list_calendars(&self) -> BoxFuture<'_, Vec<CalendarSummary>, Self::Error>;

    /// List events overlapping `[query.time_min, query.time_max)`.
    fn list_events(
        &self,
        calendar_id: &str,
        query: EventQuery,
    ) -> BoxFuture<'_, Vec<RemoteEvent>, Self::Error>;

    /// Create a calendar event.
    fn create_event(
        &self,
        calendar_id: &str,
        event: EventDraft,
    ) -> BoxFuture<'_, RemoteEvent, Self::Error>;

    /// Replace the mutable fields of an existing event.
    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: EventDraft,
    ) -> BoxFuture<'_, RemoteEvent, Self::Error>;

    /// Delete a calendar event.
    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, (), Self::Error>;
}

/// A calendar from the account's calendar list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub primary: bool,
    pub time_zone: Option<String>,
    pub access_role: Option<String>,
}

/// Start or end of an event: either an all-day date or an instant with its zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn at(date_time: DateTime<Utc>, time_zone: &str) -> Self {
        Self {
            date: None,
            date_time: Some(date_time),
            time_zone: Some(time_zone.to_string()),
        }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            date_time: None,
            time_zone: None,
        }
    }

    /// The instant this time refers to; all-day dates map to UTC midnight.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time.or_else(|| {
            self.date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
    }
}

/// An event as stored by the remote calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RemoteEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// RRULE/EXDATE lines; empty for single events.
    #[serde(default)]
    pub recurrence: Vec<String>,
    pub status: Option<String>,
    /// `extendedProperties.private`
    #[serde(default)]
    pub private_properties: HashMap<String, String>,
}

/// Fields sent when creating or updating an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EventDraft {
    pub summary: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub recurrence: Vec<String>,
    #[serde(default)]
    pub private_properties: HashMap<String, String>,
}

/// Filter for listing events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    /// Expand recurring events into instances. Off returns the recurring masters.
    pub single_events: bool,
}

impl EventQuery {
    pub fn between(time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        Self {
            time_min,
            time_max,
            single_events: true,
        }
    }

    /// Same window, but recurring events come back as their masters.
    pub fn masters(mut self) -> Self {
        self.single_events = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_time_serializes_like_google() {
        let at = EventTime::at(
            Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap(),
            "America/Sao_Paulo",
        );
        let json = serde_json::to_value(&at).unwrap();
        assert_eq!(json["dateTime"], "2025-03-03T12:00:00Z");
        assert_eq!(json["timeZone"], "America/Sao_Paulo");
        assert!(json.get("date").is_none());

        let day = EventTime::all_day(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["date"], "2025-03-03");
    }

    #[test]
    fn test_instant_of_all_day_is_utc_midnight() {
        let day = EventTime::all_day(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(
            day.instant(),
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(EventTime::default().instant(), None);
    }
}
