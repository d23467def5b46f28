// --- File: crates/clinicbot_gcal/src/service.rs ---
//! Google Calendar service implementation.
//!
//! This module provides an implementation of the CalendarService trait for Google Calendar.

use clinicbot_common::services::{
    BoxFuture, CalendarService, CalendarSummary, EventDraft, EventQuery, EventTime, RemoteEvent,
};
use google_calendar3::api::{Event, EventDateTime, EventExtendedProperties};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::auth::HubType;

/// Errors that can occur when interacting with Google Calendar.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcalServiceError {
    /// The access token was rejected (HTTP 401).
    #[error("Google Calendar rejected the access token: {0}")]
    Unauthorized(String),
    /// The event or calendar does not exist (HTTP 404/410).
    #[error("Not found in Google Calendar: {0}")]
    NotFound(String),
    #[error("Google API Error: {0}")]
    ApiError(String),
    #[error("Invalid event from Google Calendar: {0}")]
    InvalidEvent(String),
}

impl GcalServiceError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GcalServiceError::ApiError(_))
    }
}

fn classify(status: u16, message: String) -> GcalServiceError {
    match status {
        401 => GcalServiceError::Unauthorized(message),
        404 | 410 => GcalServiceError::NotFound(message),
        _ => GcalServiceError::ApiError(message),
    }
}

impl From<google_calendar3::Error> for GcalServiceError {
    fn from(err: google_calendar3::Error) -> Self {
        use google_calendar3::Error as ApiErr;
        match &err {
            ApiErr::BadRequest(body) => {
                let status = body["error"]["code"]
                    .as_u64()
                    .and_then(|code| u16::try_from(code).ok())
                    .unwrap_or(400);
                let message = body["error"]["message"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());
                classify(status, message)
            }
            ApiErr::Failure(response) => classify(response.status().as_u16(), err.to_string()),
            ApiErr::MissingToken(_) => GcalServiceError::Unauthorized(err.to_string()),
            _ => GcalServiceError::ApiError(err.to_string()),
        }
    }
}

/// Google Calendar service implementation.
pub struct GoogleCalendarService {
    calendar_hub: Arc<HubType>,
}

impl GoogleCalendarService {
    /// Create a new Google Calendar service.
    pub fn new(calendar_hub: Arc<HubType>) -> Self {
        Self { calendar_hub }
    }
}

fn to_api_time(time: &EventTime) -> EventDateTime {
    EventDateTime {
        date: time.date,
        date_time: time.date_time,
        time_zone: time.time_zone.clone(),
    }
}

fn from_api_time(time: Option<EventDateTime>) -> EventTime {
    time.map(|t| EventTime {
        date: t.date,
        date_time: t.date_time,
        time_zone: t.time_zone,
    })
    .unwrap_or_default()
}

/// Build the API payload for an insert or patch.
pub(crate) fn draft_to_event(draft: EventDraft) -> Event {
    let extended_properties = (!draft.private_properties.is_empty()).then(|| {
        EventExtendedProperties {
            private: Some(draft.private_properties),
            shared: None,
        }
    });
    Event {
        summary: Some(draft.summary),
        description: draft.description,
        start: Some(to_api_time(&draft.start)),
        end: Some(to_api_time(&draft.end)),
        // an explicit empty list clears the recurrence on patch
        recurrence: Some(draft.recurrence),
        extended_properties,
        ..Default::default()
    }
}

pub(crate) fn event_to_remote(event: Event) -> Result<RemoteEvent, GcalServiceError> {
    let id = event
        .id
        .ok_or_else(|| GcalServiceError::InvalidEvent("event without id".to_string()))?;
    let private_properties = event
        .extended_properties
        .and_then(|p| p.private)
        .unwrap_or_default();
    Ok(RemoteEvent {
        id,
        summary: event.summary,
        description: event.description,
        start: from_api_time(event.start),
        end: from_api_time(event.end),
        recurrence: event.recurrence.unwrap_or_default(),
        status: event.status,
        private_properties,
    })
}

impl CalendarService for GoogleCalendarService {
    type Error = GcalServiceError;

    fn list_calendars(&self) -> BoxFuture<'_, Vec<CalendarSummary>, Self::Error> {
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            let (_response, list) = calendar_hub.calendar_list().list().doit().await?;
            Ok(list
                .items
                .unwrap_or_default()
                .into_iter()
                .filter_map(|entry| {
                    Some(CalendarSummary {
                        id: entry.id?,
                        summary: entry.summary_override.or(entry.summary).unwrap_or_default(),
                        primary: entry.primary.unwrap_or(false),
                        time_zone: entry.time_zone,
                        access_role: entry.access_role,
                    })
                })
                .collect())
        })
    }

    /// Lists events in the window, following `nextPageToken` until exhausted.
    /// Cancelled events are skipped.
    fn list_events(
        &self,
        calendar_id: &str,
        query: EventQuery,
    ) -> BoxFuture<'_, Vec<RemoteEvent>, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            let mut events = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let mut request = calendar_hub
                    .events()
                    .list(&calendar_id)
                    .time_min(query.time_min)
                    .time_max(query.time_max)
                    .single_events(query.single_events)
                    .max_results(250);
                if query.single_events {
                    request = request.order_by("startTime");
                }
                if let Some(token) = page_token.as_deref() {
                    request = request.page_token(token);
                }

                let (_response, page) = request.doit().await?;
                for item in page.items.unwrap_or_default() {
                    if item.status.as_deref() == Some("cancelled") {
                        continue;
                    }
                    events.push(event_to_remote(item)?);
                }

                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }

            debug!("Listed {} events from {}", events.len(), calendar_id);
            Ok(events)
        })
    }

    fn create_event(
        &self,
        calendar_id: &str,
        event: EventDraft,
    ) -> BoxFuture<'_, RemoteEvent, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            let mut payload = draft_to_event(event);
            if payload.recurrence.as_ref().is_some_and(|r| r.is_empty()) {
                payload.recurrence = None;
            }
            let (_response, created) = calendar_hub
                .events()
                .insert(payload, &calendar_id)
                .doit()
                .await?;
            event_to_remote(created)
        })
    }

    fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: EventDraft,
    ) -> BoxFuture<'_, RemoteEvent, Self::Error> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            let (_response, updated) = calendar_hub
                .events()
                .patch(draft_to_event(event), &calendar_id, &event_id)
                .doit()
                .await?;
            event_to_remote(updated)
        })
    }

    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        let calendar_hub = self.calendar_hub.clone();

        Box::pin(async move {
            calendar_hub
                .events()
                .delete(&calendar_id, &event_id)
                .doit()
                .await?;
            Ok(())
        })
    }
}

/// Mock implementation of CalendarService for testing.
#[cfg(test)]
pub mod mock {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Counts of remote calls, for asserting on reconciliation plans.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct CallCounts {
        pub list: usize,
        pub create: usize,
        pub update: usize,
        pub delete: usize,
    }

    /// Mock calendar service for testing.
    ///
    /// Recurring masters are returned whenever they start before `time_max`,
    /// which matches what the API does for open-ended weekly rules.
    #[derive(Default)]
    pub struct MockCalendarService {
        events: Mutex<HashMap<String, Vec<RemoteEvent>>>,
        calls: Mutex<CallCounts>,
        failing_deletes: Mutex<HashSet<String>>,
        transient_failures: Mutex<usize>,
        unauthorized: Mutex<bool>,
    }

    impl MockCalendarService {
        /// Create a new mock calendar service.
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, calendar_id: &str, event: RemoteEvent) {
            self.events
                .lock()
                .unwrap()
                .entry(calendar_id.to_string())
                .or_default()
                .push(event);
        }

        pub fn events(&self, calendar_id: &str) -> Vec<RemoteEvent> {
            self.events
                .lock()
                .unwrap()
                .get(calendar_id)
                .cloned()
                .unwrap_or_default()
        }

        pub fn calls(&self) -> CallCounts {
            self.calls.lock().unwrap().clone()
        }

        pub fn reset_calls(&self) {
            *self.calls.lock().unwrap() = CallCounts::default();
        }

        /// Deletes of this event fail with a server error until cleared.
        pub fn fail_delete_of(&self, event_id: &str) {
            self.failing_deletes
                .lock()
                .unwrap()
                .insert(event_id.to_string());
        }

        pub fn clear_failures(&self) {
            self.failing_deletes.lock().unwrap().clear();
        }

        /// The next `n` write calls fail with a server error.
        pub fn fail_next_writes(&self, n: usize) {
            *self.transient_failures.lock().unwrap() = n;
        }

        /// Every call answers 401 from now on.
        pub fn revoke_token(&self) {
            *self.unauthorized.lock().unwrap() = true;
        }

        fn check_auth(&self) -> Result<(), GcalServiceError> {
            if *self.unauthorized.lock().unwrap() {
                return Err(GcalServiceError::Unauthorized("token revoked".to_string()));
            }
            Ok(())
        }

        fn take_transient_failure(&self) -> Result<(), GcalServiceError> {
            let mut remaining = self.transient_failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GcalServiceError::ApiError("503 backend error".to_string()));
            }
            Ok(())
        }

        fn overlaps(event: &RemoteEvent, query: &EventQuery) -> bool {
            let (Some(start), Some(end)) = (event.start.instant(), event.end.instant()) else {
                return false;
            };
            if !event.recurrence.is_empty() {
                return start < query.time_max;
            }
            start < query.time_max && end > query.time_min
        }
    }

    fn stored(draft: EventDraft, id: String) -> RemoteEvent {
        RemoteEvent {
            id,
            summary: Some(draft.summary),
            description: draft.description,
            start: draft.start,
            end: draft.end,
            recurrence: draft.recurrence,
            status: Some("confirmed".to_string()),
            private_properties: draft.private_properties,
        }
    }

    impl CalendarService for MockCalendarService {
        type Error = GcalServiceError;

        fn list_calendars(&self) -> BoxFuture<'_, Vec<CalendarSummary>, Self::Error> {
            Box::pin(async move {
                self.check_auth()?;
                Ok(vec![CalendarSummary {
                    id: "primary".to_string(),
                    summary: "Clinic".to_string(),
                    primary: true,
                    time_zone: Some("America/Sao_Paulo".to_string()),
                    access_role: Some("owner".to_string()),
                }])
            })
        }

        fn list_events(
            &self,
            calendar_id: &str,
            query: EventQuery,
        ) -> BoxFuture<'_, Vec<RemoteEvent>, Self::Error> {
            let calendar_id = calendar_id.to_string();

            Box::pin(async move {
                self.check_auth()?;
                self.calls.lock().unwrap().list += 1;
                let mut events: Vec<RemoteEvent> = self
                    .events(&calendar_id)
                    .into_iter()
                    .filter(|e| Self::overlaps(e, &query))
                    .collect();
                events.sort_by_key(|e| e.start.instant().unwrap_or(DateTime::<Utc>::MIN_UTC));
                Ok(events)
            })
        }

        fn create_event(
            &self,
            calendar_id: &str,
            event: EventDraft,
        ) -> BoxFuture<'_, RemoteEvent, Self::Error> {
            let calendar_id = calendar_id.to_string();

            Box::pin(async move {
                self.check_auth()?;
                self.calls.lock().unwrap().create += 1;
                self.take_transient_failure()?;
                let created = stored(event, format!("mock-event-{}", uuid::Uuid::new_v4()));
                self.insert(&calendar_id, created.clone());
                Ok(created)
            })
        }

        fn update_event(
            &self,
            calendar_id: &str,
            event_id: &str,
            event: EventDraft,
        ) -> BoxFuture<'_, RemoteEvent, Self::Error> {
            let calendar_id = calendar_id.to_string();
            let event_id = event_id.to_string();

            Box::pin(async move {
                self.check_auth()?;
                self.calls.lock().unwrap().update += 1;
                self.take_transient_failure()?;
                let mut events = self.events.lock().unwrap();
                let existing = events
                    .get_mut(&calendar_id)
                    .and_then(|list| list.iter_mut().find(|e| e.id == event_id))
                    .ok_or_else(|| GcalServiceError::NotFound(event_id.clone()))?;
                *existing = stored(event, event_id);
                Ok(existing.clone())
            })
        }

        fn delete_event(
            &self,
            calendar_id: &str,
            event_id: &str,
        ) -> BoxFuture<'_, (), Self::Error> {
            let calendar_id = calendar_id.to_string();
            let event_id = event_id.to_string();

            Box::pin(async move {
                self.check_auth()?;
                self.calls.lock().unwrap().delete += 1;
                if self.failing_deletes.lock().unwrap().contains(&event_id) {
                    return Err(GcalServiceError::ApiError("500 backend error".to_string()));
                }
                self.take_transient_failure()?;
                let mut events = self.events.lock().unwrap();
                let list = events.entry(calendar_id).or_default();
                let before = list.len();
                list.retain(|e| e.id != event_id);
                if list.len() == before {
                    return Err(GcalServiceError::NotFound(event_id));
                }
                Ok(())
            })
        }
    }
}
