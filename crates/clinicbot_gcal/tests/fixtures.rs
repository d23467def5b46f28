//! Test fixtures for the Google Calendar routes.
//!
//! Provides an in-memory calendar, a connector handing it out, and a
//! config/state builder that never touches the network or the disk.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use clinicbot_common::services::{
    BoxFuture, CalendarService, CalendarSummary, EventDraft, EventQuery, RemoteEvent,
};
use clinicbot_config::{AppConfig, AuthConfig, DashboardConfig, GcalConfig, ReconcileConfig};
use clinicbot_gcal::handlers::{CalendarConnector, GcalState, SharedCalendar};
use clinicbot_gcal::logic::GcalError;
use clinicbot_gcal::service::GcalServiceError;
use clinicbot_gcal::token_store::{StoredState, StoredToken, TokenStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory calendar keyed by calendar id.
#[derive(Default)]
pub struct FakeCalendar {
    events: Mutex<HashMap<String, Vec<RemoteEvent>>>,
    next_id: Mutex<u32>,
    revoked: Mutex<bool>,
}

impl FakeCalendar {
    pub fn events(&self, calendar_id: &str) -> Vec<RemoteEvent> {
        self.events
            .lock()
            .unwrap()
            .get(calendar_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn revoke(&self) {
        *self.revoked.lock().unwrap() = true;
    }

    fn check(&self) -> Result<(), GcalServiceError> {
        if *self.revoked.lock().unwrap() {
            return Err(GcalServiceError::Unauthorized("invalid_grant".to_string()));
        }
        Ok(())
    }

    fn materialize(&self, draft: EventDraft) -> RemoteEvent {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        RemoteEvent {
            id: format!("evt-{}", *next),
            summary: Some(draft.summary),
            description: draft.description,
            start: draft.start,
            end: draft.end,
            recurrence: draft.recurrence,
            status: Some("confirmed".to_string()),
            private_properties: draft.private_properties,
        }
    }
}

impl CalendarService for FakeCalendar {
    type Error = GcalServiceError;

    fn list_calendars(&self) -> BoxFuture<'_, Vec<CalendarSummary>, Self::Error> {
        Box::pin(async move {
            self.check()?;
            Ok(vec![
                CalendarSummary {
                    id: "primary".to_string(),
                    summary: "Clínica".to_string(),
                    primary: true,
                    time_zone: Some("America/Sao_Paulo".to_string()),
                    access_role: Some("owner".to_string()),
                },
                CalendarSummary {
                    id: "dr-ana@group.calendar.google.com".to_string(),
                    summary: "Dra. Ana".to_string(),
                    primary: false,
                    time_zone: None,
                    access_role: Some("writer".to_string()),
                },
            ])
        })
    }

    fn list_events(
        &self,
        calendar_id: &str,
        query: EventQuery,
    ) -> BoxFuture<'_, Vec<RemoteEvent>, Self::Error> {
        let calendar_id = calendar_id.to_string();
        Box::pin(async move {
            self.check()?;
            Ok(self
                .events(&calendar_id)
                .into_iter()
                .filter(|e| {
                    let (Some(start), Some(end)) = (e.start.instant(), e.end.instant()) else {
                        return false;
                    };
                    if !e.recurrence.is_empty() {
                        start < query.time_max
                    } else {
                        start < query.time_max && end > query.time_min
                    }
                })
                .collect())
        })
    }

    fn create_event(
        &self,
        calendar_id: &str,
        event: EventDraft,
    ) -> BoxFuture<'_, RemoteEvent, Self::Error> {
        let calendar_id = calendar_id.to_string();
        Box::pin(async move {
            self.check()?;
            let created = self.materialize(event);
            self.events
                .lock()
                .unwrap()
                .entry(calendar_id)
                .or_default()
                .push(created.clone());
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
            self.check()?;
            let mut events = self.events.lock().unwrap();
            let existing = events
                .get_mut(&calendar_id)
                .and_then(|list| list.iter_mut().find(|e| e.id == event_id))
                .ok_or_else(|| GcalServiceError::NotFound(event_id.clone()))?;
            existing.summary = Some(event.summary);
            existing.description = event.description;
            existing.start = event.start;
            existing.end = event.end;
            Ok(existing.clone())
        })
    }

    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        Box::pin(async move {
            self.check()?;
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

/// Hands out the same fake calendar for every token.
pub struct FakeConnector(pub Arc<FakeCalendar>);

impl CalendarConnector for FakeConnector {
    fn connect(&self, _access_token: &str) -> Result<SharedCalendar, GcalError> {
        Ok(self.0.clone())
    }
}

pub fn create_gcal_config() -> GcalConfig {
    GcalConfig {
        client_id: "client-id.apps.googleusercontent.com".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://localhost:8086/api/gcal/auth/callback".to_string(),
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        token_url: "http://127.0.0.1:9/token".to_string(),
        time_zone: "America/Sao_Paulo".to_string(),
        token_store_path: "unused.json".to_string(),
        default_calendar_id: None,
        block_summary: "Horário bloqueado".to_string(),
        lookahead_weeks: 12,
        reconcile: ReconcileConfig {
            max_attempts: 2,
            base_backoff_ms: 1,
        },
    }
}

/// Creates a mock AppConfig for testing
pub fn create_mock_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        server: clinicbot_config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8086,
            static_dir: None,
        },
        use_gcal: true,
        use_dashboard: false,
        logging: Default::default(),
        database: None,
        gcal: Some(create_gcal_config()),
        dashboard: DashboardConfig::default(),
        auth: AuthConfig::default(),
    })
}

pub fn valid_token() -> StoredToken {
    StoredToken {
        access_token: "ya29.test".to_string(),
        refresh_token: Some("1//refresh".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
        scope: None,
        token_type: Some("Bearer".to_string()),
    }
}

/// State with an in-memory token store holding `stored`.
pub fn create_state(stored: StoredState, calendar: Arc<FakeCalendar>) -> Arc<GcalState> {
    let state = GcalState::new(
        &create_mock_config(),
        Arc::new(TokenStore::in_memory(stored)),
        Arc::new(FakeConnector(calendar)),
        reqwest::Client::new(),
    )
    .expect("valid gcal state");
    Arc::new(state)
}

/// A connected account with the primary calendar selected.
pub fn connected_state(calendar: Arc<FakeCalendar>) -> Arc<GcalState> {
    create_state(
        StoredState {
            token: Some(valid_token()),
            calendar_id: Some("primary".to_string()),
        },
        calendar,
    )
}
