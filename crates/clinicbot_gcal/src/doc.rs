// File: crates/clinicbot_gcal/src/doc.rs
#![cfg(feature = "openapi")]

use utoipa::OpenApi;

use crate::blocks::{DateBlocks, DayBlocks, DayOfWeek, WeeklyBlocks};
use crate::handlers::{
    ActionResponse, AuthStatusResponse, AuthUrlResponse, BlockedDatesResponse, DateBlocksRequest,
    SelectCalendarRequest,
};
use crate::reconcile::{ReconcileFailure, ReconcileOperation, ReconcileReport};
use crate::slots::SlotRange;
use clinicbot_common::services::{CalendarSummary, EventDraft, EventTime, RemoteEvent};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_url_handler,
        crate::handlers::auth_callback_handler,
        crate::handlers::auth_status_handler,
        crate::handlers::logout_handler,
        crate::handlers::list_calendars_handler,
        crate::handlers::select_calendar_handler,
        crate::handlers::list_events_handler,
        crate::handlers::create_event_handler,
        crate::handlers::update_event_handler,
        crate::handlers::delete_event_handler,
        crate::handlers::get_weekly_blocks_handler,
        crate::handlers::put_weekly_blocks_handler,
        crate::handlers::get_date_blocks_handler,
        crate::handlers::put_date_blocks_handler,
        crate::handlers::blocked_dates_handler
    ),
    components(
        schemas(
            AuthUrlResponse,
            AuthStatusResponse,
            ActionResponse,
            SelectCalendarRequest,
            DateBlocksRequest,
            BlockedDatesResponse,
            CalendarSummary,
            EventTime,
            EventDraft,
            RemoteEvent,
            SlotRange,
            DayOfWeek,
            DayBlocks,
            WeeklyBlocks,
            DateBlocks,
            ReconcileReport,
            ReconcileFailure,
            ReconcileOperation
        )
    ),
    tags(
        (name = "GCal", description = "Google Calendar connection and blocked time")
    ),
    servers(
        (url = "/api", description = "Dashboard API server")
    )
)]
pub struct GcalApiDoc;
