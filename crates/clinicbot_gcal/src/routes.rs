// --- File: crates/clinicbot_gcal/src/routes.rs ---

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use clinicbot_common::HTTP_CLIENT;
use clinicbot_config::AppConfig;
use std::sync::Arc;
use tracing::info;

use crate::handlers::{
    auth_callback_handler, auth_status_handler, auth_url_handler, blocked_dates_handler,
    create_event_handler, delete_event_handler, get_date_blocks_handler,
    get_weekly_blocks_handler, list_calendars_handler, list_events_handler, logout_handler,
    put_date_blocks_handler, put_weekly_blocks_handler, select_calendar_handler,
    update_event_handler, GcalState, GoogleConnector,
};
use crate::logic::GcalError;
use crate::token_store::TokenStore;

/// The OAuth callback is reached by Google's redirect and carries no
/// dashboard session, so it is served apart from the gated routes.
pub struct GcalRouters {
    pub public: Router,
    pub protected: Router,
}

/// Builds the Google Calendar routers backed by the real Google API and the
/// on-disk token store.
pub async fn routes(config: Arc<AppConfig>) -> Result<GcalRouters, GcalError> {
    let path = config
        .gcal
        .as_ref()
        .map(|g| g.token_store_path.clone())
        .ok_or_else(|| GcalError::Config("gcal section missing".to_string()))?;
    let tokens = Arc::new(TokenStore::open(&path).await?);
    info!("Google Calendar token store at {}", path);

    let state = GcalState::new(
        &config,
        tokens,
        Arc::new(GoogleConnector),
        HTTP_CLIENT.clone(),
    )?;
    let state = Arc::new(state);
    Ok(GcalRouters {
        public: public_router(state.clone()),
        protected: protected_router(state),
    })
}

/// Every route over one state, public and protected alike.
pub fn router(state: Arc<GcalState>) -> Router {
    public_router(state.clone()).merge(protected_router(state))
}

pub fn public_router(state: Arc<GcalState>) -> Router {
    Router::new()
        .route("/gcal/auth/callback", get(auth_callback_handler))
        .with_state(state)
}

pub fn protected_router(state: Arc<GcalState>) -> Router {
    Router::new()
        .route("/gcal/auth/url", get(auth_url_handler))
        .route("/gcal/auth/status", get(auth_status_handler))
        .route("/gcal/auth/logout", post(logout_handler))
        .route("/gcal/calendars", get(list_calendars_handler))
        .route("/gcal/calendar", put(select_calendar_handler))
        .route(
            "/gcal/events",
            get(list_events_handler).post(create_event_handler),
        )
        .route(
            "/gcal/events/{event_id}",
            patch(update_event_handler).delete(delete_event_handler),
        )
        .route(
            "/gcal/blocks/weekly",
            get(get_weekly_blocks_handler).put(put_weekly_blocks_handler),
        )
        .route(
            "/gcal/blocks/dates/{date}",
            get(get_date_blocks_handler).put(put_date_blocks_handler),
        )
        .route("/gcal/blocks/blocked-dates", get(blocked_dates_handler))
        .with_state(state)
}
