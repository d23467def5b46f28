// --- File: crates/clinicbot_dashboard/src/poller.rs ---
//! Interval-driven cached queries.
//!
//! A `Poller` owns a background task that runs its fetch function on a fixed
//! interval and whenever it is invalidated. Readers get the latest
//! `QueryState` snapshot without touching the backend.

use chrono::{DateTime, Utc};
use clinicbot_db::DbError;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, DbError>> + Send>>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryState<T> {
    /// True until the first fetch has finished, successfully or not.
    pub loading: bool,
    /// Last successfully fetched value; kept when a later fetch fails.
    pub data: Option<T>,
    /// Message of the most recent failed fetch, cleared on success.
    pub error: Option<String>,
    /// When `data` was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
            updated_at: None,
        }
    }
}

struct Shared<T> {
    name: &'static str,
    state: RwLock<QueryState<T>>,
    wake: Notify,
    fetched: Notify,
    /// Highest refresh ticket handed out.
    requested: AtomicU64,
    /// Highest ticket covered by a completed fetch.
    served: AtomicU64,
}

pub struct Poller<T> {
    shared: Arc<Shared<T>>,
    task: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start polling `fetch` every `every`; the first fetch runs immediately.
    pub fn spawn<F>(name: &'static str, every: Duration, fetch: F) -> Self
    where
        F: Fn() -> FetchFuture<T> + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            name,
            state: RwLock::new(QueryState::default()),
            wake: Notify::new(),
            fetched: Notify::new(),
            requested: AtomicU64::new(0),
            served: AtomicU64::new(0),
        });
        let task = tokio::spawn(poll_loop(shared.clone(), every, fetch));
        debug!("Started poller {} every {:?}", name, every);
        Self { shared, task }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub async fn snapshot(&self) -> QueryState<T> {
        self.shared.state.read().await.clone()
    }

    /// Ask for an immediate re-fetch without waiting for it.
    pub fn invalidate(&self) {
        self.shared.wake.notify_one();
    }

    /// Invalidate and wait until a fetch that started afterwards has finished.
    pub async fn refresh(&self) -> QueryState<T> {
        let ticket = self.shared.requested.fetch_add(1, Ordering::SeqCst) + 1;
        self.invalidate();
        loop {
            let fetched = self.shared.fetched.notified();
            tokio::pin!(fetched);
            fetched.as_mut().enable();
            if self.shared.served.load(Ordering::SeqCst) >= ticket {
                break;
            }
            fetched.await;
        }
        self.snapshot().await
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_loop<T, F>(shared: Arc<Shared<T>>, every: Duration, fetch: F)
where
    T: Send + Sync + 'static,
    F: Fn() -> FetchFuture<T> + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shared.wake.notified() => ticker.reset(),
        }

        let ticket = shared.requested.load(Ordering::SeqCst);
        let result = fetch().await;
        {
            let mut state = shared.state.write().await;
            state.loading = false;
            match result {
                Ok(data) => {
                    state.data = Some(data);
                    state.error = None;
                    state.updated_at = Some(Utc::now());
                }
                Err(e) => {
                    warn!("Poller {} fetch failed: {}", shared.name, e);
                    state.error = Some(e.to_string());
                }
            }
        }
        shared.served.fetch_max(ticket, Ordering::SeqCst);
        shared.fetched.notify_waiters();
    }
}
