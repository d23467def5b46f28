// --- File: crates/clinicbot_gcal/src/reconcile.rs ---
//! Diff-and-patch of block events against the desired configuration.
//!
//! For each scope (a weekday or a date) the existing app-owned blocks are
//! compared with the desired minimal ranges. Matching events are left alone,
//! everything else is deleted and missing ranges are created. Each remote call
//! is retried on transient errors; failures are reported instead of aborting
//! the remaining work, so the next save picks up where this one stopped.

use chrono::NaiveDate;
use clinicbot_common::services::CalendarService;
use clinicbot_config::ReconcileConfig;
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::blocks::{block_draft, BlockScope, BlockSettings};
use crate::logic::GcalError;
use crate::service::GcalServiceError;
use crate::slots::SlotRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
        }
    }

    /// Delay before attempt `attempt + 1`: base, 2x base, 4x base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ReconcileConfig::default())
    }
}

/// An app-owned block found in the calendar. `range` is `None` when the
/// event does not line up with the slot grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingBlock {
    pub event_id: String,
    pub range: Option<SlotRange>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub keep: Vec<SlotRange>,
    pub delete: Vec<String>,
    pub create: Vec<SlotRange>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.delete.is_empty() && self.create.is_empty()
    }
}

/// Compute the operations that turn `existing` into `desired`.
///
/// Each desired range is satisfied by at most one existing event; further
/// events with the same range are duplicates and get deleted.
pub fn plan(existing: &[ExistingBlock], desired: &[SlotRange]) -> ReconcilePlan {
    let mut wanted: BTreeSet<SlotRange> = desired.iter().copied().collect();
    let mut result = ReconcilePlan::default();

    for block in existing {
        match block.range {
            Some(range) if wanted.remove(&range) => result.keep.push(range),
            _ => result.delete.push(block.event_id.clone()),
        }
    }
    result.create = wanted.into_iter().collect();
    result.keep.sort();
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ReconcileOperation {
    Create,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReconcileFailure {
    pub operation: ReconcileOperation,
    /// `monday`, `tuesday`, ... or an ISO date.
    pub scope: String,
    /// Event id for deletes, `HH:MM-HH:MM` for creates.
    pub target: String,
    pub attempts: u32,
    pub message: String,
}

/// Outcome of one save.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReconcileReport {
    pub created: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn operations(&self) -> usize {
        self.created + self.deleted + self.failures.len()
    }
}

fn scope_label(scope: BlockScope) -> String {
    match scope {
        BlockScope::Weekly(day) => serde_json::to_value(day)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", day)),
        BlockScope::Date(date) => date.to_string(),
    }
}

/// Run `op` until it succeeds, fails permanently or runs out of attempts.
/// Returns the last result and the number of attempts made.
async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> (Result<T, GcalServiceError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GcalServiceError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return (Ok(value), attempt),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what, attempt, policy.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}

/// Execute `plan` for one scope, adding the outcome to `report`.
///
/// Deletes run before creates. A rejected token stops everything and is
/// returned as [`GcalError::Unauthorized`].
pub async fn apply<S>(
    service: &S,
    calendar_id: &str,
    scope: BlockScope,
    plan: ReconcilePlan,
    settings: &BlockSettings,
    today: NaiveDate,
    report: &mut ReconcileReport,
) -> Result<(), GcalError>
where
    S: CalendarService<Error = GcalServiceError> + ?Sized,
{
    let label = scope_label(scope);
    report.unchanged += plan.keep.len();
    if plan.is_noop() {
        debug!("Blocks for {} already up to date", label);
        return Ok(());
    }
    info!(
        "Reconciling blocks for {}: {} to delete, {} to create, {} unchanged",
        label,
        plan.delete.len(),
        plan.create.len(),
        plan.keep.len()
    );

    for event_id in plan.delete {
        let what = format!("Delete of block {}", event_id);
        let id = event_id.as_str();
        let (result, attempts) = with_retry(&settings.retry, &what, move || {
            service.delete_event(calendar_id, id)
        })
        .await;
        match result {
            Ok(()) => report.deleted += 1,
            Err(GcalServiceError::NotFound(_)) => {
                debug!("Block {} was already gone", event_id);
                report.deleted += 1;
            }
            Err(GcalServiceError::Unauthorized(msg)) => return Err(GcalError::Unauthorized(msg)),
            Err(e) => {
                warn!("{} gave up after {} attempts: {}", what, attempts, e);
                report.failures.push(ReconcileFailure {
                    operation: ReconcileOperation::Delete,
                    scope: label.clone(),
                    target: event_id,
                    attempts,
                    message: e.to_string(),
                });
            }
        }
    }

    for range in plan.create {
        let draft = match block_draft(scope, range, settings, today) {
            Ok(draft) => draft,
            Err(e) => {
                report.failures.push(ReconcileFailure {
                    operation: ReconcileOperation::Create,
                    scope: label.clone(),
                    target: range.to_string(),
                    attempts: 0,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let what = format!("Create of block {} on {}", range, label);
        let draft = &draft;
        let (result, attempts) = with_retry(&settings.retry, &what, move || {
            service.create_event(calendar_id, draft.clone())
        })
        .await;
        match result {
            Ok(created) => {
                debug!("Created block {} as {}", range, created.id);
                report.created += 1;
            }
            Err(GcalServiceError::Unauthorized(msg)) => return Err(GcalError::Unauthorized(msg)),
            Err(e) => {
                warn!("{} gave up after {} attempts: {}", what, attempts, e);
                report.failures.push(ReconcileFailure {
                    operation: ReconcileOperation::Create,
                    scope: label.clone(),
                    target: range.to_string(),
                    attempts,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(())
}
