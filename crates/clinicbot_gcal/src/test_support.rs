//! Shared helpers for the unit tests in this crate.

use crate::blocks::BlockSettings;
use crate::reconcile::RetryPolicy;
use crate::slots::{Slot, SlotRange};
use chrono::NaiveDate;
use std::time::Duration;

pub const CALENDAR: &str = "primary";

pub fn settings() -> BlockSettings {
    BlockSettings {
        time_zone: chrono_tz::America::Sao_Paulo,
        summary: "Horário bloqueado".to_string(),
        lookahead_weeks: 12,
        retry: RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(10),
        },
    }
}

pub fn slot(s: &str) -> Slot {
    s.parse().expect("valid slot")
}

pub fn range(from: &str, to: &str) -> SlotRange {
    SlotRange::new(slot(from), slot(to)).expect("valid range")
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}
