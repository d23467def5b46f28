// --- File: crates/clinicbot_gcal/src/blocks.rs ---
//! Blocked-time configuration and its representation as calendar events.
//!
//! A weekly block is a recurring event (`RRULE:FREQ=WEEKLY;BYDAY=..`) whose
//! first occurrence is the next matching weekday. A date block is a single
//! event on that date. Both carry the summary from config and a private
//! extended-property marker so they can be told apart from the clinic's own
//! appointments.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use clinicbot_common::services::{EventDraft, EventTime, RemoteEvent};
use clinicbot_config::GcalConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::logic::GcalError;
use crate::reconcile::RetryPolicy;
use crate::slots::{normalize_ranges, Slot, SlotRange};

pub const MARKER_APP_KEY: &str = "app";
pub const MARKER_APP_VALUE: &str = "evolution-calendar";
pub const MARKER_TYPE_KEY: &str = "type";
pub const MARKER_TYPE_VALUE: &str = "blocked";
/// Older blocks only carry the marker in their description.
pub const DESCRIPTION_MARKER: &str = "[evolution-calendar:blocked]";

/// Weekday of a recurring block, ordered Monday (0) to Sunday (6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum DayOfWeek {
    Monday = 0,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn weekday(self) -> Weekday {
        match self {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        Self::ALL[weekday.num_days_from_monday() as usize]
    }

    /// Two-letter code used in `BYDAY`.
    pub fn rrule_code(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MO",
            DayOfWeek::Tuesday => "TU",
            DayOfWeek::Wednesday => "WE",
            DayOfWeek::Thursday => "TH",
            DayOfWeek::Friday => "FR",
            DayOfWeek::Saturday => "SA",
            DayOfWeek::Sunday => "SU",
        }
    }

    pub fn from_rrule_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.rrule_code() == code)
    }
}

/// Blocks for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DayBlocks {
    pub enabled: bool,
    #[serde(default)]
    pub ranges: Vec<SlotRange>,
}

impl DayBlocks {
    /// Ranges that should exist remotely. A disabled day wants none.
    pub fn desired(&self) -> Vec<SlotRange> {
        if self.enabled {
            normalize_ranges(&self.ranges)
        } else {
            Vec::new()
        }
    }
}

/// Weekly block configuration, keyed by weekday. Missing days count as disabled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WeeklyBlocks(pub BTreeMap<DayOfWeek, DayBlocks>);

impl WeeklyBlocks {
    pub fn day(&self, day: DayOfWeek) -> DayBlocks {
        self.0.get(&day).cloned().unwrap_or_default()
    }

    /// A map with an entry for every weekday.
    pub fn from_ranges(mut ranges: BTreeMap<DayOfWeek, Vec<SlotRange>>) -> Self {
        Self(
            DayOfWeek::ALL
                .into_iter()
                .map(|day| {
                    let ranges = normalize_ranges(&ranges.remove(&day).unwrap_or_default());
                    let enabled = !ranges.is_empty();
                    (day, DayBlocks { enabled, ranges })
                })
                .collect(),
        )
    }
}

/// Blocks on one specific date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DateBlocks {
    pub date: NaiveDate,
    pub ranges: Vec<SlotRange>,
}

/// Which part of the configuration an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockScope {
    Weekly(DayOfWeek),
    Date(NaiveDate),
}

/// Everything needed to turn configuration into events and back.
#[derive(Debug, Clone)]
pub struct BlockSettings {
    pub time_zone: Tz,
    pub summary: String,
    pub lookahead_weeks: u32,
    pub retry: RetryPolicy,
}

impl BlockSettings {
    pub fn from_config(config: &GcalConfig) -> Result<Self, GcalError> {
        let time_zone = Tz::from_str(&config.time_zone).map_err(|e| {
            GcalError::Config(format!("Invalid time_zone '{}': {}", config.time_zone, e))
        })?;
        Ok(Self {
            time_zone,
            summary: config.block_summary.clone(),
            lookahead_weeks: config.lookahead_weeks,
            retry: RetryPolicy::from_config(&config.reconcile),
        })
    }

    /// Today's date in the clinic's zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.time_zone).date_naive()
    }

    /// `[today, today + lookahead)` as UTC instants.
    pub fn lookahead_window(&self, today: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), GcalError> {
        let end = today + Duration::weeks(self.lookahead_weeks as i64);
        Ok((
            local_instant(self.time_zone, today, Slot::MIDNIGHT)?,
            local_instant(self.time_zone, end, Slot::MIDNIGHT)?,
        ))
    }
}

/// True when the event is a block created by this application.
pub fn is_app_block(event: &RemoteEvent, summary: &str) -> bool {
    if event.summary.as_deref() != Some(summary) {
        return false;
    }
    let marked = event.private_properties.get(MARKER_APP_KEY).map(String::as_str)
        == Some(MARKER_APP_VALUE)
        && event.private_properties.get(MARKER_TYPE_KEY).map(String::as_str)
            == Some(MARKER_TYPE_VALUE);
    marked
        || event
            .description
            .as_deref()
            .is_some_and(|d| d.contains(DESCRIPTION_MARKER))
}

fn rrule_parts(event: &RemoteEvent) -> Option<HashMap<&str, &str>> {
    let rule = event
        .recurrence
        .iter()
        .find_map(|line| line.strip_prefix("RRULE:"))?;
    Some(
        rule.split(';')
            .filter_map(|part| part.split_once('='))
            .collect(),
    )
}

/// The weekday of a weekly rule with exactly one `BYDAY`.
pub fn weekly_day(event: &RemoteEvent, time_zone: Tz) -> Option<DayOfWeek> {
    let parts = rrule_parts(event)?;
    if parts.get("FREQ") != Some(&"WEEKLY") {
        return None;
    }
    match parts.get("BYDAY") {
        Some(days) if !days.contains(',') => DayOfWeek::from_rrule_code(days),
        Some(_) => None,
        None => local_start_date(event, time_zone).map(|d| DayOfWeek::from_weekday(d.weekday())),
    }
}

/// Last date covered by the rule's `UNTIL`, if any.
pub fn rrule_until(event: &RemoteEvent) -> Option<NaiveDate> {
    let until = rrule_parts(event)?.get("UNTIL").copied()?;
    NaiveDate::parse_from_str(until.get(..8)?, "%Y%m%d").ok()
}

/// Dates removed from the series by `EXDATE` lines, in `time_zone`.
///
/// UTC values (`...Z`) are converted; `TZID=` and `VALUE=DATE` values are
/// already local.
pub fn excluded_dates(event: &RemoteEvent, time_zone: Tz) -> Vec<NaiveDate> {
    event
        .recurrence
        .iter()
        .filter(|line| line.starts_with("EXDATE"))
        .filter_map(|line| line.split_once(':').map(|(_, values)| values))
        .flat_map(|values| values.split(','))
        .filter_map(|value| {
            let value = value.trim();
            if value.ends_with('Z') {
                NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ")
                    .ok()
                    .map(|at| at.and_utc().with_timezone(&time_zone).date_naive())
            } else {
                NaiveDate::parse_from_str(value.get(..8)?, "%Y%m%d").ok()
            }
        })
        .collect()
}

pub fn scope_of(event: &RemoteEvent, time_zone: Tz) -> Option<BlockScope> {
    if event.recurrence.is_empty() {
        local_start_date(event, time_zone).map(BlockScope::Date)
    } else {
        weekly_day(event, time_zone).map(BlockScope::Weekly)
    }
}

pub fn local_start_date(event: &RemoteEvent, time_zone: Tz) -> Option<NaiveDate> {
    match (event.start.date, event.start.date_time) {
        (Some(date), _) => Some(date),
        (None, Some(at)) => Some(at.with_timezone(&time_zone).date_naive()),
        (None, None) => None,
    }
}

/// The slot range an event covers on its start day, if it is slot-aligned and
/// does not spill past midnight.
pub fn local_range(event: &RemoteEvent, time_zone: Tz) -> Option<SlotRange> {
    let start = event.start.date_time?.with_timezone(&time_zone);
    let end = event.end.date_time?.with_timezone(&time_zone);

    let minutes_of = |dt: &DateTime<Tz>| (dt.hour() * 60 + dt.minute()) as u16;
    let from = Slot::from_minutes(minutes_of(&start)).ok()?;
    let to_minutes = if end.date_naive() == start.date_naive() {
        minutes_of(&end)
    } else if end.date_naive() == start.date_naive().succ_opt()? && minutes_of(&end) == 0 {
        Slot::END_OF_DAY.minutes()
    } else {
        return None;
    };
    SlotRange::new(from, Slot::from_minutes(to_minutes).ok()?).ok()
}

/// The instant a slot boundary on `date` refers to in `time_zone`.
/// `24:00` is midnight of the following day.
pub fn local_instant(time_zone: Tz, date: NaiveDate, slot: Slot) -> Result<DateTime<Utc>, GcalError> {
    let (date, minutes) = if slot.is_end_of_day() {
        let next = date
            .succ_opt()
            .ok_or_else(|| GcalError::InvalidInput(format!("Date out of range: {}", date)))?;
        (next, 0)
    } else {
        (date, slot.minutes())
    };
    let naive = date
        .and_hms_opt(u32::from(minutes / 60), u32::from(minutes % 60), 0)
        .ok_or_else(|| GcalError::InvalidInput(format!("Invalid time {} on {}", slot, date)))?;
    time_zone
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            GcalError::InvalidInput(format!(
                "{} {} does not exist in {}",
                date,
                slot,
                time_zone.name()
            ))
        })
}

/// The first date on or after `today` that falls on `day`.
pub fn next_occurrence(day: DayOfWeek, today: NaiveDate) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = day.weekday().num_days_from_monday() as i64;
    let offset = (target - current).rem_euclid(7);
    today + Duration::days(offset)
}

/// The event that represents `range` within `scope`.
pub fn block_draft(
    scope: BlockScope,
    range: SlotRange,
    settings: &BlockSettings,
    today: NaiveDate,
) -> Result<EventDraft, GcalError> {
    let (date, recurrence) = match scope {
        BlockScope::Weekly(day) => (
            next_occurrence(day, today),
            vec![format!("RRULE:FREQ=WEEKLY;BYDAY={}", day.rrule_code())],
        ),
        BlockScope::Date(date) => (date, Vec::new()),
    };
    let tz_name = settings.time_zone.name();
    let start = local_instant(settings.time_zone, date, range.from)?;
    let end = local_instant(settings.time_zone, date, range.to)?;

    Ok(EventDraft {
        summary: settings.summary.clone(),
        description: Some(DESCRIPTION_MARKER.to_string()),
        start: EventTime::at(start, tz_name),
        end: EventTime::at(end, tz_name),
        recurrence,
        private_properties: HashMap::from([
            (MARKER_APP_KEY.to_string(), MARKER_APP_VALUE.to_string()),
            (MARKER_TYPE_KEY.to_string(), MARKER_TYPE_VALUE.to_string()),
        ]),
    })
}

/// Dates in `[from, to)` on which a block event occurs.
pub fn occurrence_dates(
    event: &RemoteEvent,
    time_zone: Tz,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<NaiveDate> {
    match scope_of(event, time_zone) {
        Some(BlockScope::Date(date)) if date >= from && date < to => vec![date],
        Some(BlockScope::Weekly(day)) => {
            let Some(anchor) = local_start_date(event, time_zone) else {
                return Vec::new();
            };
            let last = rrule_until(event).map_or(to, |until| until.succ_opt().unwrap_or(to).min(to));
            let excluded = excluded_dates(event, time_zone);
            let mut date = next_occurrence(day, anchor.max(from));
            let mut dates = Vec::new();
            while date < last {
                if !excluded.contains(&date) {
                    dates.push(date);
                }
                date += Duration::weeks(1);
            }
            dates
        }
        _ => Vec::new(),
    }
}
