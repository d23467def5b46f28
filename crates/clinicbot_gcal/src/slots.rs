// --- File: crates/clinicbot_gcal/src/slots.rs ---
//! Half-hour slots and the ranges built from them.
//!
//! The dashboard edits blocked time as a grid of 30-minute cells. A [`Slot`] is
//! the start of one cell (or the end of the day, `24:00`), a [`SlotRange`] is a
//! contiguous run of cells. Conversions here are pure so they can be property
//! tested.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Slot granularity in minutes.
pub const SLOT_MINUTES: u16 = 30;
const DAY_MINUTES: u16 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Invalid slot '{0}', expected HH:MM")]
    Format(String),
    #[error("Slot {0} is not aligned to 30 minutes")]
    Unaligned(String),
    #[error("Slot {0} is outside 00:00..=24:00")]
    OutOfRange(String),
    #[error("Range end {to} must be after start {from}")]
    EmptyRange { from: Slot, to: Slot },
}

/// A time-of-day boundary, in minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema), schema(value_type = String, example = "09:30"))]
pub struct Slot(u16);

impl Slot {
    pub const MIDNIGHT: Slot = Slot(0);
    /// Latest slot a range may start at.
    pub const LAST_START: Slot = Slot(DAY_MINUTES - SLOT_MINUTES);
    /// `24:00`, only meaningful as the end of a range.
    pub const END_OF_DAY: Slot = Slot(DAY_MINUTES);

    pub fn from_minutes(minutes: u16) -> Result<Self, SlotError> {
        if minutes > DAY_MINUTES {
            return Err(SlotError::OutOfRange(format_minutes(minutes)));
        }
        if minutes % SLOT_MINUTES != 0 {
            return Err(SlotError::Unaligned(format_minutes(minutes)));
        }
        Ok(Slot(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, SlotError> {
        if minute >= 60 {
            return Err(SlotError::OutOfRange(format!("{:02}:{:02}", hour, minute)));
        }
        Self::from_minutes(hour.saturating_mul(60).saturating_add(minute))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// The following boundary, saturating at `24:00`.
    pub fn next(self) -> Slot {
        Slot((self.0 + SLOT_MINUTES).min(DAY_MINUTES))
    }

    pub fn is_end_of_day(self) -> bool {
        self.0 == DAY_MINUTES
    }
}

fn format_minutes(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_minutes(self.0))
    }
}

impl FromStr for Slot {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| SlotError::Format(s.to_string()))?;
        if h.len() != 2 || m.len() != 2 {
            return Err(SlotError::Format(s.to_string()));
        }
        let hour: u16 = h.parse().map_err(|_| SlotError::Format(s.to_string()))?;
        let minute: u16 = m.parse().map_err(|_| SlotError::Format(s.to_string()))?;
        Slot::from_hm(hour, minute)
    }
}

impl TryFrom<String> for Slot {
    type Error = SlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        slot.to_string()
    }
}

/// A contiguous blocked span `[from, to)` within one day.
///
/// Ranges built through [`SlotRange::new`] always satisfy `to > from`. Ranges
/// deserialized from user input may not; run them through [`SlotRange::clamped`]
/// or [`normalize_ranges`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SlotRange {
    pub from: Slot,
    pub to: Slot,
}

impl SlotRange {
    pub fn new(from: Slot, to: Slot) -> Result<Self, SlotError> {
        if to <= from {
            return Err(SlotError::EmptyRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// The range covering exactly one slot.
    pub fn single(from: Slot) -> Self {
        let from = from.min(Slot::LAST_START);
        Self {
            from,
            to: from.next(),
        }
    }

    /// Apply the edit rules: `from` is capped at 23:30 and an end that is not
    /// after the start moves to `from + 30min`.
    pub fn clamped(self) -> Self {
        let from = self.from.min(Slot::LAST_START);
        let to = if self.to <= from { from.next() } else { self.to };
        Self { from, to }
    }

    /// Move the start; pushes the end forward if it would no longer be after it.
    pub fn with_from(self, from: Slot) -> Self {
        Self { from, to: self.to }.clamped()
    }

    /// Move the end; an end at or before the start snaps to `from + 30min`.
    pub fn with_to(self, to: Slot) -> Self {
        Self { from: self.from, to }.clamped()
    }

    pub fn duration_minutes(self) -> u16 {
        self.to.minutes().saturating_sub(self.from.minutes())
    }

    pub fn slots(self) -> Vec<Slot> {
        expand_range(self.from, self.to)
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Every slot start in `[from, to)`. Empty when `to <= from`.
pub fn expand_range(from: Slot, to: Slot) -> Vec<Slot> {
    (from.minutes()..to.minutes())
        .step_by(SLOT_MINUTES as usize)
        .map(Slot)
        .collect()
}

/// Merge slot starts into the minimal list of ranges covering them.
///
/// Input order and duplicates do not matter. `24:00` is not a slot start and
/// is ignored.
pub fn slots_to_ranges(slots: &[Slot]) -> Vec<SlotRange> {
    let mut sorted: Vec<Slot> = slots
        .iter()
        .copied()
        .filter(|s| !s.is_end_of_day())
        .collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<SlotRange> = Vec::new();
    for slot in sorted {
        match ranges.last_mut() {
            Some(last) if last.to == slot => last.to = slot.next(),
            _ => ranges.push(SlotRange::single(slot)),
        }
    }
    ranges
}

/// Canonical form of user-edited ranges: clamped, unioned and re-merged.
pub fn normalize_ranges(ranges: &[SlotRange]) -> Vec<SlotRange> {
    let slots: Vec<Slot> = ranges
        .iter()
        .flat_map(|r| r.clamped().slots())
        .collect();
    slots_to_ranges(&slots)
}
