//! instant.rs
//!
//! A local wall-clock date-time in the `YYYY-MM-DDThh:mm` shape used by
//! `datetime-local` inputs. An `Instant` is either fully valid or absent:
//! anything that does not resolve to a real calendar date-time is rejected
//! as a whole.

use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::zone::{Clock, LocalZone};

/// Accepted input layouts, tried in order. `%.f` also accepts a missing fraction.
const ACCEPTED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S%.f"];

const NANOS_PER_MILLI: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseInstantError {
    #[error("empty date-time value")]
    Empty,
    #[error("`{0}` is not a local date-time (expected YYYY-MM-DDThh:mm)")]
    Malformed(String),
    #[error("`{0}` cannot be represented in the local time zone")]
    OutOfRange(String),
}

/// Wall-clock fields plus the absolute time they resolve to in a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instant {
    local: NaiveDateTime,
    epoch_millis: i64,
}

impl Instant {
    /// Parses a local date-time and canonicalizes it through `zone`.
    pub fn parse(value: &str, zone: &impl LocalZone) -> Result<Self, ParseInstantError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ParseInstantError::Empty);
        }

        let local = ACCEPTED_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .ok_or_else(|| ParseInstantError::Malformed(trimmed.to_string()))?;

        // chrono represents a leap second as nanoseconds past one billion
        if local.nanosecond() >= 1_000 * NANOS_PER_MILLI {
            return Err(ParseInstantError::Malformed(trimmed.to_string()));
        }

        Self::from_local(local, zone)
            .ok_or_else(|| ParseInstantError::OutOfRange(trimmed.to_string()))
    }

    /// Resolves wall-clock fields through `zone`. The stored fields are the
    /// ones the zone reports back, so a time inside a DST gap moves forward.
    pub fn from_local(local: NaiveDateTime, zone: &impl LocalZone) -> Option<Self> {
        let millis = local.with_nanosecond(local.nanosecond() / NANOS_PER_MILLI * NANOS_PER_MILLI)?;
        let epoch_millis = zone.to_epoch_millis(millis)?;
        Self::from_epoch_millis(epoch_millis, zone)
    }

    pub fn from_epoch_millis(epoch_millis: i64, zone: &impl LocalZone) -> Option<Self> {
        let local = zone.to_local(epoch_millis)?;
        Some(Self { local, epoch_millis })
    }

    /// The current time as read from `clock`.
    pub fn now(zone: &impl LocalZone, clock: &impl Clock) -> Option<Self> {
        Self::from_epoch_millis(clock.now_millis(), zone)
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    /// Month and day of month, as used for birthday lookups.
    pub fn month_day(&self) -> (u32, u32) {
        (self.local.month(), self.local.day())
    }
}

/// Serializes in the `datetime-local` shape; seconds are dropped.
impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02}T{:02}:{:02}",
            self.local.year(),
            self.local.month(),
            self.local.day(),
            self.local.hour(),
            self.local.minute()
        )
    }
}

impl Serialize for Instant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
