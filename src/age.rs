//! age.rs
//!
//! Calendar-aware difference between two local date-times, reported both as
//! a carried breakdown:
//!     "X years, Y months, Z days, hh:mm:ss"
//! and as flat totals of days, hours, minutes and seconds.
//!
//! Chrono does not provide a year/month/day diff (unlike Python's
//! relativedelta), so the borrowing rules are implemented here:
//!   • naive field-wise subtraction
//!   • one borrow pass, smallest unit first
//!   • day underflow borrows the length of the month before the end month
//!
//! The breakdown works on wall-clock fields while the totals come from
//! elapsed absolute time, so across a DST change the two disagree by the
//! size of the shift.

use chrono::{Datelike, NaiveDate, Timelike};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::instant::{Instant, ParseInstantError};
use crate::zone::LocalZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDifference {
    pub years: i32,
    pub months: i32,
    pub days: i32,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub total_seconds: i64,
    pub total_minutes: i64,
    pub total_hours: i64,
    pub total_days: i64,
}

impl CalendarDifference {
    /// True when every component of the breakdown is non-negative.
    ///
    /// The single borrow pass can leave `days` negative when the start day
    /// is later in its month than the month before `end` is long
    /// (Jan 31 -> Mar 1 gives 1 month, -2 days).
    pub fn is_normalized(&self) -> bool {
        [
            self.years,
            self.months,
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
        ]
        .iter()
        .all(|&n| n >= 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("invalid start: {0}")]
    InvalidStart(#[source] ParseInstantError),
    #[error("invalid end: {0}")]
    InvalidEnd(#[source] ParseInstantError),
    #[error("end {end} is before start {start}")]
    Inverted { start: Instant, end: Instant },
}

/// Difference from `start` to `end`, or `None` when `end` is earlier.
pub fn compute_difference(start: &Instant, end: &Instant) -> Option<CalendarDifference> {
    if end.epoch_millis() < start.epoch_millis() {
        debug!(%start, %end, "end precedes start, no difference");
        return None;
    }

    let (s, e) = (start.local(), end.local());

    let mut years = e.year() - s.year();
    let mut months = e.month() as i32 - s.month() as i32;
    let mut days = e.day() as i32 - s.day() as i32;
    let mut hours = e.hour() as i32 - s.hour() as i32;
    let mut minutes = e.minute() as i32 - s.minute() as i32;
    let mut seconds = e.second() as i32 - s.second() as i32;

    if seconds < 0 {
        seconds += 60;
        minutes -= 1;
    }
    if minutes < 0 {
        minutes += 60;
        hours -= 1;
    }
    if hours < 0 {
        hours += 24;
        days -= 1;
    }

    // Fix day underflow by borrowing the month before `end`'s month
    if days < 0 {
        let Some(borrowed) = length_of_month_before(e.date()) else {
            warn!(%end, "no month before end date to borrow from");
            return None;
        };
        days += borrowed as i32;
        months -= 1;
    }

    // Fix month underflow
    if months < 0 {
        months += 12;
        years -= 1;
    }

    let total_seconds = (end.epoch_millis() - start.epoch_millis()) / 1000;
    let total_minutes = total_seconds / 60;
    let total_hours = total_minutes / 60;
    let total_days = total_hours / 24;

    let diff = CalendarDifference {
        years,
        months,
        days,
        hours,
        minutes,
        seconds,
        total_seconds,
        total_minutes,
        total_hours,
        total_days,
    };

    if !diff.is_normalized() {
        warn!(
            %start,
            %end,
            years, months, days,
            "single borrow pass left a negative component"
        );
    }

    Some(diff)
}

/// Parses both values through `zone` and computes their difference.
pub fn difference_between(
    start: &str,
    end: &str,
    zone: &impl LocalZone,
) -> Result<CalendarDifference, DiffError> {
    let start = Instant::parse(start, zone).map_err(DiffError::InvalidStart)?;
    let end = Instant::parse(end, zone).map_err(DiffError::InvalidEnd)?;
    compute_difference(&start, &end).ok_or(DiffError::Inverted { start, end })
}

/// Length of the month before the one containing `date`: the day number of
/// the last day before the 1st.
fn length_of_month_before(date: NaiveDate) -> Option<u32> {
    date.with_day(1)?.pred_opt().map(|last| last.day())
}
