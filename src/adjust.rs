//! adjust.rs
//!
//! Stepping a date-time by whole days, months or years, as driven by the
//! `+1d` / `-1m` / `+1y` controls next to each input.
//!
//! Month and year steps never clamp the day of month: the target day is
//! counted from the first of the target month, so Jan 31 + 1 month lands in
//! March and Feb 29 + 1 year lands on Mar 1.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use tracing::{debug, warn};

use crate::instant::Instant;
use crate::zone::{Clock, LocalZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn flip(self) -> Self {
        match self {
            Sign::Plus => Sign::Minus,
            Sign::Minus => Sign::Plus,
        }
    }

    fn factor(self) -> i64 {
        match self {
            Sign::Plus => 1,
            Sign::Minus => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Day,
    Month,
    Year,
}

/// A parsed adjustment token such as `+1d`, `-3m` or `+1y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub sign: Sign,
    pub magnitude: u32,
    /// Units to apply, always in day, month, year order.
    pub units: Vec<Unit>,
}

impl Delta {
    /// Parses a token. Parsing never fails:
    ///   - the sign is `-` only when the token starts with `-`
    ///   - the magnitude is the leading integer between the first and last
    ///     character, and defaults to 1 when missing or zero
    ///   - `d`, `m` and `y` anywhere in the token select units, except that
    ///     `m` is ignored when the token contains `mo`
    pub fn parse(token: &str) -> Self {
        let mut sign = if token.starts_with('-') {
            Sign::Minus
        } else {
            Sign::Plus
        };

        let mut chars = token.chars();
        chars.next();
        let rest = chars.as_str();
        let mut inner = rest.chars();
        inner.next_back();
        let source = if inner.as_str().is_empty() {
            rest
        } else {
            inner.as_str()
        };

        let magnitude = match leading_integer(source) {
            Some((negative, n)) if n != 0 => {
                if negative {
                    sign = sign.flip();
                }
                n
            }
            _ => 1,
        };

        let mut units = Vec::with_capacity(3);
        if token.contains('d') {
            units.push(Unit::Day);
        }
        if token.contains('m') && !token.contains("mo") {
            units.push(Unit::Month);
        }
        if token.contains('y') {
            units.push(Unit::Year);
        }

        Self {
            sign,
            magnitude,
            units,
        }
    }

    /// Applies every unit in turn to the running value. A step whose result
    /// falls outside the representable range is skipped.
    pub fn apply(&self, instant: Instant, zone: &impl LocalZone) -> Instant {
        let amount = self.sign.factor() * i64::from(self.magnitude);
        self.units.iter().fold(instant, |current, &unit| {
            let next = shift(current.local(), unit, amount)
                .and_then(|local| Instant::from_local(local, zone));
            match next {
                Some(next) => next,
                None => {
                    warn!(%current, ?unit, amount, "adjustment out of range, step skipped");
                    current
                }
            }
        })
    }
}

/// Leading integer with an optional sign after optional whitespace.
/// Saturates at `u32::MAX`.
fn leading_integer(s: &str) -> Option<(bool, u32)> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = digits[..end]
        .bytes()
        .fold(0u32, |acc, b| acc.saturating_mul(10).saturating_add(u32::from(b - b'0')));
    Some((negative, value))
}

fn shift(local: NaiveDateTime, unit: Unit, amount: i64) -> Option<NaiveDateTime> {
    let year = i64::from(local.year());
    let month0 = i64::from(local.month0());
    let day = i64::from(local.day());

    let date = match unit {
        Unit::Day => make_day(year, month0, day.checked_add(amount)?),
        Unit::Month => make_day(year, month0.checked_add(amount)?, day),
        Unit::Year => make_day(year.checked_add(amount)?, month0, day),
    }?;
    Some(date.and_time(local.time()))
}

/// Day `day` (1-based, unbounded) of month `month0` (0-based, unbounded).
fn make_day(year: i64, month0: i64, day: i64) -> Option<NaiveDate> {
    let year = year.checked_add(month0.div_euclid(12))?;
    let month = u32::try_from(month0.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;
    first.checked_add_signed(TimeDelta::try_days(day - 1)?)
}

/// Adjusts a serialized date-time by `delta`.
///
/// An empty or unparsable `value` is replaced by the current time from
/// `clock`. The result is always in the `YYYY-MM-DDThh:mm` shape; it is empty
/// only if even the current time cannot be represented in `zone`.
pub fn adjust_instant(
    value: &str,
    delta: &Delta,
    zone: &impl LocalZone,
    clock: &impl Clock,
) -> String {
    let base = match Instant::parse(value, zone) {
        Ok(instant) => Some(instant),
        Err(err) => {
            debug!(%err, "adjusting from current time");
            Instant::now(zone, clock)
        }
    };

    base.map(|instant| delta.apply(instant, zone).to_string())
        .unwrap_or_default()
}
