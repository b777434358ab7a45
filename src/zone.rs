//! zone.rs
//!
//! Host hooks for everything the engine would otherwise read from ambient
//! state: the local time zone (wall clock <-> absolute time) and the current
//! time. Both are passed explicitly so results are reproducible in tests.

use chrono::{
    DateTime, FixedOffset, Local, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
};

/// How far back to look for the offset in force before a DST gap.
const GAP_LOOKBACK_HOURS: i64 = 24;

/// Maps local wall-clock fields to absolute epoch milliseconds and back.
pub trait LocalZone {
    /// Resolves wall-clock fields to epoch milliseconds.
    ///
    /// Ambiguous wall times resolve to the earlier instant. Wall times that
    /// fall inside a gap are read with the offset in force before the gap,
    /// which moves them forward by the length of the gap.
    fn to_epoch_millis(&self, local: NaiveDateTime) -> Option<i64>;

    /// Wall-clock fields observed at `epoch_millis` in this zone.
    fn to_local(&self, epoch_millis: i64) -> Option<NaiveDateTime>;
}

/// Accessor for the current time.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<i64> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.timestamp_millis()),
        // `Local` does not promise which of the two comes first
        LocalResult::Ambiguous(a, b) => Some(a.timestamp_millis().min(b.timestamp_millis())),
        LocalResult::None => {
            let before_gap = (1..=GAP_LOOKBACK_HOURS).find_map(|hours| {
                let earlier = local.checked_sub_signed(TimeDelta::try_hours(hours)?)?;
                tz.from_local_datetime(&earlier).earliest()
            })?;
            let offset_secs = before_gap.offset().fix().local_minus_utc();
            let utc = local.checked_sub_signed(TimeDelta::try_seconds(offset_secs.into())?)?;
            Some(utc.and_utc().timestamp_millis())
        }
    }
}

fn observe_local<Tz: TimeZone>(tz: &Tz, epoch_millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(epoch_millis).map(|utc| utc.with_timezone(tz).naive_local())
}

macro_rules! chrono_zone {
    ($($ty:ty),*) => {
        $(
            impl LocalZone for $ty {
                fn to_epoch_millis(&self, local: NaiveDateTime) -> Option<i64> {
                    resolve_local(self, local)
                }

                fn to_local(&self, epoch_millis: i64) -> Option<NaiveDateTime> {
                    observe_local(self, epoch_millis)
                }
            }
        )*
    };
}

chrono_zone!(Local, Utc, FixedOffset);

/// The zone a command-line run operates in: the host's own zone, or a fixed
/// UTC offset chosen by the user.
#[derive(Debug, Clone, Copy)]
pub enum HostZone {
    Host,
    Fixed(FixedOffset),
}

impl HostZone {
    /// Display name, e.g. `Europe/Paris` or `+05:30`.
    pub fn name(&self) -> String {
        match self {
            HostZone::Host => iana_time_zone::get_timezone().unwrap_or_else(|err| {
                tracing::debug!(%err, "host time zone name unavailable, reporting UTC");
                "UTC".to_string()
            }),
            HostZone::Fixed(offset) => offset.to_string(),
        }
    }
}

impl LocalZone for HostZone {
    fn to_epoch_millis(&self, local: NaiveDateTime) -> Option<i64> {
        match self {
            HostZone::Host => Local.to_epoch_millis(local),
            HostZone::Fixed(offset) => offset.to_epoch_millis(local),
        }
    }

    fn to_local(&self, epoch_millis: i64) -> Option<NaiveDateTime> {
        match self {
            HostZone::Host => Local.to_local(epoch_millis),
            HostZone::Fixed(offset) => offset.to_local(epoch_millis),
        }
    }
}
