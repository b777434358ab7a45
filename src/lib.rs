//! Calendar-aware age calculation.
//!
//! The core is two pure operations over local wall-clock date-times:
//! [`compute_difference`] (years/months/days/hh:mm:ss plus flat totals) and
//! [`adjust_instant`] (step a value by `+1d`, `-1m`, `+1y`, ...). The time
//! zone and the current time are injected through [`LocalZone`] and
//! [`Clock`]. Around them sit a famous-birthday lookup and a text/JSON
//! renderer used by the `agecalc` binary.

pub mod adjust;
pub mod age;
pub mod instant;
pub mod logging;
pub mod render;
pub mod wikimedia;
pub mod zone;

pub use adjust::{Delta, Sign, Unit, adjust_instant};
pub use age::{CalendarDifference, DiffError, compute_difference, difference_between};
pub use instant::{Instant, ParseInstantError};
pub use zone::{Clock, FixedClock, HostZone, LocalZone, SystemClock};
