use agecalc::wikimedia::DEFAULT_BASE_URL;
use agecalc::{Clock, Delta, LocalZone, adjust_instant};
use chrono::FixedOffset;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "agecalc", version)]
#[command(about = "Calendar-aware age calculator with famous birthdays", long_about = None)]
pub struct Cli {
    /// Date of birth in local time (YYYY-MM-DDThh:mm[:ss])
    #[arg(long, env = "AGECALC_DOB")]
    pub dob: Option<String>,

    /// Reference date-time in local time; defaults to now
    #[arg(long, env = "AGECALC_CURRENT")]
    pub current: Option<String>,

    /// Step the date of birth before computing (+1d, -1m, +1y, ...). Repeatable
    #[arg(long = "adjust-dob", value_name = "DELTA", allow_hyphen_values = true)]
    pub adjust_dob: Vec<String>,

    /// Step the reference date-time before computing. Repeatable
    #[arg(long = "adjust-current", value_name = "DELTA", allow_hyphen_values = true)]
    pub adjust_current: Vec<String>,

    /// Fixed UTC offset (e.g. +05:30) to use instead of the host time zone
    #[arg(
        long,
        env = "AGECALC_UTC_OFFSET",
        value_parser = parse_offset,
        allow_hyphen_values = true
    )]
    pub utc_offset: Option<FixedOffset>,

    /// Root of the Wikimedia REST API
    #[arg(long, env = "AGECALC_WIKIMEDIA_URL", default_value = DEFAULT_BASE_URL)]
    pub wikimedia_url: String,

    /// Skip the famous-birthday lookup
    #[arg(long)]
    pub no_celebrities: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Re-render every second until interrupted
    #[arg(long)]
    pub watch: bool,

    /// Log every computation and request to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_offset(s: &str) -> Result<FixedOffset, String> {
    s.parse::<FixedOffset>()
        .map_err(|e| format!("`{s}` is not a UTC offset like +05:30: {e}"))
}

/// Runs `value` through each adjustment in order, as if the matching
/// control had been pressed once per delta.
pub fn apply_adjustments(
    value: Option<String>,
    deltas: &[String],
    zone: &impl LocalZone,
    clock: &impl Clock,
) -> Option<String> {
    if deltas.is_empty() {
        return value;
    }
    let adjusted = deltas.iter().fold(value.unwrap_or_default(), |current, token| {
        adjust_instant(&current, &Delta::parse(token), zone, clock)
    });
    Some(adjusted)
}
