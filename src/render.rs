//! Presentation layer: turns two user-supplied values into a [`Report`] and
//! renders it as aligned text or JSON.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::age::{CalendarDifference, compute_difference};
use crate::instant::Instant;
use crate::wikimedia::CelebrityLookup;
use crate::zone::{Clock, LocalZone};

const MIN_ALIGN_WIDTH: usize = 40;

pub const MISSING_DOB: &str = "Enter a valid Date of Birth";
pub const INVERTED: &str = "Current date must be on/after DOB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgeOutcome {
    MissingDob,
    Inverted,
    Computed { difference: CalendarDifference },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub time_zone: String,
    pub dob: Option<Instant>,
    pub current: Instant,
    pub age: AgeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebrities: Option<CelebrityLookup>,
}

impl Report {
    /// Builds a report from raw input values. A missing or invalid `current`
    /// falls back to the time read from `clock`.
    pub fn build(
        dob: Option<&str>,
        current: Option<&str>,
        time_zone: String,
        zone: &impl LocalZone,
        clock: &impl Clock,
    ) -> Result<Self> {
        let dob = dob.and_then(|v| Instant::parse(v, zone).ok());
        let current = match current.map(|v| Instant::parse(v, zone)) {
            Some(Ok(instant)) => instant,
            _ => Instant::now(zone, clock)
                .context("Current time cannot be represented in the selected time zone")?,
        };

        let age = match &dob {
            None => AgeOutcome::MissingDob,
            Some(dob) => match compute_difference(dob, &current) {
                Some(difference) => AgeOutcome::Computed { difference },
                None => AgeOutcome::Inverted,
            },
        };

        Ok(Self {
            time_zone,
            dob,
            current,
            age,
            celebrities: None,
        })
    }

    /// Month/day to look famous birthdays up for, when the DOB is valid.
    pub fn birthday(&self) -> Option<(u32, u32)> {
        self.dob.as_ref().map(Instant::month_day)
    }
}

pub fn ymd_line(d: &CalendarDifference) -> String {
    format!("{} years, {} months, {} days", d.years, d.months, d.days)
}

pub fn hms_line(d: &CalendarDifference) -> String {
    format!(
        "{:02}:{:02}:{:02} (hh:mm:ss)",
        d.hours, d.minutes, d.seconds
    )
}

pub fn totals_line(d: &CalendarDifference) -> String {
    format!(
        "{} days • {} hours • {} minutes • {} seconds",
        d.total_days, d.total_hours, d.total_minutes, d.total_seconds
    )
}

fn reference(instant: &Instant) -> String {
    instant.local().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn build_stat_row(key: &str, value: &str, align_width: usize) -> String {
    let key_part = format!("{key}: ");
    let base_len = key_part.chars().count() + value.chars().count();
    let available = align_width.saturating_sub(base_len);

    let dots = match available {
        0 => "".to_string(),
        1 => " ".to_string(),
        2 => ". ".to_string(),
        n => format!("{} ", ".".repeat(n - 1)),
    };

    format!("{key_part}{dots}{value}")
}

fn build_header_line(label: &str, align_width: usize) -> String {
    let base = format!("{label} ");
    let dash_count = align_width.saturating_sub(base.chars().count());
    format!("{base}{}", "-".repeat(dash_count))
}

/// Renders the report as aligned `key: ..... value` rows.
pub fn render_text(report: &Report) -> String {
    let mut rows: Vec<(&str, String)> = Vec::new();

    match &report.age {
        AgeOutcome::MissingDob => rows.push(("Age", MISSING_DOB.to_string())),
        AgeOutcome::Inverted => rows.push(("Age", INVERTED.to_string())),
        AgeOutcome::Computed { difference } => {
            rows.push(("Age", ymd_line(difference)));
            rows.push(("Clock", hms_line(difference)));
            rows.push(("Total", totals_line(difference)));
            if let Some(dob) = &report.dob {
                rows.push(("DOB", reference(dob)));
            }
            rows.push(("Current", reference(&report.current)));
        }
    }
    rows.push(("Time zone", report.time_zone.clone()));

    let align_width = rows
        .iter()
        .map(|(k, v)| k.chars().count() + 2 + v.chars().count() + 2)
        .max()
        .unwrap_or(0)
        .max(MIN_ALIGN_WIDTH);

    let mut out = build_header_line("agecalc", align_width);
    out.push('\n');
    for (key, value) in &rows {
        out.push_str(&build_stat_row(key, value, align_width));
        out.push('\n');
    }

    if let (Some(lookup), Some((month, day))) = (&report.celebrities, report.birthday()) {
        out.push('\n');
        out.push_str(&build_header_line(
            &format!("Famous birthdays {month:02}/{day:02}"),
            align_width,
        ));
        out.push('\n');
        out.push_str(&render_celebrities(lookup, month, day));
    }

    out
}

fn render_celebrities(lookup: &CelebrityLookup, month: u32, day: u32) -> String {
    match lookup {
        CelebrityLookup::NoneOnDate => format!("No celebrities found on {month:02}/{day:02}.\n"),
        CelebrityLookup::NoEntries => "No entries found.\n".to_string(),
        CelebrityLookup::Failed(err) => {
            format!("Failed to fetch celebrity list. Error: {err}.\n")
        }
        CelebrityLookup::Found(list) => {
            let mut out = String::new();
            for item in list {
                let page = if item.page_url.is_empty() {
                    "—"
                } else {
                    item.page_url.as_str()
                };
                out.push_str(&format!(
                    "• {}\n  {}\n  Page: {}\n",
                    item.title, item.extract, page
                ));
            }
            out
        }
    }
}

pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}
