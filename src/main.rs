mod cli;

use agecalc::logging::{self, Verbosity};
use agecalc::render::{self, Report};
use agecalc::wikimedia::WikimediaClient;
use agecalc::{HostZone, SystemClock};
use anyhow::Result;
use clap::Parser;
use cli::{Cli, apply_adjustments};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", render::render_json(report)?);
    } else {
        println!("{}", render::render_text(report));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose {
        Verbosity::Debug
    } else {
        Verbosity::Quiet
    });

    let zone = cli.utc_offset.map_or(HostZone::Host, HostZone::Fixed);
    let clock = SystemClock;
    let time_zone = zone.name();

    let dob = apply_adjustments(cli.dob.clone(), &cli.adjust_dob, &zone, &clock);
    let current = apply_adjustments(cli.current.clone(), &cli.adjust_current, &zone, &clock);

    let build = || {
        Report::build(
            dob.as_deref(),
            current.as_deref(),
            time_zone.clone(),
            &zone,
            &clock,
        )
    };

    let mut report = build()?;

    // Birthdays depend only on the DOB, so they are looked up once
    let celebrities = match report.birthday() {
        Some((month, day)) if !cli.no_celebrities => {
            let client = WikimediaClient::new(&cli.wikimedia_url)?;
            Some(client.lookup(month, day).await)
        }
        _ => None,
    };
    report.celebrities = celebrities.clone();
    print_report(&report, cli.json)?;

    if !cli.watch {
        return Ok(());
    }

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                break;
            }
            _ = ticker.tick() => {
                let mut report = build()?;
                report.celebrities = celebrities.clone();
                print_report(&report, cli.json)?;
            }
        }
    }

    Ok(())
}
