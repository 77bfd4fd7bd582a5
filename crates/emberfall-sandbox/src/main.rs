//! # Emberfall Sandbox
//!
//! Runs a combat scenario headless and prints the events it produced.
//!
//! ```text
//! emberfall-sandbox <scenario.toml> [--config <combat.toml>] [--json]
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use emberfall_combat::config::{CombatConfig, CONFIG_FILE};
use emberfall_sandbox::{run, Scenario};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

struct Args {
    scenario: PathBuf,
    config: PathBuf,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut scenario = None;
    let mut config = PathBuf::from(CONFIG_FILE);
    let mut json = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = args.next().context("--config needs a path")?.into();
            },
            "--json" => json = true,
            other if other.starts_with("--") => bail!("unknown flag: {other}"),
            other => scenario = Some(PathBuf::from(other)),
        }
    }

    let scenario = scenario.context("usage: emberfall-sandbox <scenario.toml> [--config <combat.toml>] [--json]")?;
    Ok(Args {
        scenario,
        config,
        json,
    })
}

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("emberfall=info".parse()?))
        .init();

    info!("Emberfall sandbox {}", env!("CARGO_PKG_VERSION"));

    let args = parse_args()?;
    let config = CombatConfig::load_from(&args.config);
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;

    let report = run(&scenario, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for stamped in &report.events {
        println!(
            "[{:>6} ms] {}",
            stamped.time_ms,
            serde_json::to_string(&stamped.event)?
        );
    }
    println!(
        "{}: {} ticks, {} kills, {} rejected, player HP {} (level {}){}",
        report.scenario,
        report.ticks,
        report.kills,
        report.rejected_actions,
        report.player_hp,
        report.player_level,
        if report.player_defeated { ", defeated" } else { "" }
    );
    Ok(())
}
