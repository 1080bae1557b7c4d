//! # Savannah Sim
//!
//! Headless runner for the Savannah combat core.
//!
//! Loads a scenario from `savannah.toml` (or the file named by
//! `SAVANNAH_CONFIG`), steps a `GameSession` on a fixed tick while a scripted
//! pilot walks the player through its waypoints, logs every gameplay event and
//! prints a JSON summary when the run ends.
//!
//! `savannah --init-config` writes the built-in scenario to the config path.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod pilot;
mod report;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::SimConfig;
use pilot::Pilot;
use report::{log_event, RunReport, RunSummary};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("savannah=info".parse()?))
        .init();

    info!("Savannah combat sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if std::env::args().any(|arg| arg == "--init-config") {
        let path = SimConfig::config_path();
        SimConfig::default().save_to(&path)?;
        info!("Wrote default scenario to {}", path.display());
        return Ok(());
    }

    let mut config = SimConfig::load();
    config.validate();

    let mut session = config.build_session()?;
    let mut pilot = Pilot::new(
        config.waypoints.clone(),
        config.attack_interval,
        config.attack_reach,
    );
    let dt = config.dt();
    let ticks = config.total_ticks();
    let mut summary = RunSummary::default();

    info!("running {ticks} ticks at {} Hz", config.tick_rate);
    for _ in 0..ticks {
        pilot.steer(&mut session, dt);
        session.tick(dt);
        for event in session.drain_events() {
            log_event(&event);
            summary.record(&event);
        }
    }

    if pilot.is_finished() {
        info!("run finished after {:.1}s, all waypoints reached", session.elapsed());
    } else {
        info!(
            "run finished after {:.1}s, waypoint {} of {}",
            session.elapsed(),
            pilot.next_waypoint(),
            config.waypoints.len()
        );
    }

    let report = RunReport {
        summary,
        final_state: session.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Savannah combat sim shutdown complete");
    Ok(())
}
