//! Immigration simulator
//!
//! Runs the immigration engine against a sandbox keeper dungeon for a number
//! of ticks. Offers, expiries and arrivals are logged; with `--auto-accept`
//! every offer that can join is accepted as soon as it appears.

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use keep_immigration::collective::{Population, SandboxColony};
use keep_immigration::core::config::ImmigrationConfig;
use keep_immigration::core::error::Result;
use keep_immigration::core::types::SunlightState;
use keep_immigration::immigration::Immigration;

/// Headless immigration simulator
#[derive(Parser, Debug)]
#[command(name = "immigration_sim")]
#[command(about = "Simulate immigration offers for a sandbox keeper colony")]
struct Args {
    /// Roster TOML file (defaults to the built-in keeper roster)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 3000)]
    ticks: u64,

    /// Ticks per day/night half-cycle
    #[arg(long, default_value_t = 600)]
    day_length: u64,

    /// Accept every offer that can join
    #[arg(long)]
    auto_accept: bool,

    /// Write the final immigration state as JSON
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// Summary printed at the end of a run
#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    population: u32,
    members_by_kind: BTreeMap<String, usize>,
    pending_candidates: usize,
    teams: usize,
    gold: u32,
    mana: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keep_immigration=info,immigration_sim=info")),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let config = match &args.config {
        Some(path) => ImmigrationConfig::load_from_toml(path)?,
        None => ImmigrationConfig::keeper()?,
    };
    tracing::info!("Loaded {} immigrant templates (seed {})", config.immigrants.len(), seed);

    let mut immigration = Immigration::new(config)?;
    let mut colony = SandboxColony::keeper_demo();
    let day_length = args.day_length.max(1);

    for tick in 0..args.ticks {
        colony.set_time(tick as f64);
        colony.set_sunlight(if (tick / day_length) % 2 == 0 {
            SunlightState::Day
        } else {
            SunlightState::Night
        });

        immigration.update(&mut colony, &mut rng);

        if args.auto_accept {
            let ids: Vec<_> = immigration.get_available(&colony).keys().copied().collect();
            for id in ids {
                if immigration.missing_requirements(id, &colony, &mut rng).is_empty() {
                    immigration.accept(id, &mut colony, &mut rng);
                }
            }
        }

        for event in immigration.drain_events() {
            tracing::info!("[{:>6.0}] {}", event.time, event.describe());
        }
    }

    for (id, view) in immigration.get_available(&colony) {
        let reasons = immigration.missing_requirements(id, &colony, &mut rng);
        let cost = view
            .cost
            .as_ref()
            .map(|c| format!(" ({} {})", c.value, c.resource))
            .unwrap_or_default();
        if reasons.is_empty() {
            println!("#{} {} x{}{}: ready", id, view.template.name, view.candidate.units().len(), cost);
        } else {
            println!(
                "#{} {} x{}{}: {}",
                id,
                view.template.name,
                view.candidate.units().len(),
                cost,
                reasons.join("; ")
            );
        }
    }

    let mut members_by_kind = BTreeMap::new();
    for unit in colony.units() {
        if let Some(member) = colony.member(unit) {
            *members_by_kind.entry(member.kind.to_string()).or_insert(0) += 1;
        }
    }
    let summary = RunSummary {
        seed,
        ticks: args.ticks,
        population: colony.population_size(),
        members_by_kind,
        pending_candidates: immigration.pool().len(),
        teams: colony.teams().len(),
        gold: colony.resource("gold"),
        mana: colony.resource("mana"),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = &args.snapshot {
        std::fs::write(path, immigration.to_json()?)?;
        tracing::info!("Snapshot written to {}", path.display());
    }
    Ok(())
}
