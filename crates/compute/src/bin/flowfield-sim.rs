//! flowfield-sim — drives the scheduler from a fake simulation loop.
//!
//! Each step submits new flow-field requests toward moving targets over a
//! synthetic terrain, occasionally cancels one, pauses to "edit" the terrain,
//! advances the scheduler and collects whatever is ready. Prints the final
//! metrics as JSON.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{info, warn};

use flowfield_compute::{Scheduler, SchedulerConfig};
use flowfield_core::config::load_dotenv;
use flowfield_core::{GridPos, GridSize, SharedCostSource};

// ── CLI ─────────────────────────────────────────────────────────────

/// Flow-field scheduler simulation driver.
#[derive(Parser, Debug)]
#[command(name = "flowfield-sim", version, about)]
struct Cli {
    /// Path to a scheduler TOML config (defaults + env overrides if omitted).
    #[arg(long, env = "FLOWFIELD_CONFIG")]
    config: Option<String>,

    /// Override the worker count.
    #[arg(long)]
    workers: Option<usize>,

    /// Simulation steps to run.
    #[arg(long, default_value_t = 60)]
    steps: u32,

    /// Requests submitted per step.
    #[arg(long, default_value_t = 2)]
    per_step: u32,

    /// Field width and height in cells.
    #[arg(long, default_value_t = 128)]
    field: usize,

    /// Steps each request may take before its result is forced.
    #[arg(long, default_value_t = 4)]
    iterations: u32,

    /// Cancel every n-th request (0 disables).
    #[arg(long, default_value_t = 7)]
    cancel_every: u32,

    /// Pause for a terrain edit every n steps (0 disables).
    #[arg(long, default_value_t = 10)]
    edit_every: u32,
}

// ── Terrain ─────────────────────────────────────────────────────────

/// Rolling hills with periodic walls. `season` shifts the wall gaps and is
/// only bumped while the scheduler is paused.
fn terrain(season: Arc<AtomicU32>) -> SharedCostSource {
    Arc::new(move |p: GridPos| {
        let season = season.load(Ordering::Relaxed) as i32;
        let wall = p.x.rem_euclid(32) == 16 && (p.y + season * 5).rem_euclid(24) > 3;
        if wall {
            return None;
        }
        let hill = (p.x.wrapping_mul(7) ^ p.y.wrapping_mul(13)).rem_euclid(5);
        Some(1.0 + hill as f32 * 0.5)
    })
}

fn load_config(cli: &Cli) -> anyhow::Result<SchedulerConfig> {
    let mut config = match &cli.config {
        Some(path) => match SchedulerConfig::from_file(path) {
            Ok(cfg) => {
                info!(path = %path, "loaded scheduler config");
                cfg
            }
            Err(e) => {
                warn!(error = %e, path = %path, "failed to load config, using env defaults");
                SchedulerConfig::from_env()?
            }
        },
        None => SchedulerConfig::from_env()?,
    };
    if let Some(workers) = cli.workers {
        config.worker_threads = workers;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let season = Arc::new(AtomicU32::new(0));
    let mut providers = HashMap::new();
    providers.insert(0, terrain(Arc::clone(&season)));

    let scheduler = Scheduler::new(providers, config)?;
    let size = GridSize::new(cli.field, cli.field);
    let half = (cli.field / 2) as i32;
    // Targets wander over a square four fields wide
    let span = i32::try_from(cli.field).unwrap_or(i32::MAX).saturating_mul(4).max(1);

    let started = Instant::now();
    let mut outstanding: VecDeque<u64> = VecDeque::new();
    let mut collected = 0u64;
    let mut submitted = 0u32;

    for step in 0..cli.steps {
        for _ in 0..cli.per_step {
            // Targets wander so every field is different
            let n = submitted as i32;
            let target = GridPos::new(
                n.wrapping_mul(37).rem_euclid(span),
                n.wrapping_mul(53).wrapping_add(step as i32).rem_euclid(span),
            );
            let origin = GridPos::new(target.x - half, target.y - half);
            let id = scheduler.submit(origin, size, target, 0, cli.iterations)?;
            submitted += 1;

            if cli.cancel_every > 0 && submitted % cli.cancel_every == 0 {
                scheduler.cancel(id);
            } else {
                outstanding.push_back(id);
            }
        }

        if cli.edit_every > 0 && step % cli.edit_every == cli.edit_every - 1 {
            scheduler.pause();
            season.fetch_add(1, Ordering::Relaxed);
            scheduler.unpause();
        }

        scheduler.advance()?;

        let mut still_waiting = VecDeque::with_capacity(outstanding.len());
        while let Some(id) = outstanding.pop_front() {
            match scheduler.collect(id)? {
                Some(_) => collected += 1,
                None => still_waiting.push_back(id),
            }
        }
        outstanding = still_waiting;
    }

    info!(
        steps = cli.steps,
        submitted,
        collected,
        outstanding = outstanding.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Simulation finished"
    );

    println!("{}", serde_json::to_string_pretty(&scheduler.metrics())?);
    scheduler.shutdown();
    Ok(())
}
