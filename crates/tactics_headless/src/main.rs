//! Headless tactics match runner.
//!
//! Runs matches without any presentation layer. Results go to stdout as
//! JSON, logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario script, printing events
//! cargo run -p tactics_headless -- run --scenario corridor.ron --events
//!
//! # Run a batch of AI skirmishes
//! cargo run -p tactics_headless -- skirmish --count 1000 --output results/
//!
//! # Verify determinism of a seed
//! cargo run -p tactics_headless -- verify --seed 12345 --runs 5
//!
//! # Verify a recorded replay
//! cargo run -p tactics_headless -- replay --file match.replay
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tactics_core::replay::Replay;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tactics_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{RunConfig, ScenarioRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless tactics match runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario's action script
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Damage seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Print every dispatched event
        #[arg(long)]
        events: bool,

        /// Write the recorded replay here
        #[arg(long)]
        replay_out: Option<PathBuf>,
    },

    /// Play a batch of seeded AI-versus-AI matches
    Skirmish {
        /// Scenario file (default: built-in 2v2 skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Turn limit per game
        #[arg(long, default_value = "100")]
        max_turns: u32,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario file (default: built-in 2v2 skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Turn limit per game
        #[arg(long, default_value = "100")]
        max_turns: u32,
    },

    /// Re-run a recorded replay and check its final hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for results.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            seed,
            events,
            replay_out,
        } => cmd_run(&scenario, seed, events, replay_out.as_deref()),
        Commands::Skirmish {
            scenario,
            count,
            parallel,
            seed,
            max_turns,
            output,
        } => cmd_skirmish(scenario.as_deref(), count, parallel, seed, max_turns, output),
        Commands::Verify {
            scenario,
            seed,
            runs,
            max_turns,
        } => cmd_verify(scenario.as_deref(), seed, runs, max_turns),
        Commands::Replay { file } => cmd_replay(&file),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario, String> {
    match path {
        Some(path) => Scenario::load(path).map_err(|e| e.to_string()),
        None => Ok(Scenario::default()),
    }
}

/// Run a scenario script
fn cmd_run(
    path: &Path,
    seed: u64,
    events: bool,
    replay_out: Option<&Path>,
) -> Result<ExitCode, String> {
    let scenario = load_scenario(Some(path))?;
    tracing::info!(scenario = %scenario.name, seed, "Running scenario");

    let runner = ScenarioRunner::new(
        scenario,
        RunConfig {
            seed,
            emit_events: events,
        },
    );
    let stdout = std::io::stdout();
    let (_, replay) = runner
        .run(&mut stdout.lock())
        .map_err(|e| e.to_string())?;

    if let Some(path) = replay_out {
        let bytes = replay.to_bytes().map_err(|e| e.to_string())?;
        std::fs::write(path, bytes)
            .map_err(|e| format!("Failed to write replay '{}': {e}", path.display()))?;
        tracing::info!(path = %path.display(), actions = replay.action_count(), "Replay saved");
    }
    Ok(ExitCode::SUCCESS)
}

/// Run a batch of AI skirmishes
fn cmd_skirmish(
    path: Option<&Path>,
    count: u32,
    parallel: u32,
    seed: u64,
    max_turns: u32,
    output: Option<PathBuf>,
) -> Result<ExitCode, String> {
    let scenario = load_scenario(path)?;
    let config = BatchConfig {
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        max_turns,
        output_dir: output.clone(),
    };
    let results = run_batch(&scenario, config);

    if let Some(dir) = output {
        let path = dir.join("batch_results.json");
        results
            .save(&path)
            .map_err(|e| format!("Failed to save results to '{}': {e}", path.display()))?;
        tracing::info!(path = %path.display(), "Results saved");
    }

    let summary = serde_json::to_string(&results.summary).map_err(|e| e.to_string())?;
    println!("{summary}");

    if results.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(failed = results.errors.len(), "Some games failed");
        Ok(ExitCode::FAILURE)
    }
}

/// Verify determinism
fn cmd_verify(path: Option<&Path>, seed: u64, runs: u32, max_turns: u32) -> Result<ExitCode, String> {
    let scenario = load_scenario(path)?;
    let hashes = verify_determinism(&scenario, seed, runs, max_turns);
    let deterministic = hashes.len() == 1;

    println!(
        "{}",
        serde_json::json!({
            "scenario": scenario.name,
            "seed": seed,
            "runs": runs,
            "deterministic": deterministic,
            "hashes": hashes,
        })
    );

    if deterministic {
        tracing::info!(seed, runs, "Determinism verified");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(seed, distinct = hashes.len(), "Determinism check failed");
        Ok(ExitCode::FAILURE)
    }
}

/// Re-run a replay
fn cmd_replay(file: &Path) -> Result<ExitCode, String> {
    let bytes = std::fs::read(file)
        .map_err(|e| format!("Failed to read replay '{}': {e}", file.display()))?;
    let replay = Replay::from_bytes(&bytes).map_err(|e| e.to_string())?;
    let matches = replay.verify().map_err(|e| e.to_string())?;

    println!(
        "{}",
        serde_json::json!({
            "scenario": replay.scenario_id,
            "actions": replay.action_count(),
            "final_hash": replay.final_hash,
            "verified": matches,
        })
    );
    Ok(if matches {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
