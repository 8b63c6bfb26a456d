//! Batch skirmish runner.
//!
//! Plays many seeded AI-versus-AI matches of one scenario in parallel
//! using rayon, one battlefield per worker, and aggregates the outcomes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tactics_core::components::TeamId;
use tactics_core::victory::MatchOutcome;
use tracing::{debug, info, warn};

use crate::ai::{GreedyAi, MatchSummary};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Seed of the first game; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Turn limit per game
    pub max_turns: u32,
    /// Where `save` writes results, if anywhere
    pub output_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_turns: 100,
            output_dir: None,
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` games
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the turn limit
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Wins of one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamWins {
    /// Team
    pub team: TeamId,
    /// Games won
    pub wins: u32,
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games that completed
    pub total_games: u32,
    /// Wins per team, in team id order
    pub wins: Vec<TeamWins>,
    /// Games where everyone died
    pub draws: u32,
    /// Games stopped by the turn limit
    pub unfinished: u32,
    /// Mean turn counter at the end of a game
    pub average_turns: f64,
}

impl BatchSummary {
    /// Aggregate finished games
    pub fn from_games(games: &[MatchSummary]) -> Self {
        let mut wins: BTreeMap<TeamId, u32> = BTreeMap::new();
        let mut draws = 0;
        let mut unfinished = 0;
        for game in games {
            match game.outcome {
                MatchOutcome::Victory(team) => *wins.entry(team).or_default() += 1,
                MatchOutcome::Draw => draws += 1,
                MatchOutcome::InProgress => unfinished += 1,
            }
        }
        let total_turns: u64 = games.iter().map(|g| u64::from(g.turns)).sum();

        Self {
            total_games: games.len() as u32,
            wins: wins
                .into_iter()
                .map(|(team, wins)| TeamWins { team, wins })
                .collect(),
            draws,
            unfinished,
            average_turns: total_turns as f64 / games.len().max(1) as f64,
        }
    }

    /// Share of completed games won by `team`
    pub fn win_rate(&self, team: TeamId) -> f64 {
        let wins = self
            .wins
            .iter()
            .find(|w| w.team == team)
            .map_or(0, |w| w.wins);
        f64::from(wins) / f64::from(self.total_games.max(1))
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name
    pub scenario: String,
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game summaries, in seed order
    pub games: Vec<MatchSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

fn run_single_game(scenario: &Scenario, seed: u64, max_turns: u32) -> Result<MatchSummary, String> {
    let mut field = scenario.build(seed).map_err(|e| e.to_string())?;
    Ok(GreedyAi.play_match(&mut field, max_turns, None))
}

/// Run a batch of games
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        scenario = %scenario.name,
        games = config.game_count,
        seed = config.seed_start,
        "Starting batch run"
    );

    let play = || -> Vec<Result<MatchSummary, BatchError>> {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                run_single_game(scenario, seed, config.max_turns).map_err(|message| {
                    warn!(game = i, seed, %message, "Game failed");
                    BatchError {
                        game_index: i,
                        seed,
                        message,
                    }
                })
            })
            .collect()
    };

    let results = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(play),
            Err(error) => {
                warn!(%error, "Could not build a dedicated pool; using the global one");
                play()
            }
        }
    } else {
        play()
    };

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchSummary> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    debug!(?summary, "Batch summary");
    info!(
        "Batch complete: {} games in {:.1}s",
        games.len(),
        duration_seconds
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by playing the same seed several times in parallel.
///
/// Returns the distinct final hashes; a deterministic scenario yields one.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32, max_turns: u32) -> Vec<u64> {
    let mut hashes: Vec<u64> = (0..runs)
        .into_par_iter()
        .filter_map(|_| run_single_game(scenario, seed, max_turns).ok())
        .map(|summary| summary.state_hash)
        .collect();
    hashes.sort_unstable();
    hashes.dedup();
    hashes
}
