//! Headless match runner for AI testing and CI verification.
//!
//! This crate drives the rules engine without any presentation layer:
//!
//! - **Scripted runs**: apply a scenario's action script and stream the
//!   dispatched events as JSON lines
//! - **Skirmishes**: play many seeded AI-versus-AI matches in parallel
//! - **Determinism checks**: replay the same seed and compare state hashes
//!
//! # Output
//!
//! - **stdout**: JSON lines (events, rejections, reports)
//! - **stderr**: Debug logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run a scripted scenario
//! cargo run -p tactics_headless -- run --scenario scenarios/corridor.ron --events
//!
//! # Play 200 AI games
//! cargo run -p tactics_headless -- skirmish --count 200 --output results/
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --seed 42 --runs 8
//! ```

pub mod ai;
pub mod batch;
pub mod runner;
pub mod scenario;

pub use ai::{GreedyAi, MatchSummary};
pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use runner::{RunConfig, RunReport, ScenarioRunner};
pub use scenario::{Scenario, ScenarioError};
