//! # Tactics Core
//!
//! Deterministic rules engine for small tactical grid battles.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (damage rolls use a seeded ChaCha stream)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless batch simulation
//! - Replays and save games
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`grid`] - Coordinates, tiles, obstacles
//! - [`components`] - Unit data
//! - [`validation`] - Movement and attack validators
//! - [`damage`] - Damage modifier chain
//! - [`health`] - Health state machine and registry
//! - [`events`] - Events and the priority broadcaster
//! - [`cover`] - Cover and tactical position analysis
//! - [`victory`] - Win condition checking
//! - [`battlefield`] - Match state and player operations
//! - [`replay`] - Actions and replays
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battlefield;
pub mod components;
pub mod config;
pub mod cover;
pub mod damage;
pub mod data;
pub mod error;
pub mod events;
pub mod grid;
pub mod health;
pub mod math;
pub mod replay;
pub mod scheduler;
pub mod validation;
pub mod victory;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battlefield::{AttackReport, Battlefield, Impact, TickEvents};
    pub use crate::components::*;
    pub use crate::config::{DamageConfig, RulesConfig};
    pub use crate::cover::{CoverAnalyzer, CoverQuality};
    pub use crate::damage::{DamageCalculationResult, DamageCalculator, DamageModifier, ModifierKind};
    pub use crate::data::{Controller, TeamData, UnitTemplate};
    pub use crate::error::{Result, TacticsError};
    pub use crate::events::{EventKind, EventPriority, EventType, GameEvent};
    pub use crate::grid::{Facing, Grid, GridCoordinate, Obstacle, TerrainKind};
    pub use crate::math::Fixed;
    pub use crate::replay::{Action, ActionOutcome, Replay};
    pub use crate::scheduler::TaskId;
    pub use crate::validation::{AttackRejection, MoveRejection};
    pub use crate::victory::MatchOutcome;
}
