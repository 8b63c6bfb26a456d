//! Error types for the rules engine.
//!
//! Validation failures are not errors: validators return typed
//! rejections as values. This enum covers the operational failures of
//! the battlefield itself.

use thiserror::Error;

use crate::components::{TeamId, UnitId};
use crate::grid::GridCoordinate;
use crate::validation::{AttackRejection, MoveRejection};

/// Result type alias using [`TacticsError`].
pub type Result<T> = std::result::Result<T, TacticsError>;

/// Top-level error type for all rules engine errors.
#[derive(Debug, Error)]
pub enum TacticsError {
    /// No unit with this identifier exists.
    #[error("Unknown unit ID: {0}")]
    UnknownUnit(UnitId),

    /// No team with this identifier is configured.
    #[error("Unknown team ID: {0}")]
    UnknownTeam(TeamId),

    /// A coordinate lies outside the battlefield.
    #[error("Coordinate {0} is outside the battlefield")]
    OutOfBounds(GridCoordinate),

    /// A spawn was requested on a tile that cannot hold a unit.
    #[error("Tile {0} is blocked or occupied")]
    TileUnavailable(GridCoordinate),

    /// A move request failed validation.
    #[error("Move rejected: {0}")]
    MoveRejected(#[from] MoveRejection),

    /// An attack request failed validation.
    #[error("Attack rejected: {0}")]
    AttackRejected(#[from] AttackRejection),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),
}
