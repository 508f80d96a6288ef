//! Error types for the game simulation.
//!
//! Command rejections have their own type, [`crate::commands::CommandError`],
//! because they are routine and never abort anything.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Ruleset failed referential integrity checks.
    #[error("Invalid ruleset: {}", .0.join("; "))]
    InvalidRuleset(Vec<String>),

    /// A unit type key did not resolve against the ruleset.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// A building type key did not resolve against the ruleset.
    #[error("Unknown building type: {0}")]
    UnknownBuildingType(String),

    /// More players than start positions.
    #[error("Too many players: {requested} requested, at most {max} supported")]
    TooManyPlayers {
        /// Number of players requested.
        requested: usize,
        /// Maximum supported.
        max: usize,
    },

    /// Board too small to hold the start layout.
    #[error("Board size {0} is too small")]
    BoardTooSmall(u32),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
}
