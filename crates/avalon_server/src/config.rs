//! Server configuration.
//!
//! Loaded from an optional RON file; command-line flags override single
//! fields afterwards.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     bind: "0.0.0.0:3000",
//!     max_players: 8,
//!     tick_rate: 20,
//!     grid_size: 250,
//!     map_seed: Some(12345),
//!     ruleset_path: None,
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use avalon_core::board::GRID_SIZE;
use avalon_core::data::Ruleset;
use avalon_core::error::GameError;
use avalon_core::map_generation::MAX_START_POSITIONS;
use avalon_core::simulation::TICK_RATE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted board side.
pub const MIN_GRID_SIZE: u32 = 32;
/// Largest accepted board side. Per-player fog bitmaps scale with its square.
pub const MAX_GRID_SIZE: u32 = 1024;

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The ruleset override is broken.
    #[error("Failed to load ruleset: {0}")]
    Ruleset(#[from] GameError),
    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    /// Maximum players per game.
    pub max_players: usize,
    /// Tick rate (must match clients).
    pub tick_rate: u32,
    /// Board side length.
    pub grid_size: u32,
    /// Map seed; a fresh one is drawn per game when unset.
    pub map_seed: Option<u64>,
    /// Ruleset file replacing the built-in balance.
    pub ruleset_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            max_players: MAX_START_POSITIONS,
            tick_rate: TICK_RATE,
            grid_size: GRID_SIZE,
            map_seed: None,
            ruleset_path: None,
        }
    }
}

impl ServerConfig {
    /// Load from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_players == 0 || self.max_players > MAX_START_POSITIONS {
            return Err(ConfigError::Invalid(format!(
                "max_players must be in 1..={MAX_START_POSITIONS}, got {}",
                self.max_players
            )));
        }
        if !(1..=60).contains(&self.tick_rate) {
            return Err(ConfigError::Invalid(format!(
                "tick_rate must be in 1..=60, got {}",
                self.tick_rate
            )));
        }
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(ConfigError::Invalid(format!(
                "grid_size must be in {MIN_GRID_SIZE}..={MAX_GRID_SIZE}, got {}",
                self.grid_size
            )));
        }
        Ok(())
    }

    /// Time between ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.tick_rate.max(1)))
    }

    /// The ruleset games run on: the override file if set, else the
    /// standard balance.
    pub fn load_ruleset(&self) -> Result<Ruleset, ConfigError> {
        match &self.ruleset_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.display().to_string()));
                }
                let contents = std::fs::read_to_string(path)?;
                Ok(Ruleset::from_ron_str(&contents)?)
            }
            None => Ok(Ruleset::standard()),
        }
    }
}
