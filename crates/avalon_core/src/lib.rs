//! # Avalon Core
//!
//! Authoritative simulation core for the Avalon browser RTS.
//!
//! This crate contains **only** game logic:
//! - No networking
//! - No IO
//! - No system randomness (map generation takes a seed)
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! The server drives a [`simulation::Simulation`] at a fixed interval,
//! applies player commands between ticks, and ships the per-player packets
//! produced by [`replication`].
//!
//! ## Crate Structure
//!
//! - [`data`] - Ruleset: units, buildings, terrain, techs, matchups
//! - [`board`] / [`map_generation`] - Terrain grid and seeded map generation
//! - [`world`] - Entity tables and player records
//! - [`systems`] / [`combat`] - Per-tick simulation systems
//! - [`visibility`] - Per-player fog of war
//! - [`commands`] - Player command validation
//! - [`replication`] - Visibility-filtered update packets
//! - [`simulation`] - Core simulation loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod board;
pub mod combat;
pub mod commands;
pub mod components;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod map_generation;
pub mod math;
pub mod player;
pub mod replication;
pub mod simulation;
pub mod systems;
pub mod visibility;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::board::{Board, GRID_SIZE};
    pub use crate::commands::{Command, CommandError};
    pub use crate::components::*;
    pub use crate::data::{BuildingTypeId, Ruleset, TerrainKind, UnitTypeId};
    pub use crate::economy::{ResourceKind, Resources};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{DirtySet, GameEvent, SfxKind};
    pub use crate::map_generation::{generate_board, MapConfig};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::player::{Player, Population};
    pub use crate::replication::{InitialPacket, UpdatePacket};
    pub use crate::simulation::{PlayerSetup, Simulation, TickReport, TICK_DURATION_MS, TICK_RATE};
    pub use crate::visibility::Visibility;
    pub use crate::world::World;
}
