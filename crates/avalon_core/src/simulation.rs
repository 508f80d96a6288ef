//! Core simulation loop.
//!
//! A [`Simulation`] owns one game: ruleset, world and fog of war. The
//! server calls [`Simulation::tick`] at a fixed interval with the measured
//! wall-clock delta and applies commands in between with
//! [`Simulation::apply_command`]. Nothing in here performs I/O.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No system randomness (map generation takes a seed)
//! - Consistent iteration order (`BTreeMap` tables keyed by id)
//! - Same state and delta always produce the same next state
//!
//! # Example
//!
//! ```
//! use avalon_core::board::Board;
//! use avalon_core::components::PlayerId;
//! use avalon_core::data::{Ruleset, TerrainKind};
//! use avalon_core::math::Fixed;
//! use avalon_core::simulation::{PlayerSetup, Simulation, TICK_DURATION_MS};
//!
//! let board = Board::filled(250, TerrainKind::Plains);
//! let players = [PlayerSetup::new(PlayerId(1), "Ada")];
//! let mut sim = Simulation::new(Ruleset::standard(), board, &players).unwrap();
//!
//! let report = sim.tick(Fixed::from_num(TICK_DURATION_MS) / Fixed::from_num(1000));
//! assert_eq!(report.tick, 1);
//! assert!(report.dirty.visibility.contains_key(&PlayerId(1)));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::combat::combat_system;
use crate::commands::{apply_command, Command, CommandError};
use crate::components::PlayerId;
use crate::data::Ruleset;
use crate::error::{GameError, Result};
use crate::events::DirtySet;
use crate::map_generation::{start_positions, MAX_START_POSITIONS};
use crate::math::{Fixed, Vec2Fixed};
use crate::player::Player;
use crate::replication::{encode_updates, UpdatePacket};
use crate::systems::{construction_system, movement_system, resource_production_system, training_system};
use crate::visibility::{CellChange, VisibilityEngine};
use crate::world::World;

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;

/// A participant handed to [`Simulation::new`], in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
}

impl PlayerSetup {
    /// Convenience constructor.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// What one tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number just completed.
    pub tick: u64,
    /// Changes, events and visibility deltas.
    pub dirty: DirtySet,
}

/// The authoritative state of one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    ruleset: Ruleset,
    world: World,
    visibility: VisibilityEngine,
    tick: u64,
    /// Changes made by commands since the last tick.
    #[serde(skip)]
    pending: DirtySet,
}

impl Simulation {
    /// Set up a new game.
    ///
    /// Each player, in order, gets the next start anchor, the ruleset's
    /// starting stockpile, a completed headquarters and the starting army.
    pub fn new(ruleset: Ruleset, board: Board, players: &[PlayerSetup]) -> Result<Self> {
        if players.len() > MAX_START_POSITIONS {
            return Err(GameError::TooManyPlayers {
                requested: players.len(),
                max: MAX_START_POSITIONS,
            });
        }
        if board.size() < 8 {
            return Err(GameError::BoardTooSmall(board.size()));
        }
        let hq = ruleset
            .building_id(&ruleset.headquarters)
            .ok_or_else(|| GameError::UnknownBuildingType(ruleset.headquarters.clone()))?;
        let anchors = start_positions(board.size());
        let mut world = World::new(board);

        for (index, setup) in players.iter().enumerate() {
            let start = anchors[index];
            world.add_player(Player::new(
                setup.id,
                setup.name.clone(),
                ruleset.player_color(index),
                ruleset.starting_resources,
                start,
            ));

            let (x, y) = start.cell();
            let base = world
                .place_building(&ruleset, setup.id, hq, x, y)
                .ok_or_else(|| GameError::InvalidState(format!("cannot place base for {}", setup.id)))?;
            world.complete_building(&ruleset, base);

            for spawn in &ruleset.starting_units {
                let kind = ruleset
                    .unit_id(&spawn.unit)
                    .ok_or_else(|| GameError::UnknownUnitType(spawn.unit.clone()))?;
                let pos = start + Vec2Fixed::new(spawn.offset_x, spawn.offset_y);
                world.spawn_unit(&ruleset, setup.id, kind, pos);
            }
        }

        tracing::info!(players = players.len(), size = world.board.size(), "simulation created");
        Ok(Self::from_world(ruleset, world))
    }

    /// Wrap an already populated world. Every player starts fully hidden.
    #[must_use]
    pub fn from_world(ruleset: Ruleset, world: World) -> Self {
        let visibility = VisibilityEngine::new(world.players.keys().copied(), world.board.size());
        Self {
            ruleset,
            world,
            visibility,
            tick: 0,
            pending: DirtySet::default(),
        }
    }

    /// Advance the game by `delta` seconds.
    ///
    /// Systems run in a fixed order: production, construction, training,
    /// movement, combat, then visibility. Negative deltas are treated as
    /// zero.
    pub fn tick(&mut self, delta: Fixed) -> TickReport {
        let delta = delta.max(Fixed::ZERO);
        self.tick += 1;
        let mut dirty = std::mem::take(&mut self.pending);

        resource_production_system(&mut self.world, &self.ruleset, delta, &mut dirty);
        construction_system(&mut self.world, &self.ruleset, delta, &mut dirty);
        training_system(&mut self.world, &self.ruleset, delta, &mut dirty);
        movement_system(&mut self.world, &self.ruleset, delta, &mut dirty);
        combat_system(&mut self.world, &self.ruleset, delta, &mut dirty);
        dirty.merge_visibility(self.visibility.recompute(&self.world, &self.ruleset));

        #[cfg(debug_assertions)]
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(tick = self.tick, hash = self.state_hash(), "tick complete");
        }

        TickReport { tick: self.tick, dirty }
    }

    /// Advance the game and encode one update per player.
    ///
    /// Players with nothing to receive are omitted.
    pub fn step(&mut self, delta: Fixed) -> BTreeMap<PlayerId, UpdatePacket> {
        let report = self.tick(delta);
        encode_updates(self, &report.dirty)
    }

    /// Rerun the visibility pass without advancing time.
    ///
    /// The changes are folded into the next tick's report and also returned.
    pub fn recompute_visibility(&mut self) -> BTreeMap<PlayerId, Vec<CellChange>> {
        let deltas = self.visibility.recompute(&self.world, &self.ruleset);
        self.pending.merge_visibility(deltas.clone());
        deltas
    }

    /// Validate and apply a player command.
    pub fn apply_command(&mut self, player: PlayerId, command: &Command) -> std::result::Result<(), CommandError> {
        let result = apply_command(&mut self.world, &self.ruleset, player, command, &mut self.pending);
        if let Err(err) = &result {
            tracing::debug!(player = player.0, error = %err, "command rejected");
        }
        result
    }

    /// The ruleset this game runs on.
    #[must_use]
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// Current world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for scenario setup.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Fog-of-war state.
    #[must_use]
    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    /// Number of ticks completed.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Hash of the tick counter and the whole world, for desync checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.world.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize simulation state to bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize simulation state from bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TerrainKind;

    fn two_player_game() -> Simulation {
        let players = [PlayerSetup::new(PlayerId(1), "Ada"), PlayerSetup::new(PlayerId(2), "Bo")];
        Simulation::new(Ruleset::standard(), Board::filled(250, TerrainKind::Plains), &players).unwrap()
    }

    fn dt() -> Fixed {
        Fixed::from_num(TICK_DURATION_MS) / Fixed::from_num(1000)
    }

    #[test]
    fn test_new_game_layout() {
        let sim = two_player_game();
        let world = sim.world();
        assert_eq!(world.buildings.len(), 2);
        assert_eq!(world.units.len(), 6);

        let ada = &world.players[&PlayerId(1)];
        assert_eq!(ada.population.current, 3);
        assert_eq!(ada.population.cap, 10);
        assert_eq!(ada.resources, sim.ruleset().starting_resources);
        assert_eq!(ada.start_pos.cell(), (30, 30));
        assert!(world.buildings_of(PlayerId(1)).all(|b| b.is_complete()));

        let bo = &world.players[&PlayerId(2)];
        assert_eq!(bo.start_pos.cell(), (220, 30));
        assert_ne!(ada.color, bo.color);
    }

    #[test]
    fn test_too_many_players() {
        let players: Vec<_> = (0..9).map(|i| PlayerSetup::new(PlayerId(i), "x")).collect();
        let err = Simulation::new(Ruleset::standard(), Board::filled(250, TerrainKind::Plains), &players);
        assert!(matches!(err, Err(GameError::TooManyPlayers { requested: 9, .. })));
    }

    #[test]
    fn test_tick_counts_and_reveals() {
        let mut sim = two_player_game();
        let report = sim.tick(dt());
        assert_eq!(report.tick, 1);
        assert_eq!(sim.current_tick(), 1);
        assert!(report.dirty.players.contains(&PlayerId(1)));
        assert!(report.dirty.visibility.contains_key(&PlayerId(2)));

        let fog = sim.visibility().fog(PlayerId(1)).unwrap();
        assert!(fog.is_visible(sim.world().players[&PlayerId(1)].start_pos));
    }

    #[test]
    fn test_upkeep_drains_food() {
        let mut sim = two_player_game();
        let before = sim.world().players[&PlayerId(1)].resources.food;
        sim.tick(Fixed::ONE);
        // builder 0.1 + two infantry 0.2
        let after = sim.world().players[&PlayerId(1)].resources.food;
        assert!((before - after - Fixed::from_num(0.5)).abs() < Fixed::from_num(0.0001));
    }

    #[test]
    fn test_command_changes_reach_next_report() {
        let mut sim = two_player_game();
        let hq = sim.world().buildings_of(PlayerId(1)).next().unwrap().id;
        sim.apply_command(PlayerId(1), &Command::TrainUnit { building: hq, unit: "BUILDER".into() })
            .unwrap();
        let report = sim.tick(dt());
        assert!(report.dirty.buildings.contains(&hq));
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let a = two_player_game();
        let mut b = two_player_game();
        assert_eq!(a.state_hash(), b.state_hash());
        b.tick(dt());
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut sim = two_player_game();
        sim.tick(dt());
        let bytes = sim.serialize().unwrap();
        let restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), sim.state_hash());
        assert_eq!(restored.world(), sim.world());
    }

    #[test]
    fn test_negative_delta_is_ignored() {
        let mut sim = two_player_game();
        let before = sim.world().clone();
        sim.tick(Fixed::from_num(-5));
        assert_eq!(sim.world(), &before);
    }
}
