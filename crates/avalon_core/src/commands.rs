//! Player intents and their validation.
//!
//! Commands arrive between ticks and are applied immediately. Every check
//! runs before anything is mutated, so a rejected command leaves the world
//! exactly as it was.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{BuildingId, EntityRef, PlayerId, TrainingItem, UnitId};
use crate::data::{Ruleset, TerrainKind};
use crate::events::DirtySet;
use crate::math::{Fixed, Vec2Fixed};
use crate::world::World;

/// Longest allowed training queue.
pub const MAX_QUEUE_LEN: usize = 5;

/// An intent issued by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Walk the listed units to a point, dropping any attack target.
    MoveUnits {
        /// Units to move. Ids the player does not own are skipped.
        unit_ids: Vec<UnitId>,
        /// Destination; clamped onto the board.
        target: Vec2Fixed,
    },
    /// Order the listed units to attack an entity.
    AttackTarget {
        /// Attackers. Ids the player does not own are skipped.
        unit_ids: Vec<UnitId>,
        /// Raw id of the unit or building to attack.
        target: u64,
    },
    /// Have a builder place a new structure.
    BuildStructure {
        /// Unit doing the work.
        builder: UnitId,
        /// Building type key.
        structure: String,
        /// Top-left cell x.
        x: i32,
        /// Top-left cell y.
        y: i32,
    },
    /// Queue a unit at a building.
    TrainUnit {
        /// Training building.
        building: BuildingId,
        /// Unit type key.
        unit: String,
    },
}

/// Why a command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The issuing player is not in this game.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// No unit or building has this id.
    #[error("no entity with id {0}")]
    UnknownEntity(u64),

    /// The entity belongs to someone else.
    #[error("entity {0} is not owned by the issuing player")]
    NotOwned(u64),

    /// The unit cannot construct buildings.
    #[error("unit {0} cannot build")]
    NotABuilder(UnitId),

    /// No unit type has this key.
    #[error("unknown unit type '{0}'")]
    UnknownUnitType(String),

    /// No building type has this key.
    #[error("unknown building type '{0}'")]
    UnknownBuildingType(String),

    /// The player's stockpile does not cover the cost.
    #[error("insufficient resources")]
    Unaffordable,

    /// The player is at the population cap.
    #[error("population cap reached")]
    PopulationFull,

    /// The training queue is at its maximum length.
    #[error("training queue is full")]
    QueueFull,

    /// The building is still under construction.
    #[error("building {0} is not complete")]
    BuildingIncomplete(BuildingId),

    /// The building does not offer this unit.
    #[error("building cannot train '{0}'")]
    CannotTrain(String),

    /// The footprint does not fit on the board.
    #[error("position ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// Requested x.
        x: i32,
        /// Requested y.
        y: i32,
    },

    /// The terrain does not allow this structure.
    #[error("{structure} cannot be built on {}", .terrain.display_name())]
    IllegalPlacement {
        /// Building type key.
        structure: String,
        /// Terrain found at the requested cell.
        terrain: TerrainKind,
    },
}

impl CommandError {
    /// Whether the issuing client should be told about this rejection.
    ///
    /// Only placement violations are reported; everything else is dropped
    /// silently.
    #[must_use]
    pub const fn is_reported(&self) -> bool {
        matches!(self, Self::IllegalPlacement { .. })
    }
}

/// Validate and apply `command` for `player`.
pub fn apply_command(
    world: &mut World,
    ruleset: &Ruleset,
    player: PlayerId,
    command: &Command,
    dirty: &mut DirtySet,
) -> Result<(), CommandError> {
    if !world.players.contains_key(&player) {
        return Err(CommandError::UnknownPlayer(player));
    }
    match command {
        Command::MoveUnits { unit_ids, target } => {
            move_units(world, player, unit_ids, *target, dirty);
            Ok(())
        }
        Command::AttackTarget { unit_ids, target } => attack_target(world, player, unit_ids, *target, dirty),
        Command::BuildStructure {
            builder,
            structure,
            x,
            y,
        } => build_structure(world, ruleset, player, *builder, structure, *x, *y, dirty),
        Command::TrainUnit { building, unit } => train_unit(world, ruleset, player, *building, unit, dirty),
    }
}

fn move_units(world: &mut World, player: PlayerId, unit_ids: &[UnitId], target: Vec2Fixed, dirty: &mut DirtySet) {
    let target = world.clamp_to_board(target);
    for id in unit_ids {
        if let Some(unit) = world.units.get_mut(id).filter(|u| u.owner == player) {
            unit.move_target = Some(target);
            unit.target = None;
            dirty.units.insert(*id);
        }
    }
}

fn attack_target(
    world: &mut World,
    player: PlayerId,
    unit_ids: &[UnitId],
    target: u64,
    dirty: &mut DirtySet,
) -> Result<(), CommandError> {
    let target = world.resolve(target).ok_or(CommandError::UnknownEntity(target))?;
    for id in unit_ids {
        if EntityRef::Unit(*id) == target {
            continue;
        }
        if let Some(unit) = world.units.get_mut(id).filter(|u| u.owner == player) {
            unit.target = Some(target);
            dirty.units.insert(*id);
        }
    }
    Ok(())
}

fn build_structure(
    world: &mut World,
    ruleset: &Ruleset,
    player: PlayerId,
    builder: UnitId,
    structure: &str,
    x: i32,
    y: i32,
    dirty: &mut DirtySet,
) -> Result<(), CommandError> {
    let unit = world.units.get(&builder).ok_or(CommandError::UnknownEntity(builder.0))?;
    if unit.owner != player {
        return Err(CommandError::NotOwned(builder.0));
    }
    if !unit.can_build {
        return Err(CommandError::NotABuilder(builder));
    }
    let kind = ruleset
        .building_id(structure)
        .ok_or_else(|| CommandError::UnknownBuildingType(structure.to_string()))?;
    let data = ruleset
        .building(kind)
        .ok_or_else(|| CommandError::UnknownBuildingType(structure.to_string()))?;

    let stockpile = &world.players[&player].resources;
    if !stockpile.can_afford(&data.cost) {
        return Err(CommandError::Unaffordable);
    }
    if !world.board.footprint_fits(x, y, data.footprint) {
        return Err(CommandError::OutOfBounds { x, y });
    }
    let terrain = world.board.get(x, y).ok_or(CommandError::OutOfBounds { x, y })?;
    if !data.allows_terrain(terrain) {
        return Err(CommandError::IllegalPlacement {
            structure: structure.to_string(),
            terrain,
        });
    }

    let paid = world
        .players
        .get_mut(&player)
        .is_some_and(|p| p.resources.try_spend(&data.cost));
    if !paid {
        return Err(CommandError::Unaffordable);
    }
    let id = world
        .place_building(ruleset, player, kind, x, y)
        .ok_or(CommandError::UnknownPlayer(player))?;
    if let Some(unit) = world.units.get_mut(&builder) {
        unit.move_target = Some(Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)));
        dirty.units.insert(builder);
    }
    dirty.buildings.insert(id);
    dirty.players.insert(player);
    tracing::debug!(player = player.0, building = id.0, structure, x, y, "construction started");
    Ok(())
}

fn train_unit(
    world: &mut World,
    ruleset: &Ruleset,
    player: PlayerId,
    building_id: BuildingId,
    unit: &str,
    dirty: &mut DirtySet,
) -> Result<(), CommandError> {
    let building = world
        .buildings
        .get(&building_id)
        .ok_or(CommandError::UnknownEntity(building_id.0))?;
    if building.owner != player {
        return Err(CommandError::NotOwned(building_id.0));
    }
    if !building.is_complete() {
        return Err(CommandError::BuildingIncomplete(building_id));
    }
    let kind = ruleset
        .unit_id(unit)
        .ok_or_else(|| CommandError::UnknownUnitType(unit.to_string()))?;
    let unit_data = ruleset
        .unit(kind)
        .ok_or_else(|| CommandError::UnknownUnitType(unit.to_string()))?;
    let offers = ruleset
        .building(building.kind)
        .is_some_and(|data| data.can_train(unit));
    if !offers {
        return Err(CommandError::CannotTrain(unit.to_string()));
    }

    let owner = &world.players[&player];
    if !owner.resources.can_afford(&unit_data.cost) {
        return Err(CommandError::Unaffordable);
    }
    if !owner.population.has_room() {
        return Err(CommandError::PopulationFull);
    }
    if building.training_queue.len() >= MAX_QUEUE_LEN {
        return Err(CommandError::QueueFull);
    }

    let paid = world
        .players
        .get_mut(&player)
        .is_some_and(|p| p.resources.try_spend(&unit_data.cost));
    if !paid {
        return Err(CommandError::Unaffordable);
    }
    if let Some(b) = world.buildings.get_mut(&building_id) {
        b.training_queue.push(TrainingItem {
            unit: kind,
            progress: Fixed::ZERO,
        });
    }
    dirty.buildings.insert(building_id);
    dirty.players.insert(player);
    Ok(())
}
