//! The world state store.
//!
//! Owns the board, the player records and the two entity tables. Tables are
//! `BTreeMap`s so every system iterates entities in id order, which keeps a
//! tick reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::components::{Building, BuildingId, EntityRef, PlayerId, Unit, UnitId};
use crate::data::{BuildingTypeId, Ruleset, UnitTypeId};
use crate::math::{Fixed, Vec2Fixed};
use crate::player::Player;

/// Board, players, units and buildings of one game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct World {
    /// Terrain.
    pub board: Board,
    /// Participants keyed by id.
    pub players: BTreeMap<PlayerId, Player>,
    /// All living units.
    pub units: BTreeMap<UnitId, Unit>,
    /// All standing buildings.
    pub buildings: BTreeMap<BuildingId, Building>,
    join_order: Vec<PlayerId>,
    next_entity_id: u64,
}

impl World {
    /// Create an empty world on `board`.
    #[must_use]
    pub fn new(board: Board) -> Self {
        Self {
            board,
            players: BTreeMap::new(),
            units: BTreeMap::new(),
            buildings: BTreeMap::new(),
            join_order: Vec::new(),
            next_entity_id: 1,
        }
    }

    /// Register a player.
    pub fn add_player(&mut self, player: Player) {
        if !self.join_order.contains(&player.id) {
            self.join_order.push(player.id);
        }
        self.players.insert(player.id, player);
    }

    /// Players in the order they were added.
    pub fn players_in_join_order(&self) -> impl Iterator<Item = &Player> {
        self.join_order.iter().filter_map(|id| self.players.get(id))
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Clamp a position onto the board.
    #[must_use]
    pub fn clamp_to_board(&self, pos: Vec2Fixed) -> Vec2Fixed {
        let max = Fixed::from_num(self.board.size()) - Fixed::DELTA;
        pos.clamp(Fixed::ZERO, max.max(Fixed::ZERO))
    }

    /// Create a unit at `position` for `owner`.
    ///
    /// Returns `None` if the owner or unit type is unknown.
    pub fn spawn_unit(
        &mut self,
        ruleset: &Ruleset,
        owner: PlayerId,
        kind: UnitTypeId,
        position: Vec2Fixed,
    ) -> Option<UnitId> {
        let data = ruleset.unit(kind)?;
        if !self.players.contains_key(&owner) {
            return None;
        }
        let id = UnitId(self.allocate_id());
        let unit = Unit {
            id,
            owner,
            kind,
            position: self.clamp_to_board(position),
            hp: data.hp,
            max_hp: data.hp,
            move_target: None,
            target: None,
            attack_cooldown: Fixed::ZERO,
            can_build: data.can_build,
        };
        self.units.insert(id, unit);
        if let Some(player) = self.players.get_mut(&owner) {
            player.units.insert(id);
            player.recount_population();
        }
        Some(id)
    }

    /// Place a new, unfinished building with top-left cell `(x, y)`.
    ///
    /// The building starts at 1 hp and progress 0. Returns `None` if the
    /// owner or building type is unknown.
    pub fn place_building(
        &mut self,
        ruleset: &Ruleset,
        owner: PlayerId,
        kind: BuildingTypeId,
        x: i32,
        y: i32,
    ) -> Option<BuildingId> {
        let data = ruleset.building(kind)?;
        if !self.players.contains_key(&owner) {
            return None;
        }
        let id = BuildingId(self.allocate_id());
        let footprint = data.footprint_len();
        let rally_point = Vec2Fixed::new(
            Fixed::from_num(x) + data.center_offset(),
            Fixed::from_num(y) + footprint + Fixed::ONE,
        );
        let building = Building {
            id,
            owner,
            kind,
            x,
            y,
            hp: Fixed::ONE,
            max_hp: data.hp,
            build_progress: Fixed::ZERO,
            build_time: data.build_time,
            training_queue: Vec::new(),
            rally_point,
            attack_cooldown: Fixed::ZERO,
            target: None,
        };
        self.buildings.insert(id, building);
        Some(id)
    }

    /// Mark a building complete: full progress and full hp.
    pub fn complete_building(&mut self, ruleset: &Ruleset, id: BuildingId) {
        let Some(building) = self.buildings.get_mut(&id) else {
            return;
        };
        building.build_progress = Fixed::ONE;
        building.hp = building.max_hp;
        let owner = building.owner;
        self.recompute_population_cap(ruleset, owner);
    }

    /// Remove a unit from the global table and its owner's set.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        if let Some(player) = self.players.get_mut(&unit.owner) {
            player.units.remove(&id);
            player.recount_population();
        }
        Some(unit)
    }

    /// Remove a building and refresh its owner's population cap.
    pub fn remove_building(&mut self, ruleset: &Ruleset, id: BuildingId) -> Option<Building> {
        let building = self.buildings.remove(&id)?;
        self.recompute_population_cap(ruleset, building.owner);
        Some(building)
    }

    /// Sum the population capacity of `owner`'s completed buildings.
    pub fn recompute_population_cap(&mut self, ruleset: &Ruleset, owner: PlayerId) {
        let cap: u32 = self
            .buildings
            .values()
            .filter(|b| b.owner == owner && b.is_complete())
            .filter_map(|b| ruleset.building(b.kind))
            .map(|data| data.provides_pop)
            .sum();
        if let Some(player) = self.players.get_mut(&owner) {
            player.population.cap = cap;
        }
    }

    /// Resolve a raw client id to an entity reference.
    #[must_use]
    pub fn resolve(&self, raw: u64) -> Option<EntityRef> {
        if self.units.contains_key(&UnitId(raw)) {
            Some(EntityRef::Unit(UnitId(raw)))
        } else if self.buildings.contains_key(&BuildingId(raw)) {
            Some(EntityRef::Building(BuildingId(raw)))
        } else {
            None
        }
    }

    /// Whether the referenced entity still exists.
    #[must_use]
    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Unit(id) => self.units.contains_key(&id),
            EntityRef::Building(id) => self.buildings.contains_key(&id),
        }
    }

    /// Owner of the referenced entity.
    #[must_use]
    pub fn owner_of(&self, entity: EntityRef) -> Option<PlayerId> {
        match entity {
            EntityRef::Unit(id) => self.units.get(&id).map(|u| u.owner),
            EntityRef::Building(id) => self.buildings.get(&id).map(|b| b.owner),
        }
    }

    /// Center of the referenced entity: a unit's position or a building's
    /// footprint center.
    #[must_use]
    pub fn center_of(&self, ruleset: &Ruleset, entity: EntityRef) -> Option<Vec2Fixed> {
        match entity {
            EntityRef::Unit(id) => self.units.get(&id).map(|u| u.position),
            EntityRef::Building(id) => {
                let building = self.buildings.get(&id)?;
                let data = ruleset.building(building.kind)?;
                Some(building.center(data.footprint))
            }
        }
    }

    /// Units owned by `owner`, in id order.
    pub fn units_of(&self, owner: PlayerId) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.owner == owner)
    }

    /// Buildings owned by `owner`, in id order.
    pub fn buildings_of(&self, owner: PlayerId) -> impl Iterator<Item = &Building> {
        self.buildings.values().filter(move |b| b.owner == owner)
    }
}
