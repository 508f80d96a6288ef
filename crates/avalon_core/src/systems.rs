//! Simulation systems.
//!
//! Each system advances one concern of the world by `delta` seconds and
//! records what it touched in the tick's [`DirtySet`]. Systems run in the
//! fixed order chosen by [`crate::simulation::Simulation::tick`]; combat
//! lives in [`crate::combat`].
//!
//! All systems use fixed-point math and iterate entities in id order.

use std::collections::BTreeMap;

use crate::components::{BuildingId, PlayerId};
use crate::data::{Ruleset, UnitTypeId};
use crate::economy::{apply_income, Resources};
use crate::events::{DirtySet, GameEvent, SfxKind};
use crate::math::{Fixed, Vec2Fixed};
use crate::world::World;

/// Distance at which a walking unit counts as arrived.
pub const ARRIVAL_EPSILON: Fixed = Fixed::from_bits(1 << 31);

// ============================================================================
// Economy
// ============================================================================

/// Applies one tick of production and upkeep to every player.
///
/// Production is the sum of every owned, completed building's production
/// table; upkeep is the sum of every owned unit's food upkeep. Every player
/// is marked dirty.
pub fn resource_production_system(world: &mut World, ruleset: &Ruleset, delta: Fixed, dirty: &mut DirtySet) {
    let mut income: BTreeMap<PlayerId, (Resources, Fixed)> = BTreeMap::new();

    for building in world.buildings.values().filter(|b| b.is_complete()) {
        if let Some(data) = ruleset.building(building.kind) {
            let entry = income.entry(building.owner).or_default();
            entry.0 = entry.0.plus(&data.production);
        }
    }
    for unit in world.units.values() {
        if let Some(data) = ruleset.unit(unit.kind) {
            income.entry(unit.owner).or_default().1 += data.upkeep;
        }
    }

    for (id, player) in &mut world.players {
        let (production, upkeep) = income.get(id).copied().unwrap_or_default();
        apply_income(&mut player.resources, &production, upkeep, delta);
        dirty.players.insert(*id);
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Advances construction of every unfinished building.
///
/// Progress grows by `delta / build_time` and snaps to exactly 1.0 on
/// completion, at which point the building gets full hit points and its
/// owner's population cap is recomputed. Buildings with no build time finish
/// on their first tick.
pub fn construction_system(world: &mut World, ruleset: &Ruleset, delta: Fixed, dirty: &mut DirtySet) {
    let mut completed: Vec<(BuildingId, PlayerId, Vec2Fixed)> = Vec::new();

    for building in world.buildings.values_mut().filter(|b| !b.is_complete()) {
        let step = if building.build_time > Fixed::ZERO {
            delta / building.build_time
        } else {
            Fixed::ONE
        };
        building.build_progress = (building.build_progress + step).min(Fixed::ONE);
        dirty.buildings.insert(building.id);

        if building.is_complete() {
            building.hp = building.max_hp;
            let footprint = ruleset.building(building.kind).map_or(1, |d| d.footprint);
            completed.push((building.id, building.owner, building.center(footprint)));
        }
    }

    for (id, owner, center) in completed {
        world.recompute_population_cap(ruleset, owner);
        dirty.players.insert(owner);
        dirty.push_event(GameEvent::Sfx {
            sound: SfxKind::ConstructionComplete,
            pos: center,
        });
        tracing::trace!(building = id.0, owner = owner.0, "construction complete");
    }
}

// ============================================================================
// Training
// ============================================================================

/// Advances the head of every completed building's training queue.
///
/// A finished item is always popped. The unit only spawns if its owner is
/// below the population cap; otherwise the item and its paid cost are
/// discarded.
pub fn training_system(world: &mut World, ruleset: &Ruleset, delta: Fixed, dirty: &mut DirtySet) {
    let mut finished: Vec<(BuildingId, PlayerId, UnitTypeId, Vec2Fixed)> = Vec::new();

    for building in world.buildings.values_mut().filter(|b| b.is_complete()) {
        let Some(head) = building.training_queue.first_mut() else {
            continue;
        };
        let train_time = ruleset.unit(head.unit).map_or(Fixed::ONE, |d| d.train_time);
        let step = if train_time > Fixed::ZERO {
            delta / train_time
        } else {
            Fixed::ONE
        };
        head.progress = (head.progress + step).min(Fixed::ONE);
        dirty.buildings.insert(building.id);

        if head.progress >= Fixed::ONE {
            let item = building.training_queue.remove(0);
            finished.push((building.id, building.owner, item.unit, building.rally_point));
        }
    }

    for (building, owner, kind, rally_point) in finished {
        let has_room = world
            .players
            .get(&owner)
            .is_some_and(|p| p.population.has_room());
        if !has_room {
            tracing::debug!(
                building = building.0,
                owner = owner.0,
                "population full at training completion, unit discarded"
            );
            continue;
        }
        if let Some(id) = world.spawn_unit(ruleset, owner, kind, rally_point) {
            dirty.units.insert(id);
            dirty.players.insert(owner);
            dirty.push_event(GameEvent::Sfx {
                sound: SfxKind::UnitTrained,
                pos: rally_point,
            });
        }
    }
}

// ============================================================================
// Movement
// ============================================================================

/// Moves every unit with a move target in a straight line toward it.
///
/// Speed is scaled by the terrain of the cell the unit stands on
/// (`1 / movement_cost`). A unit within [`ARRIVAL_EPSILON`] of its target
/// stops and clears the target; a step never carries a unit past it.
pub fn movement_system(world: &mut World, ruleset: &Ruleset, delta: Fixed, dirty: &mut DirtySet) {
    let board = &world.board;

    for unit in world.units.values_mut() {
        let Some(target) = unit.move_target else {
            continue;
        };
        let offset = target - unit.position;
        let distance = offset.dot(offset);
        if distance < ARRIVAL_EPSILON * ARRIVAL_EPSILON {
            unit.move_target = None;
            dirty.units.insert(unit.id);
            continue;
        }
        let distance = crate::math::fixed_sqrt(distance);

        let speed = ruleset.unit(unit.kind).map_or(Fixed::ZERO, |d| d.speed);
        let modifier = board
            .terrain_at(unit.position)
            .map_or(Fixed::ONE, |t| t.speed_modifier());
        let step = speed * modifier * delta;

        unit.position = if step >= distance {
            target
        } else {
            unit.position + offset.scale(step / distance)
        };
        dirty.units.insert(unit.id);
    }
}
