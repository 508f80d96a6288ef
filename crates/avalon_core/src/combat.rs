//! Targeting and damage resolution.
//!
//! One pass per tick:
//! - Units tick their cooldown, keep a live target or acquire the nearest
//!   enemy inside their vision, then either hit (if in range) or chase.
//! - Completed shooting buildings do the same against units only, without
//!   moving.
//! - Kills are collected during the pass and removed afterwards, so the
//!   order entities are visited in never decides who gets a last hit.
//!
//! Unit-versus-unit damage is scaled by the ruleset's matchup table; every
//! hit involving a building uses the flat attack value.

use std::collections::BTreeSet;

use crate::components::{BuildingId, EntityRef, PlayerId, UnitId};
use crate::data::{Ruleset, UnitTypeId};
use crate::events::{DirtySet, GameEvent};
use crate::math::{Fixed, Vec2Fixed};
use crate::world::World;

/// Entities killed during the running pass.
#[derive(Debug, Default)]
struct Casualties {
    units: BTreeSet<UnitId>,
    buildings: BTreeSet<BuildingId>,
}

impl Casualties {
    fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Unit(id) => self.units.contains(&id),
            EntityRef::Building(id) => self.buildings.contains(&id),
        }
    }

    fn insert(&mut self, entity: EntityRef) {
        match entity {
            EntityRef::Unit(id) => self.units.insert(id),
            EntityRef::Building(id) => self.buildings.insert(id),
        };
    }
}

/// Damage a hit deals.
///
/// Matchup multipliers apply only when both sides are units.
#[must_use]
pub fn calculate_damage(
    ruleset: &Ruleset,
    base: Fixed,
    attacker: Option<UnitTypeId>,
    defender: Option<UnitTypeId>,
) -> Fixed {
    match (attacker, defender) {
        (Some(a), Some(d)) => base * ruleset.matchup(a, d),
        _ => base,
    }
}

/// Nearest live enemy strictly inside `radius` of `origin`.
///
/// Units are scanned before buildings and ties keep the earlier id, so the
/// result is deterministic. Only completed buildings are candidates, and
/// only when `include_buildings` is set.
fn find_closest_enemy(
    world: &World,
    ruleset: &Ruleset,
    owner: PlayerId,
    origin: Vec2Fixed,
    radius: Fixed,
    include_buildings: bool,
    casualties: &Casualties,
) -> Option<EntityRef> {
    let mut best: Option<EntityRef> = None;
    let mut best_dist = radius * radius;

    for unit in world.units.values() {
        if unit.owner == owner || casualties.units.contains(&unit.id) {
            continue;
        }
        let dist = origin.distance_squared(unit.position);
        if dist < best_dist {
            best_dist = dist;
            best = Some(EntityRef::Unit(unit.id));
        }
    }

    if include_buildings {
        for building in world.buildings.values() {
            if building.owner == owner || !building.is_complete() || casualties.buildings.contains(&building.id) {
                continue;
            }
            let Some(data) = ruleset.building(building.kind) else {
                continue;
            };
            let dist = origin.distance_squared(building.center(data.footprint));
            if dist < best_dist {
                best_dist = dist;
                best = Some(EntityRef::Building(building.id));
            }
        }
    }

    best
}

/// Subtract `damage` from the target and record a kill at or below zero.
fn apply_hit(world: &mut World, target: EntityRef, damage: Fixed, casualties: &mut Casualties, dirty: &mut DirtySet) {
    let hp = match target {
        EntityRef::Unit(id) => world.units.get_mut(&id).map(|u| {
            u.hp -= damage;
            dirty.units.insert(id);
            u.hp
        }),
        EntityRef::Building(id) => world.buildings.get_mut(&id).map(|b| {
            b.hp -= damage;
            dirty.buildings.insert(id);
            b.hp
        }),
    };
    if hp.is_some_and(|hp| hp <= Fixed::ZERO) {
        casualties.insert(target);
    }
}

fn unit_turn(world: &mut World, ruleset: &Ruleset, id: UnitId, delta: Fixed, casualties: &mut Casualties, dirty: &mut DirtySet) {
    let Some(unit) = world.units.get_mut(&id) else {
        return;
    };
    let Some(data) = ruleset.unit(unit.kind) else {
        return;
    };
    if unit.attack_cooldown > Fixed::ZERO {
        unit.attack_cooldown -= delta;
    }
    let (owner, kind, position, current) = (unit.owner, unit.kind, unit.position, unit.target);

    let keep = current.filter(|&t| world.contains(t) && !casualties.contains(t));
    let target = match keep {
        Some(t) => Some(t),
        None if data.is_combatant() => {
            find_closest_enemy(world, ruleset, owner, position, data.vision, true, casualties)
        }
        None => None,
    };

    let Some(target) = target else {
        if current.is_some() {
            if let Some(unit) = world.units.get_mut(&id) {
                unit.target = None;
            }
        }
        return;
    };
    let Some(target_center) = world.center_of(ruleset, target) else {
        return;
    };
    let in_range = position.distance_squared(target_center) <= data.range * data.range;

    let mut strike = false;
    if let Some(unit) = world.units.get_mut(&id) {
        unit.target = Some(target);
        if in_range {
            unit.move_target = None;
            if unit.attack_cooldown <= Fixed::ZERO {
                unit.attack_cooldown = data.attack_interval();
                strike = true;
            }
        } else {
            unit.move_target = Some(target_center);
        }
        dirty.units.insert(id);
    }

    if strike {
        let defender = match target {
            EntityRef::Unit(t) => world.units.get(&t).map(|u| u.kind),
            EntityRef::Building(_) => None,
        };
        let damage = calculate_damage(ruleset, data.attack, Some(kind), defender);
        apply_hit(world, target, damage, casualties, dirty);
        dirty.push_event(GameEvent::AttackEffect {
            from: position,
            to: target_center,
            attacker: data.key.clone(),
        });
    }
}

fn building_turn(
    world: &mut World,
    ruleset: &Ruleset,
    id: BuildingId,
    delta: Fixed,
    casualties: &mut Casualties,
    dirty: &mut DirtySet,
) {
    let Some(building) = world.buildings.get_mut(&id) else {
        return;
    };
    if !building.is_complete() {
        return;
    }
    let Some(data) = ruleset.building(building.kind) else {
        return;
    };
    let Some(attack) = &data.attack else {
        return;
    };
    if building.attack_cooldown > Fixed::ZERO {
        building.attack_cooldown -= delta;
    }
    let owner = building.owner;
    let center = building.center(data.footprint);
    let current = building.target;

    let keep = current.filter(|&t| world.units.contains_key(&t) && !casualties.units.contains(&t));
    let target = keep.or_else(|| {
        match find_closest_enemy(world, ruleset, owner, center, data.vision, false, casualties) {
            Some(EntityRef::Unit(t)) => Some(t),
            _ => None,
        }
    });

    let Some(building) = world.buildings.get_mut(&id) else {
        return;
    };
    building.target = target;
    let Some(target) = target else {
        return;
    };
    let Some(target_pos) = world.units.get(&target).map(|u| u.position) else {
        return;
    };
    if center.distance_squared(target_pos) > attack.range * attack.range {
        return;
    }

    let Some(building) = world.buildings.get_mut(&id) else {
        return;
    };
    if building.attack_cooldown > Fixed::ZERO {
        return;
    }
    building.attack_cooldown = attack.attack_interval();
    dirty.buildings.insert(id);

    apply_hit(world, EntityRef::Unit(target), attack.damage, casualties, dirty);
    dirty.push_event(GameEvent::AttackEffect {
        from: center,
        to: target_pos,
        attacker: data.key.clone(),
    });
}

/// Resolves one tick of combat.
///
/// After the pass, every attacker still pointing at an entity that died is
/// cleared, dead units and buildings are removed from the world, and
/// [`GameEvent::UnitsDied`] / [`GameEvent::BuildingsDestroyed`] batch the
/// removed ids.
pub fn combat_system(world: &mut World, ruleset: &Ruleset, delta: Fixed, dirty: &mut DirtySet) {
    let mut casualties = Casualties::default();

    let unit_ids: Vec<UnitId> = world.units.keys().copied().collect();
    for id in unit_ids {
        if casualties.units.contains(&id) {
            continue;
        }
        unit_turn(world, ruleset, id, delta, &mut casualties, dirty);
    }

    let building_ids: Vec<BuildingId> = world.buildings.keys().copied().collect();
    for id in building_ids {
        if casualties.buildings.contains(&id) {
            continue;
        }
        building_turn(world, ruleset, id, delta, &mut casualties, dirty);
    }

    if casualties.units.is_empty() && casualties.buildings.is_empty() {
        return;
    }

    for unit in world.units.values_mut() {
        if unit.target.is_some_and(|t| casualties.contains(t)) {
            unit.target = None;
            unit.move_target = None;
            dirty.units.insert(unit.id);
        }
    }
    for building in world.buildings.values_mut() {
        if building.target.is_some_and(|t| casualties.units.contains(&t)) {
            building.target = None;
        }
    }

    if !casualties.units.is_empty() {
        let ids: Vec<UnitId> = casualties.units.iter().copied().collect();
        for &id in &ids {
            if let Some(unit) = world.remove_unit(id) {
                dirty.players.insert(unit.owner);
            }
        }
        tracing::debug!(count = ids.len(), "units died");
        dirty.push_event(GameEvent::UnitsDied { ids });
    }

    if !casualties.buildings.is_empty() {
        let ids: Vec<BuildingId> = casualties.buildings.iter().copied().collect();
        for &id in &ids {
            if let Some(building) = world.remove_building(ruleset, id) {
                dirty.players.insert(building.owner);
            }
        }
        tracing::debug!(count = ids.len(), "buildings destroyed");
        dirty.push_event(GameEvent::BuildingsDestroyed { ids });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::data::TerrainKind;
    use crate::economy::Resources;
    use crate::player::Player;

    fn fx(v: f64) -> Fixed {
        Fixed::from_num(v)
    }

    fn at(x: f64, y: f64) -> Vec2Fixed {
        Vec2Fixed::new(fx(x), fx(y))
    }

    fn two_players() -> (World, Ruleset) {
        let ruleset = Ruleset::standard();
        let mut world = World::new(Board::filled(40, TerrainKind::Plains));
        for id in [1, 2] {
            world.add_player(Player::new(PlayerId(id), format!("P{id}"), "#fff".into(), Resources::ZERO, Vec2Fixed::ZERO));
        }
        (world, ruleset)
    }

    #[test]
    fn test_calculate_damage_matchups() {
        let ruleset = Ruleset::standard();
        let archer = ruleset.unit_id("ARCHER");
        let cavalry = ruleset.unit_id("CAVALRY");
        assert_eq!(calculate_damage(&ruleset, fx(12.0), archer, cavalry), fx(9.0));
        assert_eq!(calculate_damage(&ruleset, fx(12.0), archer, None), fx(12.0));
        assert_eq!(calculate_damage(&ruleset, fx(20.0), None, cavalry), fx(20.0));
    }

    #[test]
    fn test_acquires_and_hits_in_range() {
        let (mut world, ruleset) = two_players();
        let archer = world.spawn_unit(&ruleset, PlayerId(1), ruleset.unit_id("ARCHER").unwrap(), at(10.0, 10.0)).unwrap();
        let cavalry = world.spawn_unit(&ruleset, PlayerId(2), ruleset.unit_id("CAVALRY").unwrap(), at(14.0, 10.0)).unwrap();

        let mut dirty = DirtySet::default();
        combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);

        assert_eq!(world.units[&archer].target, Some(EntityRef::Unit(cavalry)));
        // 12 * 0.75
        assert_eq!(world.units[&cavalry].hp, fx(130.0 - 9.0));
        assert!(dirty.events.iter().any(|e| matches!(e, GameEvent::AttackEffect { .. })));
    }

    #[test]
    fn test_out_of_range_target_is_chased() {
        let (mut world, ruleset) = two_players();
        let infantry = world.spawn_unit(&ruleset, PlayerId(1), ruleset.unit_id("INFANTRY").unwrap(), at(10.0, 10.0)).unwrap();
        world.spawn_unit(&ruleset, PlayerId(2), ruleset.unit_id("BUILDER").unwrap(), at(15.0, 10.0));

        let mut dirty = DirtySet::default();
        combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);

        assert_eq!(world.units[&infantry].move_target, Some(at(15.0, 10.0)));
    }

    #[test]
    fn test_nothing_outside_vision_is_acquired() {
        let (mut world, ruleset) = two_players();
        let infantry = world.spawn_unit(&ruleset, PlayerId(1), ruleset.unit_id("INFANTRY").unwrap(), at(5.0, 5.0)).unwrap();
        world.spawn_unit(&ruleset, PlayerId(2), ruleset.unit_id("BUILDER").unwrap(), at(30.0, 30.0));

        let mut dirty = DirtySet::default();
        combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);

        assert!(world.units[&infantry].target.is_none());
        assert!(world.units[&infantry].move_target.is_none());
    }

    #[test]
    fn test_kill_removes_unit_and_clears_targets() {
        let (mut world, ruleset) = two_players();
        let archer_kind = ruleset.unit_id("ARCHER").unwrap();
        let a = world.spawn_unit(&ruleset, PlayerId(1), archer_kind, at(10.0, 10.0)).unwrap();
        let b = world.spawn_unit(&ruleset, PlayerId(1), archer_kind, at(10.0, 12.0)).unwrap();
        let victim = world.spawn_unit(&ruleset, PlayerId(2), ruleset.unit_id("BUILDER").unwrap(), at(13.0, 10.0)).unwrap();
        world.units.get_mut(&victim).unwrap().hp = fx(5.0);

        let mut dirty = DirtySet::default();
        combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);

        assert!(!world.units.contains_key(&victim));
        assert!(world.units[&a].target.is_none());
        assert!(world.units[&b].target.is_none());
        assert_eq!(world.players[&PlayerId(2)].population.current, 0);
        assert!(dirty
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::UnitsDied { ids } if ids == &vec![victim])));
    }

    #[test]
    fn test_cooldown_gates_hits() {
        let (mut world, ruleset) = two_players();
        world.spawn_unit(&ruleset, PlayerId(1), ruleset.unit_id("INFANTRY").unwrap(), at(10.0, 10.0));
        let target = world.spawn_unit(&ruleset, PlayerId(2), ruleset.unit_id("CAVALRY").unwrap(), at(10.5, 10.0)).unwrap();
        // freeze the defender so only one side swings
        world.units.get_mut(&target).unwrap().attack_cooldown = fx(100.0);

        let mut dirty = DirtySet::default();
        for _ in 0..10 {
            combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);
        }
        // 0.5 s elapsed, one hit at 10 * 1.5
        assert_eq!(world.units[&target].hp, fx(130.0 - 15.0));
    }

    #[test]
    fn test_tower_shoots_units_only() {
        let (mut world, ruleset) = two_players();
        let tower = world.place_building(&ruleset, PlayerId(1), ruleset.building_id("TOWER").unwrap(), 10, 10).unwrap();
        world.complete_building(&ruleset, tower);
        let raider = world.spawn_unit(&ruleset, PlayerId(2), ruleset.unit_id("CAVALRY").unwrap(), at(16.0, 11.0)).unwrap();
        world.units.get_mut(&raider).unwrap().attack_cooldown = fx(100.0);

        let mut dirty = DirtySet::default();
        combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);

        assert_eq!(world.buildings[&tower].target, Some(raider));
        assert_eq!(world.units[&raider].hp, fx(110.0));
    }

    #[test]
    fn test_unfinished_tower_is_inert() {
        let (mut world, ruleset) = two_players();
        let tower = world.place_building(&ruleset, PlayerId(1), ruleset.building_id("TOWER").unwrap(), 10, 10).unwrap();
        let raider = world.spawn_unit(&ruleset, PlayerId(2), ruleset.unit_id("BUILDER").unwrap(), at(25.0, 25.0)).unwrap();

        let mut dirty = DirtySet::default();
        combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);

        assert!(world.buildings[&tower].target.is_none());
        assert_eq!(world.units[&raider].hp, fx(50.0));
    }

    #[test]
    fn test_destroyed_building_removed_and_cap_recomputed() {
        let (mut world, ruleset) = two_players();
        let house = world.place_building(&ruleset, PlayerId(2), ruleset.building_id("HOUSE").unwrap(), 10, 10).unwrap();
        world.complete_building(&ruleset, house);
        world.buildings.get_mut(&house).unwrap().hp = fx(1.0);
        assert_eq!(world.players[&PlayerId(2)].population.cap, 5);
        let attacker = world.spawn_unit(&ruleset, PlayerId(1), ruleset.unit_id("INFANTRY").unwrap(), at(11.0, 11.0)).unwrap();

        let mut dirty = DirtySet::default();
        combat_system(&mut world, &ruleset, fx(0.05), &mut dirty);

        assert!(!world.buildings.contains_key(&house));
        assert_eq!(world.players[&PlayerId(2)].population.cap, 0);
        assert!(world.units[&attacker].target.is_none());
        assert!(dirty
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::BuildingsDestroyed { ids } if ids == &vec![house])));
    }
}
