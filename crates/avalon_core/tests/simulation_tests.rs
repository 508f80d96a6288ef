//! End-to-end scenarios driven through the public simulation API.

use avalon_core::commands::{Command, CommandError};
use avalon_core::components::{BuildingId, EntityRef, PlayerId};
use avalon_core::data::{Ruleset, TerrainKind};
use avalon_core::economy::Resources;
use avalon_core::events::{DirtySet, GameEvent};
use avalon_core::math::Fixed;
use avalon_core::replication::{encode_updates, EventDto};
use avalon_core::visibility::Visibility;
use avalon_test_utils::fixtures::{fixed, fixed_f, point, ruleset_with_matchups, Scenario, ScenarioBuilder};

const ME: PlayerId = PlayerId(1);

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_build_round_trip() {
    let mut scenario = ScenarioBuilder::new(40).player(1).build();
    let builder = scenario.spawn(1, "BUILDER", 10.0, 10.0);
    let wood_before = scenario.player(1).resources.wood;

    scenario
        .sim
        .apply_command(ME, &Command::BuildStructure {
            builder,
            structure: "FARM".into(),
            x: 12,
            y: 12,
        })
        .unwrap();
    assert_eq!(scenario.player(1).resources.wood, wood_before - fixed(50));

    let farms = |s: &avalon_test_utils::fixtures::Scenario| {
        s.sim
            .world()
            .buildings_of(ME)
            .filter(|b| s.sim.ruleset().building(b.kind).is_some_and(|d| d.key == "FARM"))
            .map(|b| (b.build_progress, b.hp, b.max_hp))
            .collect::<Vec<_>>()
    };
    assert_eq!(farms(&scenario), vec![(Fixed::ZERO, fixed(1), fixed(300))]);

    scenario.run(10.5);

    assert_eq!(farms(&scenario), vec![(Fixed::ONE, fixed(300), fixed(300))]);
    assert_eq!(scenario.player(1).resources.wood, wood_before - fixed(50));
}

#[test]
fn test_farm_accepted_mine_rejected_on_plains() {
    let mut scenario = ScenarioBuilder::new(40)
        .resources(Resources::whole(200, 150, 500, 200, 0))
        .player(1)
        .build();
    let builder = scenario.spawn(1, "BUILDER", 10.0, 10.0);
    let before = scenario.player(1).resources;

    scenario
        .sim
        .apply_command(ME, &Command::BuildStructure {
            builder,
            structure: "FARM".into(),
            x: 5,
            y: 5,
        })
        .unwrap();
    let after_farm = scenario.player(1).resources;
    assert_eq!(after_farm.wood, before.wood - fixed(50));
    assert_eq!(scenario.sim.world().buildings.len(), 1);

    let err = scenario
        .sim
        .apply_command(ME, &Command::BuildStructure {
            builder,
            structure: "MINE".into(),
            x: 20,
            y: 20,
        })
        .unwrap_err();
    assert!(err.is_reported());
    assert!(matches!(err, CommandError::IllegalPlacement { terrain: TerrainKind::Plains, .. }));
    assert_eq!(scenario.player(1).resources, after_farm);
    assert_eq!(scenario.sim.world().buildings.len(), 1);
}

#[test]
fn test_mine_accepted_on_mountain() {
    let mut scenario = ScenarioBuilder::new(40)
        .terrain(20, 20, 3, 3, TerrainKind::Mountain)
        .player(1)
        .build();
    let builder = scenario.spawn(1, "BUILDER", 10.0, 10.0);
    scenario
        .sim
        .apply_command(ME, &Command::BuildStructure {
            builder,
            structure: "MINE".into(),
            x: 20,
            y: 20,
        })
        .unwrap();
    assert_eq!(scenario.sim.world().buildings.len(), 1);
}

// =========================================================================
// Training
// =========================================================================

#[test]
fn test_training_completion_discarded_at_cap() {
    let mut ruleset = Ruleset::standard();
    for unit in &mut ruleset.units {
        unit.upkeep = Fixed::ZERO;
    }
    let infantry = ruleset.unit_id("INFANTRY").unwrap();
    ruleset.units[infantry.0 as usize].cost = Resources::whole(50, 10, 0, 0, 0);

    let mut scenario = ScenarioBuilder::new(40)
        .ruleset(ruleset)
        .resources(Resources::whole(200, 150, 0, 0, 0))
        .player(1)
        .build();
    let hq = scenario.place(1, "TOWN_CENTER", 2, 2, true);
    for i in 0..9 {
        scenario.spawn(1, "BUILDER", 20.0 + f64::from(i), 20.0);
    }
    assert_eq!(scenario.player(1).population.current, 9);

    scenario
        .sim
        .apply_command(ME, &Command::TrainUnit {
            building: hq,
            unit: "INFANTRY".into(),
        })
        .unwrap();
    assert_eq!(scenario.player(1).resources.gold, fixed(150));
    assert_eq!(scenario.player(1).resources.food, fixed(140));

    // The cap fills up while the infantry is still in the queue.
    scenario.spawn(1, "BUILDER", 30.0, 30.0);
    let population = scenario.player(1).population;
    assert_eq!((population.current, population.cap), (10, 10));

    let reports = scenario.run(8.0);

    assert!(scenario.sim.world().buildings[&hq].training_queue.is_empty());
    assert_eq!(scenario.player(1).population.current, 10);
    assert_eq!(scenario.sim.world().units.len(), 10);
    assert_eq!(scenario.player(1).resources.gold, fixed(150));
    assert_eq!(scenario.player(1).resources.food, fixed(140));
    assert!(reports
        .iter()
        .flat_map(|r| &r.dirty.events)
        .all(|e| !matches!(e, GameEvent::Sfx { .. })));
}

#[test]
fn test_training_rejected_when_full() {
    let mut scenario = ScenarioBuilder::new(40).player(1).build();
    let hq = scenario.place(1, "TOWN_CENTER", 2, 2, true);
    for i in 0..10 {
        scenario.spawn(1, "BUILDER", 20.0 + f64::from(i), 20.0);
    }
    let before = scenario.player(1).resources;
    let err = scenario
        .sim
        .apply_command(ME, &Command::TrainUnit {
            building: hq,
            unit: "BUILDER".into(),
        })
        .unwrap_err();
    assert_eq!(err, CommandError::PopulationFull);
    assert_eq!(scenario.player(1).resources, before);
}

#[test]
fn test_trained_unit_appears_at_rally_point() {
    let mut scenario = ScenarioBuilder::new(40).player(1).build();
    let hq = scenario.place(1, "TOWN_CENTER", 2, 2, true);
    scenario
        .sim
        .apply_command(ME, &Command::TrainUnit {
            building: hq,
            unit: "INFANTRY".into(),
        })
        .unwrap();
    scenario.run(7.5);

    let rally = scenario.sim.world().buildings[&hq].rally_point;
    let units: Vec<_> = scenario.sim.world().units_of(ME).collect();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].position, rally);
    assert_eq!(scenario.player(1).population.current, 1);
}

// =========================================================================
// Combat
// =========================================================================

#[test]
fn test_archer_outranges_infantry() {
    let ruleset = ruleset_with_matchups(&[("ARCHER", "INFANTRY", 0.75), ("INFANTRY", "ARCHER", 0.75)]);
    let mut scenario = ScenarioBuilder::new(40).ruleset(ruleset).player(1).player(2).build();
    let archer = scenario.spawn(1, "ARCHER", 10.0, 10.0);
    let infantry = scenario.spawn(2, "INFANTRY", 15.0, 10.0);

    let report = scenario.tick();
    assert_eq!(scenario.sim.world().units[&infantry].hp, fixed(91));
    assert!(report.dirty.events.iter().any(|e| matches!(
        e,
        GameEvent::AttackEffect { attacker, .. } if attacker == "ARCHER"
    )));
    assert_eq!(
        scenario.sim.world().units[&infantry].target,
        Some(EntityRef::Unit(archer))
    );

    // Two more volleys land before the infantry closes to melee range.
    scenario.run(2.4);
    let world = scenario.sim.world();
    assert_eq!(world.units[&infantry].hp, fixed(73));
    assert_eq!(world.units[&archer].hp, fixed(70));
    assert!(world.units[&infantry].position.x < fixed_f(15.0));
}

#[test]
fn test_dead_targets_never_survive_the_tick() {
    let mut scenario = ScenarioBuilder::new(40).player(1).player(2).build();
    let victim = scenario.spawn(2, "ARCHER", 20.0, 20.0);
    let hunters: Vec<_> = (0..3).map(|i| scenario.spawn(1, "INFANTRY", 19.5, 19.0 + f64::from(i) * 0.5)).collect();
    scenario.sim.world_mut().units.get_mut(&victim).unwrap().hp = fixed(1);

    let report = scenario.tick();

    let world = scenario.sim.world();
    assert!(!world.units.contains_key(&victim));
    assert!(report
        .dirty
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::UnitsDied { ids } if ids == &vec![victim])));
    for id in hunters {
        let target = world.units[&id].target;
        assert!(target.map_or(true, |t| world.contains(t)));
    }
    assert_eq!(scenario.player(2).population.current, 0);
}

#[test]
fn test_tower_shoots_units_only() {
    let mut scenario = ScenarioBuilder::new(40).player(1).player(2).build();
    let tower = scenario.place(1, "TOWER", 10, 10, true);
    let enemy_hq = scenario.place(2, "TOWN_CENTER", 14, 10, true);
    scenario.tick();
    assert_eq!(scenario.sim.world().buildings[&tower].target, None);
    assert_eq!(scenario.sim.world().buildings[&enemy_hq].hp, fixed(2000));

    let intruder = scenario.spawn(2, "BUILDER", 16.0, 11.0);
    scenario.tick();
    let world = scenario.sim.world();
    assert_eq!(world.buildings[&tower].target, Some(intruder));
    assert_eq!(world.units[&intruder].hp, fixed(30));
}

#[test]
fn test_destroyed_house_lowers_cap() {
    let mut scenario = ScenarioBuilder::new(40).player(1).player(2).build();
    let house = scenario.place(1, "HOUSE", 10, 10, true);
    assert_eq!(scenario.player(1).population.cap, 5);
    scenario.sim.world_mut().buildings.get_mut(&house).unwrap().hp = fixed(5);
    scenario.spawn(2, "INFANTRY", 11.5, 12.4);

    let report = scenario.tick();
    assert!(!scenario.sim.world().buildings.contains_key(&house));
    assert_eq!(scenario.player(1).population.cap, 0);
    assert!(report
        .dirty
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::BuildingsDestroyed { ids } if ids == &vec![house])));
}

// =========================================================================
// Visibility and replication
// =========================================================================

#[test]
fn test_explored_cells_never_return_to_hidden() {
    let mut scenario = ScenarioBuilder::new(40).player(1).build();
    let scout = scenario.spawn(1, "CAVALRY", 3.0, 3.0);
    scenario
        .sim
        .apply_command(ME, &Command::MoveUnits {
            unit_ids: vec![scout],
            target: point(36.0, 36.0),
        })
        .unwrap();

    let mut seen = vec![false; 40 * 40];
    for _ in 0..400 {
        scenario.tick();
        let fog = scenario.sim.visibility().fog(ME).unwrap();
        for y in 0..40 {
            for x in 0..40 {
                let state = fog.get(x, y);
                let index = (y * 40 + x) as usize;
                if seen[index] {
                    assert_ne!(state, Visibility::Hidden, "cell ({x}, {y}) forgot it was explored");
                }
                seen[index] |= state != Visibility::Hidden;
            }
        }
    }
    let fog = scenario.sim.visibility().fog(ME).unwrap();
    assert_eq!(fog.get(3, 3), Visibility::Explored);
    assert_eq!(fog.get(36, 36), Visibility::Visible);
}

#[test]
fn test_visibility_pass_is_idempotent() {
    let mut scenario = ScenarioBuilder::new(40).player(1).build();
    scenario.spawn(1, "INFANTRY", 10.0, 10.0);
    scenario.spawn(1, "INFANTRY", 12.0, 10.0);
    let first = scenario.sim.recompute_visibility();
    let second = scenario.sim.recompute_visibility();
    assert!(!first.is_empty());
    assert!(second.is_empty());

    let report = scenario.tick();
    let cells = &report.dirty.visibility[&ME];
    let mut unique = cells.clone();
    unique.sort_by_key(|c| (c.y, c.x));
    unique.dedup();
    assert_eq!(unique.len(), cells.len());
}

#[test]
fn test_enemy_hidden_until_in_sight() {
    let mut scenario = ScenarioBuilder::new(60).player(1).player(2).build();
    scenario.spawn(1, "INFANTRY", 5.0, 5.0);
    let stranger = scenario.spawn(2, "INFANTRY", 50.0, 50.0);

    let packets = scenario.sim.step(fixed_f(0.05));
    assert!(packets[&ME].units.iter().all(|u| u.id != stranger.0));

    scenario.sim.world_mut().units.get_mut(&stranger).unwrap().position = point(8.0, 5.0);
    let packets = scenario.sim.step(fixed_f(0.05));
    assert!(packets[&ME].units.iter().any(|u| u.id == stranger.0));
}

#[test]
fn test_explored_cells_hide_entities_and_located_events() {
    let mut scenario = ScenarioBuilder::new(48).player(1).player(2).build();
    let scout = scenario.spawn(1, "CAVALRY", 10.0, 10.0);
    scenario.tick();
    let fog = |scenario: &Scenario, x: i32, y: i32| {
        scenario.sim.visibility().fog(ME).unwrap().get(x, y)
    };
    assert_eq!(fog(&scenario, 10, 10), Visibility::Visible);

    {
        let unit = scenario.sim.world_mut().units.get_mut(&scout).unwrap();
        unit.position = point(40.0, 40.0);
        unit.move_target = None;
    }
    scenario.tick();
    assert_eq!(fog(&scenario, 10, 10), Visibility::Explored);
    assert_eq!(fog(&scenario, 9, 9), Visibility::Explored);

    let enemy_unit = scenario.spawn(2, "INFANTRY", 10.5, 10.5);
    let enemy_house = scenario.place(2, "HOUSE", 8, 8, true);

    let mut dirty = DirtySet::default();
    dirty.push_event(GameEvent::AttackEffect {
        from: point(10.0, 11.0),
        to: point(10.5, 10.5),
        attacker: "ARCHER".into(),
    });
    dirty.push_event(GameEvent::BuildingsDestroyed { ids: vec![BuildingId(999)] });

    let packets = encode_updates(&scenario.sim, &dirty);
    let packet = &packets[&ME];
    assert!(packet.units.iter().any(|u| u.id == scout.0));
    assert!(packet.units.iter().all(|u| u.id != enemy_unit.0));
    assert!(packet.buildings.iter().all(|b| b.id != enemy_house.0));
    assert!(!packet.events.iter().any(|e| matches!(e, EventDto::AttackEffect { .. })));
    assert_eq!(packet.events, vec![EventDto::BuildingsDestroyed { ids: vec![999] }]);
}
