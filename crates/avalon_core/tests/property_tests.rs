//! Property tests over randomized worlds and tick deltas.

use avalon_core::components::PlayerId;
use avalon_core::math::Fixed;
use avalon_core::simulation::Simulation;
use avalon_core::visibility::{FogOfWar, Visibility};
use avalon_test_utils::determinism::strategies::{arb_command_sequence, arb_delta, arb_point, arb_vision};
use avalon_test_utils::fixtures::ScenarioBuilder;
use proptest::prelude::*;

const SIZE: u32 = 48;
const UNIT_KEYS: [&str; 4] = ["BUILDER", "INFANTRY", "ARCHER", "CAVALRY"];
const BUILDING_KEYS: [&str; 4] = ["HOUSE", "FARM", "BARRACKS", "TOWER"];

#[derive(Debug, Clone)]
struct Layout {
    units: Vec<(u64, usize, f64, f64)>,
    buildings: Vec<(u64, usize, i32, i32, bool)>,
}

fn arb_layout() -> impl Strategy<Value = Layout> {
    let unit = (1u64..=2, 0usize..UNIT_KEYS.len(), 0.0..f64::from(SIZE), 0.0..f64::from(SIZE));
    let building = (1u64..=2, 0usize..BUILDING_KEYS.len(), 0i32..44, 0i32..44, any::<bool>());
    (
        proptest::collection::vec(unit, 0..14),
        proptest::collection::vec(building, 0..5),
    )
        .prop_map(|(units, buildings)| Layout { units, buildings })
}

fn build(layout: &Layout) -> Simulation {
    let mut scenario = ScenarioBuilder::new(SIZE).player(1).player(2).build();
    for &(owner, kind, x, y, complete) in &layout.buildings {
        scenario.place(owner, BUILDING_KEYS[kind], x, y, complete);
    }
    for &(owner, kind, x, y) in &layout.units {
        scenario.spawn(owner, UNIT_KEYS[kind], x, y);
    }
    scenario.sim
}

fn fog_snapshot(fog: &FogOfWar) -> Vec<Visibility> {
    (0..SIZE as i32)
        .flat_map(|y| (0..SIZE as i32).map(move |x| (x, y)))
        .map(|(x, y)| fog.get(x, y))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_build_progress_never_overshoots(layout in arb_layout(), deltas in proptest::collection::vec(arb_delta(), 1..60)) {
        let mut sim = build(&layout);
        let mut last: Vec<_> = sim.world().buildings.values().map(|b| (b.id, b.build_progress)).collect();
        for delta in deltas {
            sim.tick(delta);
            for (id, before) in &last {
                if let Some(building) = sim.world().buildings.get(id) {
                    prop_assert!(building.build_progress >= *before);
                    prop_assert!(building.build_progress <= Fixed::ONE);
                    prop_assert!(building.hp <= building.max_hp);
                }
            }
            last = sim.world().buildings.values().map(|b| (b.id, b.build_progress)).collect();
        }
    }

    #[test]
    fn prop_population_matches_owned_units(layout in arb_layout(), deltas in proptest::collection::vec(arb_delta(), 1..60)) {
        let mut sim = build(&layout);
        for delta in deltas {
            sim.tick(delta);
            for player in sim.world().players.values() {
                let owned = sim.world().units_of(player.id).count();
                prop_assert_eq!(player.population.current as usize, owned);
                prop_assert_eq!(player.units.len(), owned);
            }
        }
    }

    #[test]
    fn prop_no_dead_targets_across_ticks(
        layout in arb_layout(),
        commands in arb_command_sequence(SIZE, 20, 10),
    ) {
        let mut sim = build(&layout);
        for (i, command) in commands.iter().enumerate() {
            let _ = sim.apply_command(PlayerId(1 + (i as u64 % 2)), command);
            sim.tick(Fixed::from_num(0.05));
            let world = sim.world();
            for unit in world.units.values() {
                if let Some(target) = unit.target {
                    prop_assert!(world.contains(target));
                }
                prop_assert!(unit.hp > Fixed::ZERO);
            }
            for building in world.buildings.values() {
                if let Some(target) = building.target {
                    prop_assert!(world.units.contains_key(&target));
                }
            }
        }
    }

    #[test]
    fn prop_explored_is_permanent(
        paths in proptest::collection::vec(
            proptest::collection::vec((arb_point(SIZE), arb_vision()), 0..6),
            1..12,
        ),
    ) {
        let mut fog = FogOfWar::new(SIZE);
        let mut previous = fog_snapshot(&fog);
        for sights in paths {
            fog.recompute(sights.iter().copied());
            let current = fog_snapshot(&fog);
            for (before, after) in previous.iter().zip(&current) {
                if *before != Visibility::Hidden {
                    prop_assert_ne!(*after, Visibility::Hidden);
                }
            }
            previous = current;
        }
    }

    #[test]
    fn prop_second_pass_is_empty(sights in proptest::collection::vec((arb_point(SIZE), arb_vision()), 0..8)) {
        let mut fog = FogOfWar::new(SIZE);
        let first = fog.recompute(sights.iter().copied());
        let mut unique = first.clone();
        unique.sort_by_key(|c| (c.y, c.x));
        unique.dedup_by_key(|c| (c.x, c.y));
        prop_assert_eq!(unique.len(), first.len());
        prop_assert!(fog.recompute(sights.iter().copied()).is_empty());
    }
}
