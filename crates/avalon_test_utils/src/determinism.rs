//! Determinism testing utilities.
//!
//! The server is authoritative, so clients never re-simulate. Determinism
//! still matters: it makes every bug reproducible from a seed and a command
//! log, and it lets tests compare whole worlds by hash.
//!
//! Sources of non-determinism the core avoids:
//!
//! - **Floating-point math**: fixed-point via [`avalon_core::math::Fixed`].
//! - **HashMap iteration order**: every entity table is a `BTreeMap`.
//! - **System randomness**: map generation takes an explicit seed.
//!
//! Wall-clock jitter in the server's measured tick delta is the one input
//! the harness pins down, by always stepping with [`tick_delta`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use avalon_core::commands::Command;
use avalon_core::components::PlayerId;
use avalon_core::simulation::Simulation;

use crate::fixtures::tick_delta;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run two identical games for `num_ticks` and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick(tick_delta());
        },
        |sim| sim.state_hash(),
    )
    .is_deterministic
}

/// Replay a command script against fresh games on separate threads.
///
/// `script` maps a tick number to the commands issued just before it.
/// Returns one final hash per thread.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_scripted_in_parallel<F>(
    setup_fn: F,
    script: &[(u64, PlayerId, Command)],
    num_sims: usize,
    num_ticks: u64,
) -> Vec<u64>
where
    F: Fn() -> Simulation + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for tick in 0..num_ticks {
                        for (_, player, command) in script.iter().filter(|(at, _, _)| *at == tick) {
                            let _ = sim.apply_command(*player, command);
                        }
                        sim.tick(tick_delta());
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(tick_delta());
        sim2.tick(tick_delta());

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a bincode snapshot restores the exact state, and that the
/// restored game keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..num_ticks {
        sim.tick(tick_delta());
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    sim.tick(tick_delta());
    restored.tick(tick_delta());
    restored.state_hash() == sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use avalon_core::commands::Command;
    use avalon_core::components::UnitId;
    use avalon_core::math::{Fixed, Vec2Fixed};
    use proptest::prelude::*;

    /// A coordinate inside a board of `size` cells.
    pub fn arb_coordinate(size: u32) -> impl Strategy<Value = Fixed> {
        (0..size * 16).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(16))
    }

    /// A point inside a board of `size` cells.
    pub fn arb_point(size: u32) -> impl Strategy<Value = Vec2Fixed> {
        (arb_coordinate(size), arb_coordinate(size)).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// A tick delta between 1 ms and 200 ms, covering scheduler jitter.
    pub fn arb_delta() -> impl Strategy<Value = Fixed> {
        (1i32..=200).prop_map(|ms| Fixed::from_num(ms) / Fixed::from_num(1000))
    }

    /// Vision radius in cells.
    pub fn arb_vision() -> impl Strategy<Value = Fixed> {
        (1i32..=15).prop_map(Fixed::from_num)
    }

    /// A move order for units with raw ids in `0..max_id`.
    pub fn arb_move_command(size: u32, max_id: u64) -> impl Strategy<Value = Command> {
        (proptest::collection::vec(0..max_id, 1..4), arb_point(size)).prop_map(|(ids, target)| {
            Command::MoveUnits {
                unit_ids: ids.into_iter().map(UnitId).collect(),
                target,
            }
        })
    }

    /// An attack order against any raw id in `0..max_id`.
    pub fn arb_attack_command(max_id: u64) -> impl Strategy<Value = Command> {
        (proptest::collection::vec(0..max_id, 1..4), 0..max_id).prop_map(|(ids, target)| {
            Command::AttackTarget {
                unit_ids: ids.into_iter().map(UnitId).collect(),
                target,
            }
        })
    }

    /// Any movement or attack order.
    pub fn arb_command(size: u32, max_id: u64) -> impl Strategy<Value = Command> {
        prop_oneof![arb_move_command(size, max_id), arb_attack_command(max_id)]
    }

    /// Generate a sequence of commands.
    pub fn arb_command_sequence(size: u32, max_id: u64, max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        proptest::collection::vec(arb_command(size, max_id), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{point, ScenarioBuilder};
    use avalon_core::board::Board;
    use avalon_core::components::UnitId;
    use avalon_core::data::{Ruleset, TerrainKind};
    use avalon_core::map_generation::{generate_board, MapConfig};
    use avalon_core::simulation::PlayerSetup;
    use proptest::prelude::*;

    fn skirmish() -> Simulation {
        let mut scenario = ScenarioBuilder::new(40).player(1).player(2).build();
        scenario.place(1, "TOWN_CENTER", 2, 2, true);
        scenario.place(2, "TOWER", 30, 30, true);
        for i in 0..4 {
            scenario.spawn(1, "INFANTRY", 8.0 + f64::from(i), 8.0);
            scenario.spawn(2, "ARCHER", 28.0, 26.0 + f64::from(i));
        }
        scenario.spawn(2, "CAVALRY", 20.0, 20.0);
        scenario.sim
    }

    fn full_game() -> Simulation {
        let board = generate_board(&MapConfig::scaled(120, 7));
        let players = [PlayerSetup::new(PlayerId(1), "Ada"), PlayerSetup::new(PlayerId(2), "Bo")];
        Simulation::new(Ruleset::standard(), board, &players).unwrap()
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_world_determinism() {
        assert!(verify_simulation_determinism(
            || Simulation::from_world(Ruleset::standard(), avalon_core::world::World::new(Board::filled(16, TerrainKind::Plains))),
            50,
        ));
    }

    #[test]
    fn test_skirmish_determinism() {
        verify_determinism(3, 400, skirmish, |sim| {
            sim.tick(tick_delta());
        }, Simulation::state_hash)
        .assert_deterministic();
    }

    #[test]
    fn test_full_game_has_no_divergence() {
        assert_eq!(find_first_divergence(full_game, 100), None);
    }

    #[test]
    fn test_scripted_parallel_runs_match() {
        let script = vec![
            (0, PlayerId(1), Command::MoveUnits {
                unit_ids: (0..20).map(UnitId).collect(),
                target: point(30.0, 30.0),
            }),
            (40, PlayerId(2), Command::AttackTarget {
                unit_ids: (0..20).map(UnitId).collect(),
                target: 3,
            }),
        ];
        let hashes = run_scripted_in_parallel(skirmish, &script, 4, 300);
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_serialization_preserves_skirmish() {
        assert!(verify_serialization_determinism(skirmish, 120));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_command_sequences_are_deterministic(commands in strategies::arb_command_sequence(40, 16, 12)) {
            let run = || {
                let mut sim = skirmish();
                for (i, command) in commands.iter().enumerate() {
                    let player = PlayerId(1 + (i as u64 % 2));
                    let _ = sim.apply_command(player, command);
                    sim.tick(tick_delta());
                }
                sim.state_hash()
            };
            prop_assert_eq!(run(), run());
        }
    }
}
