//! Test fixtures and helpers.
//!
//! Small hand-built worlds for scenario tests. A [`ScenarioBuilder`] starts
//! from an all-Plains board with no bases, so tests place exactly the
//! entities they care about.

use avalon_core::board::Board;
use avalon_core::components::{BuildingId, PlayerId, UnitId};
use avalon_core::data::{Matchup, Ruleset, TerrainKind};
use avalon_core::economy::Resources;
use avalon_core::math::{Fixed, Vec2Fixed};
use avalon_core::player::Player;
use avalon_core::simulation::{Simulation, TickReport, TICK_DURATION_MS};
use avalon_core::world::World;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A point from float coordinates.
#[must_use]
pub fn point(x: f64, y: f64) -> Vec2Fixed {
    Vec2Fixed::new(fixed_f(x), fixed_f(y))
}

/// One nominal tick in seconds.
#[must_use]
pub fn tick_delta() -> Fixed {
    Fixed::from_num(TICK_DURATION_MS) / Fixed::from_num(1000)
}

/// The standard ruleset with its matchup table replaced.
#[must_use]
pub fn ruleset_with_matchups(pairs: &[(&str, &str, f64)]) -> Ruleset {
    let mut ruleset = Ruleset::standard();
    ruleset.matchups = pairs
        .iter()
        .map(|(attacker, defender, multiplier)| Matchup {
            attacker: (*attacker).to_string(),
            defender: (*defender).to_string(),
            multiplier: fixed_f(*multiplier),
        })
        .collect();
    ruleset
}

/// Builder for hand-made test worlds.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    ruleset: Ruleset,
    board: Board,
    players: Vec<PlayerId>,
    resources: Option<Resources>,
}

impl ScenarioBuilder {
    /// A flat Plains board of `size` cells with the standard ruleset.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            ruleset: Ruleset::standard(),
            board: Board::filled(size, TerrainKind::Plains),
            players: Vec::new(),
            resources: None,
        }
    }

    /// Use a different ruleset.
    #[must_use]
    pub fn ruleset(mut self, ruleset: Ruleset) -> Self {
        self.ruleset = ruleset;
        self
    }

    /// Paint a rectangle of terrain.
    #[must_use]
    pub fn terrain(mut self, x: i32, y: i32, width: i32, height: i32, kind: TerrainKind) -> Self {
        for cy in y..y + height {
            for cx in x..x + width {
                self.board.set(cx, cy, kind);
            }
        }
        self
    }

    /// Add a player.
    #[must_use]
    pub fn player(mut self, id: u64) -> Self {
        self.players.push(PlayerId(id));
        self
    }

    /// Stockpile every player starts with; defaults to the ruleset's.
    #[must_use]
    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Finish the world.
    #[must_use]
    pub fn build(self) -> Scenario {
        let resources = self.resources.unwrap_or(self.ruleset.starting_resources);
        let mut world = World::new(self.board);
        for (index, id) in self.players.iter().enumerate() {
            world.add_player(Player::new(
                *id,
                format!("Player {}", id.0),
                self.ruleset.player_color(index),
                resources,
                Vec2Fixed::ZERO,
            ));
        }
        Scenario {
            sim: Simulation::from_world(self.ruleset, world),
        }
    }
}

/// A running test world.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// The simulation under test.
    pub sim: Simulation,
}

impl Scenario {
    /// Spawn a unit by type key.
    ///
    /// # Panics
    ///
    /// Panics if the key or owner is unknown.
    pub fn spawn(&mut self, owner: u64, key: &str, x: f64, y: f64) -> UnitId {
        let kind = self.sim.ruleset().unit_id(key).expect("unknown unit key");
        let ruleset = self.sim.ruleset().clone();
        self.sim
            .world_mut()
            .spawn_unit(&ruleset, PlayerId(owner), kind, point(x, y))
            .expect("unknown owner")
    }

    /// Place a building by type key, optionally already complete.
    ///
    /// # Panics
    ///
    /// Panics if the key or owner is unknown.
    pub fn place(&mut self, owner: u64, key: &str, x: i32, y: i32, complete: bool) -> BuildingId {
        let kind = self.sim.ruleset().building_id(key).expect("unknown building key");
        let ruleset = self.sim.ruleset().clone();
        let world = self.sim.world_mut();
        let id = world
            .place_building(&ruleset, PlayerId(owner), kind, x, y)
            .expect("unknown owner");
        if complete {
            world.complete_building(&ruleset, id);
        }
        id
    }

    /// Advance one nominal tick.
    pub fn tick(&mut self) -> TickReport {
        self.sim.tick(tick_delta())
    }

    /// Advance nominal ticks until `seconds` have elapsed.
    pub fn run(&mut self, seconds: f64) -> Vec<TickReport> {
        let ticks = (seconds * 1000.0 / TICK_DURATION_MS as f64).ceil() as u64;
        (0..ticks).map(|_| self.tick()).collect()
    }

    /// Set a player's stockpile.
    ///
    /// # Panics
    ///
    /// Panics if the player is unknown.
    pub fn set_resources(&mut self, owner: u64, resources: Resources) {
        self.sim
            .world_mut()
            .players
            .get_mut(&PlayerId(owner))
            .expect("unknown player")
            .resources = resources;
    }

    /// A player's record.
    ///
    /// # Panics
    ///
    /// Panics if the player is unknown.
    #[must_use]
    pub fn player(&self, owner: u64) -> &Player {
        &self.sim.world().players[&PlayerId(owner)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_places_entities() {
        let mut scenario = ScenarioBuilder::new(40)
            .terrain(0, 0, 5, 5, TerrainKind::Forest)
            .player(1)
            .player(2)
            .build();
        let unit = scenario.spawn(1, "INFANTRY", 10.0, 10.0);
        let hq = scenario.place(2, "TOWN_CENTER", 20, 20, true);

        let world = scenario.sim.world();
        assert_eq!(world.board.get(4, 4), Some(TerrainKind::Forest));
        assert_eq!(world.units[&unit].owner, PlayerId(1));
        assert!(world.buildings[&hq].is_complete());
        assert_eq!(scenario.player(2).population.cap, 10);
    }

    #[test]
    fn test_run_covers_elapsed_time() {
        let mut scenario = ScenarioBuilder::new(20).player(1).build();
        let reports = scenario.run(1.0);
        assert_eq!(reports.len(), 20);
        assert_eq!(scenario.sim.current_tick(), 20);
    }

    #[test]
    fn test_matchup_override() {
        let ruleset = ruleset_with_matchups(&[("ARCHER", "INFANTRY", 0.75)]);
        let archer = ruleset.unit_id("ARCHER").unwrap();
        let infantry = ruleset.unit_id("INFANTRY").unwrap();
        assert_eq!(ruleset.matchup(archer, infantry), fixed_f(0.75));
        assert_eq!(ruleset.matchup(infantry, archer), fixed(1));
    }
}
