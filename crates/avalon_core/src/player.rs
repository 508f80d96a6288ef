//! Per-player records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{PlayerId, UnitId};
use crate::economy::Resources;
use crate::math::Vec2Fixed;

/// Population counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Population {
    /// Units currently owned.
    pub current: u32,
    /// Capacity granted by completed buildings.
    pub cap: u32,
}

impl Population {
    /// Whether another unit fits under the cap.
    #[must_use]
    pub const fn has_room(&self) -> bool {
        self.current < self.cap
    }
}

/// A participant in a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Stockpile.
    pub resources: Resources,
    /// Population counters.
    pub population: Population,
    /// Ids of owned units. The unit records live in the world table.
    pub units: BTreeSet<UnitId>,
    /// Anchor the player's base was placed at.
    pub start_pos: Vec2Fixed,
}

impl Player {
    /// Create a player with no units.
    #[must_use]
    pub fn new(id: PlayerId, name: String, color: String, resources: Resources, start_pos: Vec2Fixed) -> Self {
        Self {
            id,
            name,
            color,
            resources,
            population: Population::default(),
            units: BTreeSet::new(),
            start_pos,
        }
    }

    /// Recount `population.current` from the owned-unit set.
    pub fn recount_population(&mut self) {
        self.population.current = self.units.len() as u32;
    }
}
