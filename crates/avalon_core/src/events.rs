//! Events and per-tick change tracking.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{BuildingId, PlayerId, UnitId};
use crate::math::Vec2Fixed;
use crate::visibility::CellChange;

/// Sound cue kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SfxKind {
    /// A building finished construction.
    ConstructionComplete,
    /// A unit left a training queue.
    UnitTrained,
}

/// Something that happened during a tick, for clients to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Play a sound at a location.
    Sfx {
        /// Which sound.
        sound: SfxKind,
        /// Where.
        pos: Vec2Fixed,
    },
    /// Draw a hit between two points.
    AttackEffect {
        /// Attacker center.
        from: Vec2Fixed,
        /// Target center.
        to: Vec2Fixed,
        /// Unit or building type key of the attacker.
        attacker: String,
    },
    /// Units removed this tick.
    UnitsDied {
        /// Removed unit ids.
        ids: Vec<UnitId>,
    },
    /// Buildings removed this tick.
    BuildingsDestroyed {
        /// Removed building ids.
        ids: Vec<BuildingId>,
    },
}

impl GameEvent {
    /// Location a viewer must see for the event to be delivered, or `None`
    /// for events every player receives.
    #[must_use]
    pub fn location(&self) -> Option<Vec2Fixed> {
        match self {
            Self::Sfx { pos, .. } => Some(*pos),
            Self::AttackEffect { to, .. } => Some(*to),
            Self::UnitsDied { .. } | Self::BuildingsDestroyed { .. } => None,
        }
    }
}

/// Everything a tick changed.
///
/// The replication encoder reads `players`, `events` and `visibility`. It
/// resends every visible unit and building each tick regardless of change,
/// so `units` and `buildings` are not consulted there; they are kept for
/// tick reports, tests and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    /// Players whose record changed.
    pub players: BTreeSet<PlayerId>,
    /// Units that changed. Not used for replication.
    pub units: BTreeSet<UnitId>,
    /// Buildings that changed. Not used for replication.
    pub buildings: BTreeSet<BuildingId>,
    /// Events in emission order.
    pub events: Vec<GameEvent>,
    /// Visibility deltas per player.
    pub visibility: BTreeMap<PlayerId, Vec<CellChange>>,
}

impl DirtySet {
    /// Record an event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Merge visibility deltas from a recompute pass.
    pub fn merge_visibility(&mut self, deltas: BTreeMap<PlayerId, Vec<CellChange>>) {
        for (player, changes) in deltas {
            self.visibility.entry(player).or_default().extend(changes);
        }
    }
}
