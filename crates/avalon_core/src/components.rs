//! Entity records stored in the world tables.
//!
//! Plain data; all behavior lives in systems, combat and the command
//! processor.

use serde::{Deserialize, Serialize};

use crate::data::{BuildingTypeId, UnitTypeId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Identifier of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

/// Identifier of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Identifier of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for BuildingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to either kind of entity.
///
/// Unit and building ids come from one counter, so a raw id resolves to at
/// most one of the two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    /// A unit.
    Unit(UnitId),
    /// A building.
    Building(BuildingId),
}

impl EntityRef {
    /// The raw id shared with clients.
    #[must_use]
    pub const fn raw(self) -> u64 {
        match self {
            Self::Unit(UnitId(id)) | Self::Building(BuildingId(id)) => id,
        }
    }
}

/// A mobile entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Unit id.
    pub id: UnitId,
    /// Owning player.
    pub owner: PlayerId,
    /// Unit type.
    pub kind: UnitTypeId,
    /// Continuous position in cells.
    pub position: Vec2Fixed,
    /// Current hit points.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Hit points at full health.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Point the unit is walking to.
    pub move_target: Option<Vec2Fixed>,
    /// Entity the unit is attacking or chasing.
    pub target: Option<EntityRef>,
    /// Seconds until the next hit may land.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
    /// Whether the unit may construct buildings.
    pub can_build: bool,
}

/// One entry in a training queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingItem {
    /// Unit type being trained.
    pub unit: UnitTypeId,
    /// Completion fraction in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub progress: Fixed,
}

/// A static structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Building {
    /// Building id.
    pub id: BuildingId,
    /// Owning player.
    pub owner: PlayerId,
    /// Building type.
    pub kind: BuildingTypeId,
    /// Top-left cell x.
    pub x: i32,
    /// Top-left cell y.
    pub y: i32,
    /// Current hit points.
    #[serde(with = "fixed_serde")]
    pub hp: Fixed,
    /// Hit points once complete.
    #[serde(with = "fixed_serde")]
    pub max_hp: Fixed,
    /// Construction fraction in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub build_progress: Fixed,
    /// Construction time in seconds.
    #[serde(with = "fixed_serde")]
    pub build_time: Fixed,
    /// Units waiting to be trained; only the head advances.
    pub training_queue: Vec<TrainingItem>,
    /// Where freshly trained units appear.
    pub rally_point: Vec2Fixed,
    /// Seconds until the next hit may land.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
    /// Unit the building is shooting at.
    pub target: Option<UnitId>,
}

impl Building {
    /// Whether construction has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.build_progress >= Fixed::ONE
    }

    /// Footprint center for a building with the given side length.
    #[must_use]
    pub fn center(&self, footprint: u32) -> Vec2Fixed {
        let half = Fixed::from_num(footprint) / Fixed::from_num(2);
        Vec2Fixed::new(Fixed::from_num(self.x) + half, Fixed::from_num(self.y) + half)
    }
}
