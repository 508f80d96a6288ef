//! Unit data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::economy::Resources;
use crate::math::{fixed_decimal, Fixed};

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     key: "ARCHER",
///     name: "Archer",
///     hp: 70.0,
///     speed: 1.6,
///     cost: (wood: 25.0, gold: 25.0),
///     upkeep: 0.25,
///     attack: 12.0,
///     range: 6.0,
///     attack_speed: 1.2,
///     vision: 9.0,
///     train_time: 10.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    /// Stable key used on the wire and in other data tables.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Maximum hit points.
    #[serde(with = "fixed_decimal")]
    pub hp: Fixed,

    /// Movement speed in cells per second on plains.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,

    /// Resources charged when the unit is queued.
    #[serde(default)]
    pub cost: Resources,

    /// Food consumed per second while the unit is alive.
    #[serde(default, with = "fixed_decimal")]
    pub upkeep: Fixed,

    /// Whether the unit may construct buildings.
    #[serde(default)]
    pub can_build: bool,

    /// Base damage per hit.
    #[serde(with = "fixed_decimal")]
    pub attack: Fixed,

    /// Attack range in cells.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,

    /// Hits per second.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,

    /// Sight radius in cells. Also the auto-acquisition radius.
    #[serde(with = "fixed_decimal")]
    pub vision: Fixed,

    /// Seconds a training building spends on one unit.
    #[serde(with = "fixed_decimal")]
    pub train_time: Fixed,
}

impl UnitData {
    /// Seconds between two hits.
    #[must_use]
    pub fn attack_interval(&self) -> Fixed {
        if self.attack_speed > Fixed::ZERO {
            Fixed::ONE / self.attack_speed
        } else {
            Fixed::MAX
        }
    }

    /// Check if this unit can engage in combat.
    #[must_use]
    pub fn is_combatant(&self) -> bool {
        self.attack > Fixed::ZERO && self.attack_speed > Fixed::ZERO
    }
}
