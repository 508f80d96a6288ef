//! Building data structures for data-driven building definitions.

use serde::{Deserialize, Serialize};

use super::terrain_data::TerrainKind;
use crate::economy::Resources;
use crate::math::{fixed_decimal, Fixed};

/// Offensive stats for structures that shoot (towers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingAttack {
    /// Damage per hit. Never scaled by matchups.
    #[serde(with = "fixed_decimal")]
    pub damage: Fixed,

    /// Attack range in cells, measured from the footprint center.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,

    /// Hits per second.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,
}

impl BuildingAttack {
    /// Seconds between two hits.
    #[must_use]
    pub fn attack_interval(&self) -> Fixed {
        if self.attack_speed > Fixed::ZERO {
            Fixed::ONE / self.attack_speed
        } else {
            Fixed::MAX
        }
    }
}

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     key: "FARM",
///     name: "Farm",
///     hp: 300.0,
///     cost: (wood: 50.0),
///     build_time: 10.0,
///     production: (food: 0.8),
///     placement: Some(PLAINS),
///     vision: 3.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Stable key used on the wire and in other data tables.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Hit points once construction completes.
    #[serde(with = "fixed_decimal")]
    pub hp: Fixed,

    /// Resources charged when construction is ordered.
    #[serde(default)]
    pub cost: Resources,

    /// Construction time in seconds. Zero completes on the first tick.
    #[serde(default, with = "fixed_decimal")]
    pub build_time: Fixed,

    /// Population capacity granted while complete.
    #[serde(default)]
    pub provides_pop: u32,

    /// Resources produced per second while complete.
    #[serde(default)]
    pub production: Resources,

    /// Unit keys this building can train.
    #[serde(default)]
    pub trains: Vec<String>,

    /// Sight radius in cells from the footprint center.
    #[serde(with = "fixed_decimal")]
    pub vision: Fixed,

    /// Side length of the square footprint in cells.
    #[serde(default = "default_footprint")]
    pub footprint: u32,

    /// Terrain the top-left cell must have. `None` accepts any buildable
    /// terrain.
    #[serde(default)]
    pub placement: Option<TerrainKind>,

    /// Offensive stats, if the structure shoots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<BuildingAttack>,
}

/// Default footprint for buildings without an explicit size.
const fn default_footprint() -> u32 {
    3
}

impl BuildingData {
    /// Check if this building can train the given unit key.
    #[must_use]
    pub fn can_train(&self, unit_key: &str) -> bool {
        self.trains.iter().any(|u| u == unit_key)
    }

    /// Whether a building of this type may stand on `terrain`.
    #[must_use]
    pub fn allows_terrain(&self, terrain: TerrainKind) -> bool {
        terrain.buildable() && self.placement.map_or(true, |required| required == terrain)
    }

    /// Footprint side as a fixed-point length.
    #[must_use]
    pub fn footprint_len(&self) -> Fixed {
        Fixed::from_num(self.footprint)
    }

    /// Offset from the top-left cell to the footprint center.
    #[must_use]
    pub fn center_offset(&self) -> Fixed {
        self.footprint_len() / Fixed::from_num(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_building() -> BuildingData {
        ron::from_str(
            r#"BuildingData(
                key: "FARM",
                name: "Farm",
                hp: 300.0,
                cost: (wood: 50.0),
                build_time: 10.0,
                production: (food: 0.8),
                placement: Some(PLAINS),
                vision: 3.0,
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let farm = create_test_building();
        assert_eq!(farm.footprint, 3);
        assert_eq!(farm.provides_pop, 0);
        assert!(farm.trains.is_empty());
        assert!(farm.attack.is_none());
    }

    #[test]
    fn test_allows_terrain() {
        let mut farm = create_test_building();
        assert!(farm.allows_terrain(TerrainKind::Plains));
        assert!(!farm.allows_terrain(TerrainKind::Mountain));

        farm.placement = None;
        assert!(farm.allows_terrain(TerrainKind::Mountain));
    }

    #[test]
    fn test_can_train() {
        let mut farm = create_test_building();
        farm.trains.push("INFANTRY".to_string());
        assert!(farm.can_train("INFANTRY"));
        assert!(!farm.can_train("CAVALRY"));
    }

    #[test]
    fn test_center_offset() {
        let farm = create_test_building();
        assert_eq!(farm.center_offset(), Fixed::from_num(1.5));
    }
}
