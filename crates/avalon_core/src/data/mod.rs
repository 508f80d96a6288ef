//! Static game balance data.
//!
//! This module contains pure data structures that define units, buildings,
//! terrain and technologies. The complete set is a [`Ruleset`], which is
//! immutable for the lifetime of a game and shipped verbatim to clients.
//!
//! **Note:** This module contains no IO. Callers read files and hand the
//! text to [`Ruleset::from_ron_str`].

mod building_data;
mod standard;
mod tech_data;
mod terrain_data;
mod unit_data;

pub use building_data::{BuildingAttack, BuildingData};
pub use tech_data::TechData;
pub use terrain_data::{TerrainInfo, TerrainKind};
pub use unit_data::UnitData;

use serde::{Deserialize, Serialize};

use crate::economy::Resources;
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};

/// Compact index of a unit type inside a [`Ruleset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitTypeId(pub u32);

/// Compact index of a building type inside a [`Ruleset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingTypeId(pub u32);

/// Damage multiplier for one attacker/defender unit pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    /// Attacking unit key.
    pub attacker: String,
    /// Defending unit key.
    pub defender: String,
    /// Multiplier applied to the attacker's base damage.
    #[serde(with = "fixed_decimal")]
    pub multiplier: Fixed,
}

/// A unit every player starts with, relative to their start position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingUnit {
    /// Unit key.
    pub unit: String,
    /// Offset from the start position along x.
    #[serde(with = "fixed_decimal")]
    pub offset_x: Fixed,
    /// Offset from the start position along y.
    #[serde(with = "fixed_decimal")]
    pub offset_y: Fixed,
}

/// Complete balance definition for a game.
///
/// # Example RON
///
/// ```ron
/// Ruleset(
///     units: [...],
///     buildings: [...],
///     technologies: [...],
///     matchups: [(attacker: "ARCHER", defender: "INFANTRY", multiplier: 1.5)],
///     starting_resources: (gold: 200.0, food: 150.0, wood: 100.0, stone: 50.0),
///     headquarters: "TOWN_CENTER",
///     starting_units: [(unit: "BUILDER", offset_x: 4.0, offset_y: 1.0)],
///     player_colors: ["#4caf50", "#f44336"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    /// All unit types. Position in this list is the [`UnitTypeId`].
    pub units: Vec<UnitData>,

    /// All building types. Position in this list is the [`BuildingTypeId`].
    pub buildings: Vec<BuildingData>,

    /// Reference technology table.
    #[serde(default)]
    pub technologies: Vec<TechData>,

    /// Unit-versus-unit damage multipliers. Unlisted pairs use 1.0.
    #[serde(default)]
    pub matchups: Vec<Matchup>,

    /// Stockpile each player starts with.
    pub starting_resources: Resources,

    /// Building key placed, already complete, at every start position.
    pub headquarters: String,

    /// Units spawned around every start position.
    #[serde(default)]
    pub starting_units: Vec<StartingUnit>,

    /// Player colors, assigned in join order.
    pub player_colors: Vec<String>,
}

impl Ruleset {
    /// Parse a ruleset from RON text and validate it.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let ruleset: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: "<ruleset>".to_string(),
            message: e.to_string(),
        })?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Resolve a unit key to its id.
    #[must_use]
    pub fn unit_id(&self, key: &str) -> Option<UnitTypeId> {
        self.units
            .iter()
            .position(|u| u.key == key)
            .map(|i| UnitTypeId(i as u32))
    }

    /// Resolve a building key to its id.
    #[must_use]
    pub fn building_id(&self, key: &str) -> Option<BuildingTypeId> {
        self.buildings
            .iter()
            .position(|b| b.key == key)
            .map(|i| BuildingTypeId(i as u32))
    }

    /// Look up a unit type.
    #[must_use]
    pub fn unit(&self, id: UnitTypeId) -> Option<&UnitData> {
        self.units.get(id.0 as usize)
    }

    /// Look up a building type.
    #[must_use]
    pub fn building(&self, id: BuildingTypeId) -> Option<&BuildingData> {
        self.buildings.get(id.0 as usize)
    }

    /// Find a technology by its key.
    #[must_use]
    pub fn technology(&self, key: &str) -> Option<&TechData> {
        self.technologies.iter().find(|t| t.key == key)
    }

    /// Damage multiplier for `attacker` hitting `defender`.
    #[must_use]
    pub fn matchup(&self, attacker: UnitTypeId, defender: UnitTypeId) -> Fixed {
        let (Some(a), Some(d)) = (self.unit(attacker), self.unit(defender)) else {
            return Fixed::ONE;
        };
        self.matchups
            .iter()
            .find(|m| m.attacker == a.key && m.defender == d.key)
            .map_or(Fixed::ONE, |m| m.multiplier)
    }

    /// Color for the player at `index` in join order, cycling if the table is
    /// shorter than the roster.
    #[must_use]
    pub fn player_color(&self, index: usize) -> String {
        if self.player_colors.is_empty() {
            return "#ffffff".to_string();
        }
        self.player_colors[index % self.player_colors.len()].clone()
    }

    /// Check referential integrity.
    ///
    /// Checks for:
    /// - Unique unit and building keys
    /// - Trained units, matchups and starting units referencing known units
    /// - A known headquarters building
    /// - Positive timings, speeds and footprints
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidRuleset(errors))
        }
    }

    /// Every integrity problem found, in table order.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (i, unit) in self.units.iter().enumerate() {
            if self.units[..i].iter().any(|u| u.key == unit.key) {
                errors.push(format!("Duplicate unit key '{}'", unit.key));
            }
            if unit.train_time <= Fixed::ZERO {
                errors.push(format!("Unit '{}' has non-positive train_time", unit.key));
            }
            if unit.hp <= Fixed::ZERO {
                errors.push(format!("Unit '{}' has non-positive hp", unit.key));
            }
            if unit.attack > Fixed::ZERO && unit.attack_speed <= Fixed::ZERO {
                errors.push(format!("Unit '{}' attacks but has no attack_speed", unit.key));
            }
        }

        for (i, building) in self.buildings.iter().enumerate() {
            if self.buildings[..i].iter().any(|b| b.key == building.key) {
                errors.push(format!("Duplicate building key '{}'", building.key));
            }
            if building.footprint == 0 {
                errors.push(format!("Building '{}' has zero footprint", building.key));
            }
            if building.build_time < Fixed::ZERO {
                errors.push(format!("Building '{}' has negative build_time", building.key));
            }
            if building.hp <= Fixed::ZERO {
                errors.push(format!("Building '{}' has non-positive hp", building.key));
            }
            if let Some(attack) = &building.attack {
                if attack.attack_speed <= Fixed::ZERO {
                    errors.push(format!("Building '{}' attacks but has no attack_speed", building.key));
                }
            }
            for unit_key in &building.trains {
                if self.unit_id(unit_key).is_none() {
                    errors.push(format!(
                        "Building '{}' trains unknown unit '{}'",
                        building.key, unit_key
                    ));
                }
            }
        }

        for matchup in &self.matchups {
            for key in [&matchup.attacker, &matchup.defender] {
                if self.unit_id(key).is_none() {
                    errors.push(format!("Matchup references unknown unit '{key}'"));
                }
            }
        }

        if self.building_id(&self.headquarters).is_none() {
            errors.push(format!("Unknown headquarters building '{}'", self.headquarters));
        }

        for start in &self.starting_units {
            if self.unit_id(&start.unit).is_none() {
                errors.push(format!("Starting unit '{}' is unknown", start.unit));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_ruleset_is_valid() {
        let ruleset = Ruleset::standard();
        assert!(ruleset.validation_errors().is_empty());
    }

    #[test]
    fn test_matchup_lookup() {
        let ruleset = Ruleset::standard();
        let archer = ruleset.unit_id("ARCHER").unwrap();
        let infantry = ruleset.unit_id("INFANTRY").unwrap();
        let builder = ruleset.unit_id("BUILDER").unwrap();
        assert_eq!(ruleset.matchup(archer, infantry), Fixed::from_num(1.5));
        assert_eq!(ruleset.matchup(infantry, archer), Fixed::from_num(0.75));
        assert_eq!(ruleset.matchup(builder, archer), Fixed::ONE);
    }

    #[test]
    fn test_validation_catches_dangling_references() {
        let mut ruleset = Ruleset::standard();
        ruleset.buildings[0].trains.push("DRAGON".to_string());
        ruleset.headquarters = "CASTLE".to_string();
        let errors = ruleset.validation_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("DRAGON"));
        assert!(errors[1].contains("CASTLE"));
    }

    #[test]
    fn test_ron_round_trip_preserves_ruleset() {
        let ruleset = Ruleset::standard();
        let text = ron::ser::to_string_pretty(&ruleset, ron::ser::PrettyConfig::default()).unwrap();
        let parsed = Ruleset::from_ron_str(&text).unwrap();
        assert_eq!(parsed.units.len(), ruleset.units.len());
        assert_eq!(parsed.building_id("TOWER"), ruleset.building_id("TOWER"));
        assert_eq!(parsed.starting_resources, ruleset.starting_resources);
    }

    #[test]
    fn test_from_ron_str_reports_parse_errors() {
        let err = Ruleset::from_ron_str("Ruleset(units: [").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }

    #[test]
    fn test_player_color_cycles() {
        let ruleset = Ruleset::standard();
        assert_eq!(ruleset.player_color(0), ruleset.player_color(8));
    }
}
