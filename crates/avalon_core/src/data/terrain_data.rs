//! Terrain kinds and their static properties.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Terrain of a single board cell.
///
/// Fixed for the lifetime of a game once the board is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerrainKind {
    /// Open ground.
    #[default]
    Plains,
    /// Woodland, slows movement.
    Forest,
    /// Highlands, slows movement the most.
    Mountain,
}

impl TerrainKind {
    /// All terrain kinds in a stable order.
    pub const ALL: [Self; 3] = [Self::Plains, Self::Forest, Self::Mountain];

    /// Movement cost multiplier for a unit standing on this terrain.
    #[must_use]
    pub fn movement_cost(self) -> Fixed {
        match self {
            Self::Plains => Fixed::ONE,
            Self::Forest => Fixed::from_num(1.5),
            Self::Mountain => Fixed::from_num(2.5),
        }
    }

    /// Speed multiplier, the reciprocal of [`Self::movement_cost`].
    #[must_use]
    pub fn speed_modifier(self) -> Fixed {
        Fixed::ONE / self.movement_cost()
    }

    /// Whether structures may be placed on this terrain at all.
    #[must_use]
    pub const fn buildable(self) -> bool {
        match self {
            Self::Plains | Self::Forest | Self::Mountain => true,
        }
    }

    /// Display name shown by clients.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Plains => "Plains",
            Self::Forest => "Forest",
            Self::Mountain => "Mountains",
        }
    }

    /// Map color used by clients.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Plains => "#a5d6a7",
            Self::Forest => "#388e3c",
            Self::Mountain => "#795548",
        }
    }
}

/// Terrain properties in the shape clients consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainInfo {
    /// Terrain this entry describes.
    pub kind: TerrainKind,
    /// Display name.
    pub name: String,
    /// Movement cost multiplier.
    pub movement_cost: f64,
    /// Whether structures may be placed here.
    pub buildable: bool,
    /// Map color.
    pub color: String,
}

impl From<TerrainKind> for TerrainInfo {
    fn from(kind: TerrainKind) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            movement_cost: kind.movement_cost().to_num(),
            buildable: kind.buildable(),
            color: kind.color().to_string(),
        }
    }
}
