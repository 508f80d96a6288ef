//! Resource accounting.
//!
//! Five stockpiled resources. Costs, production tables and player
//! stockpiles all share the [`Resources`] bundle so affordability and
//! deduction are one comparison per kind.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};

/// One of the stockpiled resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Gold, from mines.
    Gold,
    /// Food, from farms; consumed by unit upkeep.
    Food,
    /// Wood, from sawmills.
    Wood,
    /// Stone, from mines.
    Stone,
    /// Science, from universities.
    Science,
}

impl ResourceKind {
    /// All resource kinds in a stable order.
    pub const ALL: [Self; 5] = [Self::Gold, Self::Food, Self::Wood, Self::Stone, Self::Science];
}

/// An amount of each resource.
///
/// Used for stockpiles, costs and per-second production rates. Missing
/// fields deserialize as zero so cost tables list only what they charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resources {
    /// Gold.
    #[serde(default, with = "fixed_decimal")]
    pub gold: Fixed,
    /// Food.
    #[serde(default, with = "fixed_decimal")]
    pub food: Fixed,
    /// Wood.
    #[serde(default, with = "fixed_decimal")]
    pub wood: Fixed,
    /// Stone.
    #[serde(default, with = "fixed_decimal")]
    pub stone: Fixed,
    /// Science.
    #[serde(default, with = "fixed_decimal")]
    pub science: Fixed,
}

impl Resources {
    /// Empty bundle.
    pub const ZERO: Self = Self {
        gold: Fixed::ZERO,
        food: Fixed::ZERO,
        wood: Fixed::ZERO,
        stone: Fixed::ZERO,
        science: Fixed::ZERO,
    };

    /// Build a bundle from whole-number amounts.
    #[must_use]
    pub fn whole(gold: i32, food: i32, wood: i32, stone: i32, science: i32) -> Self {
        Self {
            gold: Fixed::from_num(gold),
            food: Fixed::from_num(food),
            wood: Fixed::from_num(wood),
            stone: Fixed::from_num(stone),
            science: Fixed::from_num(science),
        }
    }

    /// Amount of one resource.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> Fixed {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Science => self.science,
        }
    }

    /// Mutable access to one resource.
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Fixed {
        match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Food => &mut self.food,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Science => &mut self.science,
        }
    }

    /// Whether every resource covers the matching entry in `cost`.
    #[must_use]
    pub fn can_afford(&self, cost: &Self) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|&kind| self.get(kind) >= cost.get(kind))
    }

    /// Deduct `cost` if affordable. Returns `false` and leaves the stockpile
    /// untouched otherwise.
    pub fn try_spend(&mut self, cost: &Self) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) -= cost.get(kind);
        }
        true
    }

    /// Add `other` scaled by `factor` to every resource.
    pub fn add_scaled(&mut self, other: &Self, factor: Fixed) {
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) += other.get(kind) * factor;
        }
    }

    /// Component-wise sum.
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        let mut sum = *self;
        sum.add_scaled(other, Fixed::ONE);
        sum
    }

    /// Sum of all resources, used for cost-derived timings and sanity checks.
    #[must_use]
    pub fn total(&self) -> Fixed {
        ResourceKind::ALL.iter().map(|&kind| self.get(kind)).sum()
    }

    /// Whether every resource is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Apply one tick of income to a stockpile.
///
/// `production` is the summed per-second output of the player's completed
/// buildings and `food_upkeep` the summed per-second food drain of their
/// units. Food is floored at zero; starvation has no further effect.
pub fn apply_income(stockpile: &mut Resources, production: &Resources, food_upkeep: Fixed, delta: Fixed) {
    stockpile.add_scaled(production, delta);
    stockpile.food -= food_upkeep * delta;
    if stockpile.food < Fixed::ZERO {
        stockpile.food = Fixed::ZERO;
    }
}
