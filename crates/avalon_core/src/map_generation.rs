//! Procedural board generation and start positions.
//!
//! Generates boards with:
//! - Plains everywhere by default
//! - Forest and mountain discs stamped at random centers
//! - Eight fixed start anchors (inset corners and edge midpoints)
//!
//! Generation is a pure function of [`MapConfig`], so a seed reproduces a
//! board exactly.

use serde::{Deserialize, Serialize};

use crate::board::{Board, GRID_SIZE};
use crate::data::TerrainKind;
use crate::math::{Fixed, Vec2Fixed};

/// Maximum number of players a board has start positions for.
pub const MAX_START_POSITIONS: usize = 8;

/// Distance of corner anchors from the board edge on a standard board.
const START_INSET: u32 = 30;

/// A family of terrain discs stamped onto the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Terrain written inside each disc.
    pub terrain: TerrainKind,
    /// Number of discs.
    pub count: u32,
    /// Smallest disc radius in cells.
    pub min_radius: u32,
    /// Largest disc radius in cells.
    pub max_radius: u32,
}

/// Map configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Board side in cells.
    pub size: u32,
    /// Random seed for deterministic generation.
    pub seed: u64,
    /// Disc families, stamped in order (later families overwrite earlier).
    pub features: Vec<FeatureSpec>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::standard(12345)
    }
}

impl MapConfig {
    /// The standard 250x250 board: 40 forests then 25 mountain ranges.
    #[must_use]
    pub fn standard(seed: u64) -> Self {
        Self {
            size: GRID_SIZE,
            seed,
            features: vec![
                FeatureSpec {
                    terrain: TerrainKind::Forest,
                    count: 40,
                    min_radius: 8,
                    max_radius: 15,
                },
                FeatureSpec {
                    terrain: TerrainKind::Mountain,
                    count: 25,
                    min_radius: 6,
                    max_radius: 12,
                },
            ],
        }
    }

    /// A board of another size with feature counts scaled by area.
    #[must_use]
    pub fn scaled(size: u32, seed: u64) -> Self {
        let mut config = Self::standard(seed);
        let area = u64::from(size) * u64::from(size);
        let standard_area = u64::from(GRID_SIZE) * u64::from(GRID_SIZE);
        for feature in &mut config.features {
            feature.count = (u64::from(feature.count) * area / standard_area) as u32;
        }
        config.size = size;
        config
    }

    /// An open board with no features.
    #[must_use]
    pub fn flat(size: u32) -> Self {
        Self {
            size,
            seed: 0,
            features: Vec::new(),
        }
    }
}

/// Deterministic LCG for map generation.
///
/// Uses the high bits of the state; the low bits of a power-of-two LCG
/// cycle with short periods.
struct MapRng {
    state: u64,
}

impl MapRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(0x5DEE_CE66D).wrapping_add(11);
        self.state
    }

    /// Uniform in `[0, 1)`.
    fn next_unit(&mut self) -> Fixed {
        Fixed::from_bits((self.next() >> 32) as i64)
    }

    /// Uniform in `[min, max)`.
    fn next_range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        min + (max - min) * self.next_unit()
    }
}

/// Generate a board with the given configuration.
#[must_use]
pub fn generate_board(config: &MapConfig) -> Board {
    let mut rng = MapRng::new(config.seed);
    let mut board = Board::filled(config.size, TerrainKind::Plains);
    let size = Fixed::from_num(config.size);

    for feature in &config.features {
        for _ in 0..feature.count {
            let cx = rng.next_range(Fixed::ZERO, size);
            let cy = rng.next_range(Fixed::ZERO, size);
            let radius = rng.next_range(
                Fixed::from_num(feature.min_radius),
                Fixed::from_num(feature.max_radius),
            );
            stamp_disc(&mut board, Vec2Fixed::new(cx, cy), radius, feature.terrain);
        }
    }

    board
}

/// Write `terrain` to every cell whose corner lies strictly inside the disc.
fn stamp_disc(board: &mut Board, center: Vec2Fixed, radius: Fixed, terrain: TerrainKind) {
    let limit = board.size() as i32;
    let min_x = (center.x - radius).floor().to_num::<i32>().max(0);
    let max_x = (center.x + radius).ceil().to_num::<i32>().min(limit);
    let min_y = (center.y - radius).floor().to_num::<i32>().max(0);
    let max_y = (center.y + radius).ceil().to_num::<i32>().min(limit);
    let radius_sq = radius * radius;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let cell = Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y));
            if cell.distance_squared(center) < radius_sq {
                board.set(x, y, terrain);
            }
        }
    }
}

/// The eight start anchors for a board of `size` cells, in assignment order.
///
/// Corners are inset by 30 cells on a standard board; smaller boards scale
/// the inset so anchors stay on the map.
#[must_use]
pub fn start_positions(size: u32) -> [Vec2Fixed; MAX_START_POSITIONS] {
    let inset = if size >= GRID_SIZE {
        START_INSET
    } else {
        (size * START_INSET / GRID_SIZE).max(1)
    };
    let near = Fixed::from_num(inset);
    let far = Fixed::from_num(size.saturating_sub(inset));
    let mid = Fixed::from_num(size) / Fixed::from_num(2);
    let p = Vec2Fixed::new;

    [
        p(near, near),
        p(far, near),
        p(far, far),
        p(near, far),
        p(near, mid),
        p(far, mid),
        p(mid, near),
        p(mid, far),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let config = MapConfig::standard(42);
        assert_eq!(generate_board(&config), generate_board(&config));
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_board(&MapConfig::standard(1));
        let b = generate_board(&MapConfig::standard(2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_standard_board_has_all_terrain() {
        let board = generate_board(&MapConfig::standard(7));
        assert_eq!(board.size(), GRID_SIZE);
        for terrain in TerrainKind::ALL {
            assert!(board.count(terrain) > 0, "{terrain:?} missing");
        }
    }

    #[test]
    fn test_flat_board_is_all_plains() {
        let board = generate_board(&MapConfig::flat(32));
        assert_eq!(board.count(TerrainKind::Plains), 32 * 32);
    }

    #[test]
    fn test_scaled_counts() {
        let config = MapConfig::scaled(125, 0);
        assert_eq!(config.features[0].count, 10);
        assert_eq!(config.features[1].count, 6);
    }

    #[test]
    fn test_standard_start_positions() {
        let positions = start_positions(GRID_SIZE);
        assert_eq!(positions[0], Vec2Fixed::new(Fixed::from_num(30), Fixed::from_num(30)));
        assert_eq!(positions[2], Vec2Fixed::new(Fixed::from_num(220), Fixed::from_num(220)));
        assert_eq!(positions[7], Vec2Fixed::new(Fixed::from_num(125), Fixed::from_num(220)));
    }

    #[test]
    fn test_small_board_start_positions_on_map() {
        let positions = start_positions(40);
        for pos in positions {
            assert!(pos.x >= Fixed::ZERO && pos.x < Fixed::from_num(40));
            assert!(pos.y >= Fixed::ZERO && pos.y < Fixed::from_num(40));
        }
    }
}
