//! Per-player fog of war.
//!
//! Each player owns one [`FogOfWar`] bitmap. A recompute pass first demotes
//! every VISIBLE cell to EXPLORED, then reveals a disc around every owned
//! unit and completed building. Only cells whose state differs from the
//! start of the pass are reported, so a client receives a delta rather than
//! the whole map.
//!
//! Bitmaps are private to this module; the rest of the crate reads them
//! through [`FogOfWar::get`] and [`FogOfWar::is_visible`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::PlayerId;
use crate::data::Ruleset;
use crate::math::{Fixed, Vec2Fixed};
use crate::world::World;

/// Visibility state of one cell for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Visibility {
    /// Never seen.
    #[default]
    Hidden = 0,
    /// Seen before, not currently in sight.
    Explored = 1,
    /// Currently in sight.
    Visible = 2,
}

/// One cell whose state changed during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellChange {
    /// Cell x.
    pub x: u32,
    /// Cell y.
    pub y: u32,
    /// State at the end of the pass.
    pub state: Visibility,
}

/// Visibility bitmap for a single player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogOfWar {
    size: u32,
    cells: Vec<Visibility>,
    /// Indices of cells currently VISIBLE, in reveal order.
    visible: Vec<u32>,
    /// Scratch: cells that were VISIBLE when the running pass began.
    #[serde(skip)]
    was_visible: Vec<bool>,
}

impl FogOfWar {
    /// A fully hidden bitmap for a `size` x `size` board.
    #[must_use]
    pub fn new(size: u32) -> Self {
        let len = (size as usize) * (size as usize);
        Self {
            size,
            cells: vec![Visibility::Hidden; len],
            visible: Vec::new(),
            was_visible: vec![false; len],
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let in_bounds = x >= 0 && y >= 0 && (x as u32) < self.size && (y as u32) < self.size;
        in_bounds.then(|| (y as usize) * (self.size as usize) + x as usize)
    }

    /// State of cell `(x, y)`. Off-board cells are hidden.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Visibility {
        self.index(x, y)
            .map_or(Visibility::Hidden, |i| self.cells[i])
    }

    /// Whether the cell containing `pos` is currently VISIBLE.
    #[must_use]
    pub fn is_visible(&self, pos: Vec2Fixed) -> bool {
        let (x, y) = pos.cell();
        self.get(x, y) == Visibility::Visible
    }

    /// Number of cells in the given state.
    #[must_use]
    pub fn count(&self, state: Visibility) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    /// Demote every VISIBLE cell to EXPLORED and remember which they were.
    fn begin_pass(&mut self) -> Vec<u32> {
        if self.was_visible.len() != self.cells.len() {
            self.was_visible = vec![false; self.cells.len()];
        }
        let previous = std::mem::take(&mut self.visible);
        for &i in &previous {
            self.cells[i as usize] = Visibility::Explored;
            self.was_visible[i as usize] = true;
        }
        previous
    }

    /// Mark every cell within `radius` of `center` VISIBLE.
    ///
    /// A cell is inside when its integer corner lies within the radius.
    fn reveal(&mut self, center: Vec2Fixed, radius: Fixed) {
        if radius < Fixed::ZERO || self.size == 0 {
            return;
        }
        let last = self.size as i32 - 1;
        let start_x = (center.x - radius).floor().to_num::<i32>().max(0);
        let end_x = (center.x + radius).floor().to_num::<i32>().min(last);
        let start_y = (center.y - radius).floor().to_num::<i32>().max(0);
        let end_y = (center.y + radius).floor().to_num::<i32>().min(last);
        let radius_sq = radius * radius;

        for iy in start_y..=end_y {
            for ix in start_x..=end_x {
                let corner = Vec2Fixed::new(Fixed::from_num(ix), Fixed::from_num(iy));
                if corner.distance_squared(center) > radius_sq {
                    continue;
                }
                let Some(i) = self.index(ix, iy) else {
                    continue;
                };
                if self.cells[i] != Visibility::Visible {
                    self.cells[i] = Visibility::Visible;
                    self.visible.push(i as u32);
                }
            }
        }
    }

    /// Collect cells whose state changed since [`Self::begin_pass`].
    fn finish_pass(&mut self, previous: &[u32]) -> Vec<CellChange> {
        let mut changes = Vec::new();
        for &i in &self.visible {
            if !self.was_visible[i as usize] {
                changes.push(self.change_at(i));
            }
        }
        for &i in previous {
            if self.cells[i as usize] == Visibility::Explored {
                changes.push(self.change_at(i));
            }
            self.was_visible[i as usize] = false;
        }
        changes
    }

    fn change_at(&self, i: u32) -> CellChange {
        let size = self.size;
        CellChange {
            x: i % size,
            y: i / size,
            state: self.cells[i as usize],
        }
    }

    /// Run a full pass over the given sight discs.
    pub fn recompute(&mut self, sights: impl IntoIterator<Item = (Vec2Fixed, Fixed)>) -> Vec<CellChange> {
        let previous = self.begin_pass();
        for (center, radius) in sights {
            self.reveal(center, radius);
        }
        self.finish_pass(&previous)
    }
}

/// Fog-of-war bitmaps for every player in a game.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibilityEngine {
    fogs: BTreeMap<PlayerId, FogOfWar>,
}

impl VisibilityEngine {
    /// Hidden bitmaps for `players` on a `size` x `size` board.
    #[must_use]
    pub fn new(players: impl IntoIterator<Item = PlayerId>, size: u32) -> Self {
        Self {
            fogs: players
                .into_iter()
                .map(|id| (id, FogOfWar::new(size)))
                .collect(),
        }
    }

    /// The bitmap of one player.
    #[must_use]
    pub fn fog(&self, player: PlayerId) -> Option<&FogOfWar> {
        self.fogs.get(&player)
    }

    /// Recompute every player's sight from the current world.
    ///
    /// Returns the changed cells per player; players without changes are
    /// omitted.
    pub fn recompute(&mut self, world: &World, ruleset: &Ruleset) -> BTreeMap<PlayerId, Vec<CellChange>> {
        let mut deltas = BTreeMap::new();
        for (&player, fog) in &mut self.fogs {
            let units = world.units_of(player).filter_map(|u| {
                ruleset.unit(u.kind).map(|data| (u.position, data.vision))
            });
            let buildings = world
                .buildings_of(player)
                .filter(|b| b.is_complete())
                .filter_map(|b| {
                    ruleset
                        .building(b.kind)
                        .map(|data| (b.center(data.footprint), data.vision))
                });
            let changes = fog.recompute(units.chain(buildings));
            if !changes.is_empty() {
                deltas.insert(player, changes);
            }
        }
        deltas
    }
}
