//! Per-player update packets.
//!
//! Wire shapes use `f64` numbers and camelCase field names; the simulation
//! itself never sees them. A packet carries:
//!
//! - the receiver's own player record, when it changed this tick
//! - every unit whose position lies on a cell the receiver currently sees
//! - every building whose center the receiver currently sees, plus the
//!   receiver's own buildings
//! - the receiver's visibility delta
//! - events located on visible cells, and all death events
//!
//! Packets with none of the above are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Building, PlayerId, Unit};
use crate::data::{Ruleset, TerrainInfo, TerrainKind};
use crate::economy::Resources;
use crate::events::{DirtySet, GameEvent, SfxKind};
use crate::math::Vec2Fixed;
use crate::player::{Player, Population};
use crate::simulation::{Simulation, TICK_RATE};
use crate::visibility::{CellChange, FogOfWar};

/// A point on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointDto {
    /// X in cells.
    pub x: f64,
    /// Y in cells.
    pub y: f64,
}

impl From<Vec2Fixed> for PointDto {
    fn from(v: Vec2Fixed) -> Self {
        let (x, y) = v.to_f64();
        Self { x, y }
    }
}

/// The receiver's own economy record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateDto {
    /// Player id.
    pub id: u64,
    /// Stockpile.
    pub resources: Resources,
    /// Population counters.
    pub population: Population,
}

impl From<&Player> for PlayerStateDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.0,
            resources: player.resources,
            population: player.population,
        }
    }
}

/// A unit as clients see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDto {
    /// Unit id.
    pub id: u64,
    /// Owner id.
    pub owner_id: u64,
    /// Unit type key.
    #[serde(rename = "type")]
    pub kind: String,
    /// Position x.
    pub x: f64,
    /// Position y.
    pub y: f64,
    /// Current hit points.
    pub hp: f64,
    /// Full hit points.
    pub max_hp: f64,
    /// Where the unit is walking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_target: Option<PointDto>,
    /// What the unit is attacking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<u64>,
}

/// One queued unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingItemDto {
    /// Unit type key.
    pub unit_type: String,
    /// Completion fraction.
    pub progress: f64,
}

/// A building as clients see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingDto {
    /// Building id.
    pub id: u64,
    /// Owner id.
    pub owner_id: u64,
    /// Building type key.
    #[serde(rename = "type")]
    pub kind: String,
    /// Top-left cell x.
    pub x: i32,
    /// Top-left cell y.
    pub y: i32,
    /// Current hit points.
    pub hp: f64,
    /// Full hit points.
    pub max_hp: f64,
    /// Construction fraction.
    pub build_progress: f64,
    /// Queued units, head first.
    pub training_queue: Vec<TrainingItemDto>,
    /// Spawn point for trained units.
    pub rally_point: PointDto,
}

/// One changed fog cell; `state` is 0 hidden, 1 explored, 2 visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDto {
    /// Cell x.
    pub x: u32,
    /// Cell y.
    pub y: u32,
    /// New state.
    pub state: u8,
}

impl From<CellChange> for CellDto {
    fn from(change: CellChange) -> Self {
        Self {
            x: change.x,
            y: change.y,
            state: change.state as u8,
        }
    }
}

/// Wire form of [`GameEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDto {
    /// Sound cue.
    Sfx {
        /// Which sound.
        sound: SfxKind,
        /// Where.
        pos: PointDto,
    },
    /// Hit effect.
    AttackEffect {
        /// Attacker center.
        from: PointDto,
        /// Target center.
        to: PointDto,
        /// Attacker type key.
        attacker: String,
    },
    /// Removed units.
    UnitsDied {
        /// Unit ids.
        ids: Vec<u64>,
    },
    /// Removed buildings.
    BuildingsDestroyed {
        /// Building ids.
        ids: Vec<u64>,
    },
}

impl From<&GameEvent> for EventDto {
    fn from(event: &GameEvent) -> Self {
        match event {
            GameEvent::Sfx { sound, pos } => Self::Sfx {
                sound: *sound,
                pos: (*pos).into(),
            },
            GameEvent::AttackEffect { from, to, attacker } => Self::AttackEffect {
                from: (*from).into(),
                to: (*to).into(),
                attacker: attacker.clone(),
            },
            GameEvent::UnitsDied { ids } => Self::UnitsDied {
                ids: ids.iter().map(|id| id.0).collect(),
            },
            GameEvent::BuildingsDestroyed { ids } => Self::BuildingsDestroyed {
                ids: ids.iter().map(|id| id.0).collect(),
            },
        }
    }
}

/// The per-tick message for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePacket {
    /// Tick this packet describes.
    pub tick: u64,
    /// Own record, if it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerStateDto>,
    /// Units in sight.
    pub units: Vec<UnitDto>,
    /// Buildings in sight.
    pub buildings: Vec<BuildingDto>,
    /// Changed fog cells.
    pub visibility: Vec<CellDto>,
    /// Delivered events.
    pub events: Vec<EventDto>,
}

impl UpdatePacket {
    /// Whether there is nothing worth sending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.player.is_none()
            && self.units.is_empty()
            && self.buildings.is_empty()
            && self.visibility.is_empty()
            && self.events.is_empty()
    }
}

fn unit_dto(unit: &Unit, ruleset: &Ruleset) -> UnitDto {
    UnitDto {
        id: unit.id.0,
        owner_id: unit.owner.0,
        kind: ruleset.unit(unit.kind).map(|d| d.key.clone()).unwrap_or_default(),
        x: unit.position.x.to_num(),
        y: unit.position.y.to_num(),
        hp: unit.hp.to_num(),
        max_hp: unit.max_hp.to_num(),
        move_target: unit.move_target.map(PointDto::from),
        target_id: unit.target.map(|t| t.raw()),
    }
}

fn building_dto(building: &Building, ruleset: &Ruleset) -> BuildingDto {
    BuildingDto {
        id: building.id.0,
        owner_id: building.owner.0,
        kind: ruleset.building(building.kind).map(|d| d.key.clone()).unwrap_or_default(),
        x: building.x,
        y: building.y,
        hp: building.hp.to_num(),
        max_hp: building.max_hp.to_num(),
        build_progress: building.build_progress.to_num(),
        training_queue: building
            .training_queue
            .iter()
            .map(|item| TrainingItemDto {
                unit_type: ruleset.unit(item.unit).map(|d| d.key.clone()).unwrap_or_default(),
                progress: item.progress.to_num(),
            })
            .collect(),
        rally_point: building.rally_point.into(),
    }
}

fn encode_for(sim: &Simulation, dirty: &DirtySet, player: PlayerId, fog: &FogOfWar) -> UpdatePacket {
    let world = sim.world();
    let ruleset = sim.ruleset();

    let own = dirty
        .players
        .contains(&player)
        .then(|| world.players.get(&player))
        .flatten()
        .map(PlayerStateDto::from);

    let units = world
        .units
        .values()
        .filter(|u| fog.is_visible(u.position))
        .map(|u| unit_dto(u, ruleset))
        .collect();

    let buildings = world
        .buildings
        .values()
        .filter(|b| {
            b.owner == player
                || ruleset
                    .building(b.kind)
                    .is_some_and(|data| fog.is_visible(b.center(data.footprint)))
        })
        .map(|b| building_dto(b, ruleset))
        .collect();

    let visibility = dirty
        .visibility
        .get(&player)
        .map(|cells| cells.iter().copied().map(CellDto::from).collect())
        .unwrap_or_default();

    let events = dirty
        .events
        .iter()
        .filter(|e| e.location().map_or(true, |pos| fog.is_visible(pos)))
        .map(EventDto::from)
        .collect();

    UpdatePacket {
        tick: sim.current_tick(),
        player: own,
        units,
        buildings,
        visibility,
        events,
    }
}

/// Build the filtered update for every player after a tick.
///
/// Players whose packet would be empty are left out of the map.
#[must_use]
pub fn encode_updates(sim: &Simulation, dirty: &DirtySet) -> BTreeMap<PlayerId, UpdatePacket> {
    let mut packets = BTreeMap::new();
    for &player in sim.world().players.keys() {
        let Some(fog) = sim.visibility().fog(player) else {
            continue;
        };
        let packet = encode_for(sim, dirty, player, fog);
        if !packet.is_empty() {
            packets.insert(player, packet);
        }
    }
    packets
}

// ============================================================================
// Game start
// ============================================================================

/// Fixed constants and balance data clients need to render and predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfigDto {
    /// Board side length.
    pub grid_size: u32,
    /// Ticks per second.
    pub tick_rate: u32,
    /// Terrain table.
    pub terrain: Vec<TerrainInfo>,
    /// Units, buildings, techs and matchups.
    pub ruleset: Ruleset,
}

/// Public metadata for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMetaDto {
    /// Player id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Base anchor.
    pub start_pos: PointDto,
}

/// Payload of `gameStarted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPacket {
    /// Room code.
    pub game_code: String,
    /// The receiving player.
    pub player_id: u64,
    /// Constants and balance data.
    pub config: GameConfigDto,
    /// Terrain rows, `board[y][x]`.
    pub board: Vec<Vec<TerrainKind>>,
    /// Every participant in join order.
    pub players: Vec<PlayerMetaDto>,
    /// The receiver's starting record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own: Option<PlayerStateDto>,
}

/// Build the `gameStarted` payload for `viewer`.
#[must_use]
pub fn initial_packet(sim: &Simulation, game_code: &str, viewer: PlayerId) -> InitialPacket {
    let world = sim.world();
    InitialPacket {
        game_code: game_code.to_string(),
        player_id: viewer.0,
        config: GameConfigDto {
            grid_size: world.board.size(),
            tick_rate: TICK_RATE,
            terrain: TerrainKind::ALL.iter().copied().map(TerrainInfo::from).collect(),
            ruleset: sim.ruleset().clone(),
        },
        board: world.board.rows(),
        players: world
            .players_in_join_order()
            .map(|p| PlayerMetaDto {
                id: p.id.0,
                name: p.name.clone(),
                color: p.color.clone(),
                start_pos: p.start_pos.into(),
            })
            .collect(),
        own: world.players.get(&viewer).map(PlayerStateDto::from),
    }
}
