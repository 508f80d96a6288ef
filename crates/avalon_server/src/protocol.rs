//! JSON wire protocol.
//!
//! Every WebSocket text frame is one envelope `{"event": ..., "data": ...}`.
//! Player actions nest a second envelope `{"type": ..., "payload": ...}`.
//!
//! ```json
//! {"event":"playerAction","data":{"type":"MOVE_UNITS","payload":{"unitIds":[4,5],"target":{"x":10.5,"y":3}}}}
//! ```

use avalon_core::commands::Command;
use avalon_core::components::{BuildingId, UnitId};
use avalon_core::math::Vec2Fixed;
use avalon_core::replication::{InitialPacket, PointDto, UpdatePacket};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire decoding failures.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Not valid JSON, or not a known message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A coordinate does not fit the simulation's number format.
    #[error("coordinate out of range: ({x}, {y})")]
    BadCoordinate {
        /// Sent x.
        x: f64,
        /// Sent y.
        y: f64,
    },
}

/// Options for `createLobby`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateLobbyOptions {
    /// Hidden from `findPublicLobby`.
    pub is_private: bool,
    /// Start immediately with only the creator.
    pub is_solo: bool,
}

/// A grid cell on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPos {
    /// Cell x.
    pub x: i32,
    /// Cell y.
    pub y: i32,
}

/// In-game intents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerAction {
    /// Walk units to a point.
    #[serde(rename_all = "camelCase")]
    MoveUnits {
        /// Units to move.
        unit_ids: Vec<u64>,
        /// Destination.
        target: PointDto,
    },
    /// Attack a unit or building.
    #[serde(rename_all = "camelCase")]
    AttackTarget {
        /// Attackers.
        unit_ids: Vec<u64>,
        /// Victim id.
        target_id: u64,
    },
    /// Place a structure.
    #[serde(rename_all = "camelCase")]
    BuildStructure {
        /// Builder unit.
        builder_id: u64,
        /// Building type key.
        structure_type: String,
        /// Top-left cell.
        position: CellPos,
    },
    /// Queue a unit.
    #[serde(rename_all = "camelCase")]
    TrainUnit {
        /// Training building.
        building_id: u64,
        /// Unit type key.
        unit_type: String,
    },
}

impl PlayerAction {
    /// Convert to a simulation command.
    pub fn into_command(self) -> Result<Command, ProtocolError> {
        Ok(match self {
            Self::MoveUnits { unit_ids, target } => Command::MoveUnits {
                unit_ids: unit_ids.into_iter().map(UnitId).collect(),
                target: Vec2Fixed::from_f64(target.x, target.y).ok_or(ProtocolError::BadCoordinate {
                    x: target.x,
                    y: target.y,
                })?,
            },
            Self::AttackTarget { unit_ids, target_id } => Command::AttackTarget {
                unit_ids: unit_ids.into_iter().map(UnitId).collect(),
                target: target_id,
            },
            Self::BuildStructure {
                builder_id,
                structure_type,
                position,
            } => Command::BuildStructure {
                builder: UnitId(builder_id),
                structure: structure_type,
                x: position.x,
                y: position.y,
            },
            Self::TrainUnit { building_id, unit_type } => Command::TrainUnit {
                building: BuildingId(building_id),
                unit: unit_type,
            },
        })
    }
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Change display name.
    SetPlayerName(String),
    /// Open a new room.
    CreateLobby(CreateLobbyOptions),
    /// Join a room by code.
    JoinLobby(String),
    /// Join any open public room, or open one.
    FindPublicLobby,
    /// Host starts the game.
    StartGame(String),
    /// In-game intent.
    PlayerAction(PlayerAction),
    /// Host removes a player from the lobby.
    KickPlayer(u64),
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Player id.
    pub id: u64,
    /// Display name.
    pub name: String,
}

/// Payload of `lobbyJoined` and `lobbyUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyState {
    /// Room code.
    pub game_code: String,
    /// Members in join order.
    pub players: Vec<PlayerSummary>,
    /// Current host.
    pub host_id: u64,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// You entered a lobby.
    LobbyJoined(LobbyState),
    /// The lobby roster changed.
    LobbyUpdate(LobbyState),
    /// The game began.
    GameStarted(Box<InitialPacket>),
    /// Per-tick filtered update.
    GameStateUpdate(UpdatePacket),
    /// The game was torn down.
    GameOver {
        /// Why.
        reason: String,
    },
    /// The host removed you.
    Kicked {
        /// Why.
        reason: String,
    },
    /// A request failed.
    GameError {
        /// What went wrong.
        message: String,
    },
}

impl ServerMessage {
    /// Shorthand for [`ServerMessage::GameError`].
    pub fn error(message: impl Into<String>) -> Self {
        Self::GameError {
            message: message.into(),
        }
    }

    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<ClientMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}
