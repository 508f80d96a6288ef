//! Pre-game roster for one room.

use avalon_core::components::PlayerId;
use thiserror::Error;

use crate::protocol::{LobbyState, PlayerSummary};

/// Roster operation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    /// No free slot.
    #[error("Lobby is full.")]
    Full,
    /// The player is already in this lobby.
    #[error("Already in this lobby.")]
    AlreadyMember,
    /// Only the host may do this.
    #[error("Only the host can do that.")]
    NotHost,
    /// The host cannot kick themselves.
    #[error("The host cannot be kicked.")]
    CannotKickHost,
    /// The player is not in this lobby.
    #[error("Player {0} is not in this lobby.")]
    NotMember(PlayerId),
}

/// One seated player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyMember {
    /// Player id.
    pub id: PlayerId,
    /// Display name at join time.
    pub name: String,
}

/// Ordered roster with a host.
#[derive(Debug, Clone)]
pub struct Lobby {
    code: String,
    members: Vec<LobbyMember>,
    host: PlayerId,
    is_private: bool,
    capacity: usize,
}

impl Lobby {
    /// A lobby with `host` as its only member.
    #[must_use]
    pub fn new(code: String, host: LobbyMember, is_private: bool, capacity: usize) -> Self {
        Self {
            code,
            host: host.id,
            members: vec![host],
            is_private,
            capacity,
        }
    }

    /// Room code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Current host.
    #[must_use]
    pub fn host(&self) -> PlayerId {
        self.host
    }

    /// Members in join order.
    #[must_use]
    pub fn members(&self) -> &[LobbyMember] {
        &self.members
    }

    /// Whether the lobby is hidden from public matchmaking.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.is_private
    }

    /// Whether `id` is seated here.
    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Whether every slot is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    /// Whether nobody is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Seat a new member.
    pub fn join(&mut self, member: LobbyMember) -> Result<(), LobbyError> {
        if self.contains(member.id) {
            return Err(LobbyError::AlreadyMember);
        }
        if self.is_full() {
            return Err(LobbyError::Full);
        }
        self.members.push(member);
        Ok(())
    }

    /// Remove a member. If the host left, the longest-seated remaining
    /// member becomes host.
    pub fn leave(&mut self, id: PlayerId) -> Option<LobbyMember> {
        let index = self.members.iter().position(|m| m.id == id)?;
        let member = self.members.remove(index);
        if self.host == id {
            if let Some(next) = self.members.first() {
                self.host = next.id;
                tracing::debug!(code = %self.code, host = next.id.0, "host migrated");
            }
        }
        Some(member)
    }

    /// Host removes another member.
    pub fn kick(&mut self, by: PlayerId, target: PlayerId) -> Result<LobbyMember, LobbyError> {
        if by != self.host {
            return Err(LobbyError::NotHost);
        }
        if target == self.host {
            return Err(LobbyError::CannotKickHost);
        }
        self.leave(target).ok_or(LobbyError::NotMember(target))
    }

    /// Rename a member in place.
    pub fn rename(&mut self, id: PlayerId, name: &str) {
        if let Some(member) = self.members.iter_mut().find(|m| m.id == id) {
            member.name = name.to_string();
        }
    }

    /// Wire snapshot.
    #[must_use]
    pub fn state(&self) -> LobbyState {
        LobbyState {
            game_code: self.code.clone(),
            players: self
                .members
                .iter()
                .map(|m| PlayerSummary {
                    id: m.id.0,
                    name: m.name.clone(),
                })
                .collect(),
            host_id: self.host.0,
        }
    }
}
