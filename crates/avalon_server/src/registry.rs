//! Sessions, rooms and their lifecycle.
//!
//! [`GameRegistry`] is plain synchronous state. Every operation returns an
//! [`Outbox`] of messages for the transport to deliver; nothing in here
//! touches a socket, so the whole lobby flow is testable without a network.
//!
//! Room lifecycle: `Lobby -> Running -> Ended`. A room is deleted when its
//! last member leaves or when a running game ends.

use std::collections::BTreeMap;

use avalon_core::components::PlayerId;
use avalon_core::data::Ruleset;
use avalon_core::map_generation::{generate_board, MapConfig};
use avalon_core::math::Fixed;
use avalon_core::replication::initial_packet;
use avalon_core::simulation::{PlayerSetup, Simulation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ServerConfig;
use crate::lobby::{Lobby, LobbyMember};
use crate::protocol::{ClientMessage, CreateLobbyOptions, PlayerAction, ServerMessage};

/// Messages to deliver, in order.
pub type Outbox = Vec<(PlayerId, ServerMessage)>;

/// Length of a room code.
pub const CODE_LEN: usize = 5;

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 20;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Lifecycle state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Gathering players.
    Lobby,
    /// Simulation ticking.
    Running,
    /// Torn down; about to be removed.
    Ended,
}

/// One room: a roster and, once started, a game.
#[derive(Debug)]
pub struct GameRoom {
    lobby: Lobby,
    phase: GamePhase,
    simulation: Option<Simulation>,
}

impl GameRoom {
    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// The roster.
    #[must_use]
    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    /// The running game, if started.
    #[must_use]
    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }
}

/// A connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Code of the room the player is in.
    pub room: Option<String>,
}

/// Every session and room on this server.
#[derive(Debug)]
pub struct GameRegistry {
    config: ServerConfig,
    ruleset: Ruleset,
    rooms: BTreeMap<String, GameRoom>,
    sessions: BTreeMap<PlayerId, Session>,
    next_player: u64,
    rng: StdRng,
}

fn to_members(lobby: &Lobby, message: &ServerMessage, except: Option<PlayerId>) -> Outbox {
    lobby
        .members()
        .iter()
        .filter(|m| Some(m.id) != except)
        .map(|m| (m.id, message.clone()))
        .collect()
}

impl GameRegistry {
    /// An empty registry. `seed` drives room codes, default names and map
    /// seeds.
    #[must_use]
    pub fn new(config: ServerConfig, ruleset: Ruleset, seed: u64) -> Self {
        Self {
            config,
            ruleset,
            rooms: BTreeMap::new(),
            sessions: BTreeMap::new(),
            next_player: 1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A room by code.
    #[must_use]
    pub fn room(&self, code: &str) -> Option<&GameRoom> {
        self.rooms.get(code)
    }

    /// A session by player id.
    #[must_use]
    pub fn session(&self, player: PlayerId) -> Option<&Session> {
        self.sessions.get(&player)
    }

    /// Number of open rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Register a new connection.
    pub fn connect(&mut self) -> PlayerId {
        let id = PlayerId(self.next_player);
        self.next_player += 1;
        let name = format!("Knight{}", self.rng.gen_range(0..1000));
        tracing::info!(player = id.0, %name, "player connected");
        self.sessions.insert(id, Session { id, name, room: None });
        id
    }

    /// Drop a connection, leaving its room first.
    pub fn disconnect(&mut self, player: PlayerId) -> Outbox {
        let out = self.leave_room(player);
        if self.sessions.remove(&player).is_some() {
            tracing::info!(player = player.0, "player disconnected");
        }
        out
    }

    /// Handle one inbound message.
    pub fn handle(&mut self, player: PlayerId, message: ClientMessage) -> Outbox {
        if !self.sessions.contains_key(&player) {
            return Vec::new();
        }
        match message {
            ClientMessage::SetPlayerName(name) => self.set_name(player, &name),
            ClientMessage::CreateLobby(options) => self.create_lobby(player, options),
            ClientMessage::JoinLobby(code) => self.join_lobby(player, &code),
            ClientMessage::FindPublicLobby => self.find_public_lobby(player),
            ClientMessage::StartGame(code) => self.start_game(player, &code),
            ClientMessage::PlayerAction(action) => self.player_action(player, action),
            ClientMessage::KickPlayer(target) => self.kick_player(player, PlayerId(target)),
        }
    }

    /// Advance every running game by `delta` seconds.
    pub fn tick_all(&mut self, delta: Fixed) -> Outbox {
        let mut out = Vec::new();
        for room in self.rooms.values_mut().filter(|r| r.phase == GamePhase::Running) {
            let Some(sim) = room.simulation.as_mut() else {
                continue;
            };
            for (player, packet) in sim.step(delta) {
                out.push((player, ServerMessage::GameStateUpdate(packet)));
            }
        }
        out
    }

    fn new_code(&mut self) -> String {
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| char::from(CODE_ALPHABET[self.rng.gen_range(0..CODE_ALPHABET.len())]))
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    fn member(&self, player: PlayerId) -> Option<LobbyMember> {
        self.sessions.get(&player).map(|s| LobbyMember {
            id: s.id,
            name: s.name.clone(),
        })
    }

    fn set_name(&mut self, player: PlayerId, name: &str) -> Outbox {
        let name: String = name.trim().chars().take(MAX_NAME_LEN).collect();
        if name.is_empty() {
            return Vec::new();
        }
        let Some(session) = self.sessions.get_mut(&player) else {
            return Vec::new();
        };
        session.name.clone_from(&name);
        let Some(room) = session.room.as_ref().and_then(|code| self.rooms.get_mut(code)) else {
            return Vec::new();
        };
        if room.phase != GamePhase::Lobby {
            return Vec::new();
        }
        room.lobby.rename(player, &name);
        to_members(&room.lobby, &ServerMessage::LobbyUpdate(room.lobby.state()), None)
    }

    fn create_lobby(&mut self, player: PlayerId, options: CreateLobbyOptions) -> Outbox {
        let mut out = self.leave_room(player);
        let Some(host) = self.member(player) else {
            return out;
        };
        let code = self.new_code();
        let lobby = Lobby::new(code.clone(), host, options.is_private, self.config.max_players);
        tracing::info!(%code, player = player.0, private = options.is_private, solo = options.is_solo, "lobby created");
        let state = lobby.state();
        self.rooms.insert(
            code.clone(),
            GameRoom {
                lobby,
                phase: GamePhase::Lobby,
                simulation: None,
            },
        );
        if let Some(session) = self.sessions.get_mut(&player) {
            session.room = Some(code.clone());
        }

        if options.is_solo {
            out.extend(self.start_game(player, &code));
        } else {
            out.push((player, ServerMessage::LobbyJoined(state)));
        }
        out
    }

    fn join_lobby(&mut self, player: PlayerId, code: &str) -> Outbox {
        let code = code.trim().to_uppercase();
        let Some(room) = self.rooms.get(&code).filter(|r| r.phase == GamePhase::Lobby) else {
            return vec![(
                player,
                ServerMessage::error("Lobby does not exist or the game is already running."),
            )];
        };
        if room.lobby.contains(player) {
            return Vec::new();
        }
        if room.lobby.is_full() {
            return vec![(player, ServerMessage::error("Lobby is full."))];
        }

        let mut out = self.leave_room(player);
        let Some(member) = self.member(player) else {
            return out;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return out;
        };
        if let Err(err) = room.lobby.join(member) {
            out.push((player, ServerMessage::error(err.to_string())));
            return out;
        }
        let state = room.lobby.state();
        out.push((player, ServerMessage::LobbyJoined(state.clone())));
        out.extend(to_members(&room.lobby, &ServerMessage::LobbyUpdate(state), Some(player)));
        if let Some(session) = self.sessions.get_mut(&player) {
            session.room = Some(code.clone());
        }
        tracing::info!(%code, player = player.0, "lobby joined");
        out
    }

    fn find_public_lobby(&mut self, player: PlayerId) -> Outbox {
        let open = self
            .rooms
            .iter()
            .find(|(_, r)| {
                r.phase == GamePhase::Lobby
                    && !r.lobby.is_private()
                    && !r.lobby.is_full()
                    && !r.lobby.contains(player)
            })
            .map(|(code, _)| code.clone());
        match open {
            Some(code) => self.join_lobby(player, &code),
            None => self.create_lobby(player, CreateLobbyOptions::default()),
        }
    }

    fn start_game(&mut self, player: PlayerId, code: &str) -> Outbox {
        let seed = self.config.map_seed.unwrap_or_else(|| self.rng.gen());
        let Some(room) = self.rooms.get_mut(code) else {
            return Vec::new();
        };
        if room.phase != GamePhase::Lobby || room.lobby.host() != player {
            tracing::debug!(%code, player = player.0, "start ignored");
            return Vec::new();
        }

        let setups: Vec<PlayerSetup> = room
            .lobby
            .members()
            .iter()
            .map(|m| PlayerSetup::new(m.id, m.name.clone()))
            .collect();
        let board = generate_board(&MapConfig::scaled(self.config.grid_size, seed));
        let sim = match Simulation::new(self.ruleset.clone(), board, &setups) {
            Ok(sim) => sim,
            Err(err) => {
                tracing::warn!(%code, error = %err, "failed to start game");
                return vec![(player, ServerMessage::error(format!("Could not start the game: {err}")))];
            }
        };

        let out = setups
            .iter()
            .map(|setup| {
                let mut packet = initial_packet(&sim, code, setup.id);
                packet.config.tick_rate = self.config.tick_rate;
                (setup.id, ServerMessage::GameStarted(Box::new(packet)))
            })
            .collect();
        room.phase = GamePhase::Running;
        room.simulation = Some(sim);
        tracing::info!(%code, players = setups.len(), seed, "game started");
        out
    }

    fn kick_player(&mut self, player: PlayerId, target: PlayerId) -> Outbox {
        let Some(code) = self.sessions.get(&player).and_then(|s| s.room.clone()) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&code).filter(|r| r.phase == GamePhase::Lobby) else {
            return Vec::new();
        };
        if let Err(err) = room.lobby.kick(player, target) {
            tracing::debug!(%code, player = player.0, target = target.0, error = %err, "kick refused");
            return Vec::new();
        }

        let mut out = vec![(
            target,
            ServerMessage::Kicked {
                reason: "The host removed you from the lobby.".to_string(),
            },
        )];
        out.extend(to_members(&room.lobby, &ServerMessage::LobbyUpdate(room.lobby.state()), None));
        if let Some(session) = self.sessions.get_mut(&target) {
            session.room = None;
        }
        tracing::info!(%code, target = target.0, "player kicked");
        out
    }

    fn player_action(&mut self, player: PlayerId, action: PlayerAction) -> Outbox {
        let Some(code) = self.sessions.get(&player).and_then(|s| s.room.as_ref()) else {
            return Vec::new();
        };
        let Some(sim) = self
            .rooms
            .get_mut(code)
            .filter(|r| r.phase == GamePhase::Running)
            .and_then(|r| r.simulation.as_mut())
        else {
            return Vec::new();
        };
        let command = match action.into_command() {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(player = player.0, error = %err, "bad player action");
                return Vec::new();
            }
        };
        match sim.apply_command(player, &command) {
            Err(err) if err.is_reported() => vec![(player, ServerMessage::error(err.to_string()))],
            _ => Vec::new(),
        }
    }

    /// Take `player` out of their current room.
    ///
    /// In a lobby the roster shrinks and everyone left gets an update; an
    /// emptied lobby is deleted. Leaving a running game ends it for
    /// everyone.
    fn leave_room(&mut self, player: PlayerId) -> Outbox {
        let Some(session) = self.sessions.get_mut(&player) else {
            return Vec::new();
        };
        let name = session.name.clone();
        let Some(code) = session.room.take() else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return Vec::new();
        };
        room.lobby.leave(player);

        match room.phase {
            GamePhase::Lobby if room.lobby.is_empty() => {
                self.rooms.remove(&code);
                tracing::info!(%code, "lobby closed");
                Vec::new()
            }
            GamePhase::Lobby => to_members(&room.lobby, &ServerMessage::LobbyUpdate(room.lobby.state()), None),
            GamePhase::Running | GamePhase::Ended => {
                room.phase = GamePhase::Ended;
                let out = to_members(
                    &room.lobby,
                    &ServerMessage::GameOver {
                        reason: format!("{name} left the battlefield."),
                    },
                    None,
                );
                for member in room.lobby.members() {
                    if let Some(session) = self.sessions.get_mut(&member.id) {
                        session.room = None;
                    }
                }
                self.rooms.remove(&code);
                tracing::info!(%code, leaver = player.0, "game ended");
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LobbyState;

    fn registry() -> GameRegistry {
        let config = ServerConfig {
            grid_size: 64,
            map_seed: Some(3),
            ..ServerConfig::default()
        };
        GameRegistry::new(config, Ruleset::standard(), 42)
    }

    fn lobby_code(out: &Outbox) -> String {
        out.iter()
            .find_map(|(_, m)| match m {
                ServerMessage::LobbyJoined(LobbyState { game_code, .. }) => Some(game_code.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_default_names_and_ids() {
        let mut reg = registry();
        let a = reg.connect();
        let b = reg.connect();
        assert_ne!(a, b);
        let name = &reg.session(a).unwrap().name;
        assert!(name.starts_with("Knight"));
        assert!(name["Knight".len()..].parse::<u32>().unwrap() < 1000);
    }

    #[test]
    fn test_name_is_trimmed_and_truncated() {
        let mut reg = registry();
        let a = reg.connect();
        reg.handle(a, ClientMessage::SetPlayerName("   ".into()));
        assert!(reg.session(a).unwrap().name.starts_with("Knight"));
        reg.handle(a, ClientMessage::SetPlayerName("  Sir Lancelot du Lac of Camelot  ".into()));
        assert_eq!(reg.session(a).unwrap().name, "Sir Lancelot du Lac ");
    }

    #[test]
    fn test_room_codes() {
        let mut reg = registry();
        let a = reg.connect();
        let out = reg.handle(a, ClientMessage::CreateLobby(CreateLobbyOptions::default()));
        let code = lobby_code(&out);
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|c| CODE_ALPHABET.contains(&c)));
    }

    #[test]
    fn test_solo_lobby_starts_immediately() {
        let mut reg = registry();
        let a = reg.connect();
        let out = reg.handle(
            a,
            ClientMessage::CreateLobby(CreateLobbyOptions {
                is_private: true,
                is_solo: true,
            }),
        );
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], (p, ServerMessage::GameStarted(packet)) if *p == a && packet.players.len() == 1));
        let code = reg.session(a).unwrap().room.clone().unwrap();
        assert_eq!(reg.room(&code).unwrap().phase(), GamePhase::Running);
    }

    #[test]
    fn test_join_twice_is_noop() {
        let mut reg = registry();
        let a = reg.connect();
        let code = lobby_code(&reg.handle(a, ClientMessage::CreateLobby(CreateLobbyOptions::default())));
        assert!(reg.handle(a, ClientMessage::JoinLobby(code)).is_empty());
    }

    #[test]
    fn test_running_games_tick() {
        let mut reg = registry();
        let a = reg.connect();
        reg.handle(
            a,
            ClientMessage::CreateLobby(CreateLobbyOptions {
                is_private: false,
                is_solo: true,
            }),
        );
        let out = reg.tick_all(Fixed::from_num(0.05));
        assert!(matches!(&out[..], [(p, ServerMessage::GameStateUpdate(_))] if *p == a));
    }
}
