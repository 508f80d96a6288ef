//! # Avalon Dedicated Server
//!
//! Lobby and match server for the Avalon browser RTS.
//!
//! Clients connect over WebSocket and speak the JSON protocol in
//! [`protocol`]. A single driver task owns every session and room, ticks
//! running games at the configured rate, and fans the per-player update
//! packets back out.
//!
//! ## Crate Structure
//!
//! - [`config`] - RON server configuration
//! - [`protocol`] - Client and server message envelopes
//! - [`lobby`] - Pre-game roster, host and kicks
//! - [`registry`] - Sessions, rooms and game lifecycle
//! - [`network`] - WebSocket transport and tick driver

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod lobby;
pub mod network;
pub mod protocol;
pub mod registry;

pub use config::{ConfigError, ServerConfig};
pub use registry::GameRegistry;
