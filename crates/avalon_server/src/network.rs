//! WebSocket transport and the tick driver.
//!
//! One driver task owns the [`GameRegistry`]. Connection tasks talk to it
//! over channels: inbound [`DriverEvent`]s on a bounded queue, outbound
//! [`ServerMessage`]s on a per-client bounded queue that a writer task
//! drains into the socket. The driver never waits on a client: when a
//! queue is full the message is dropped.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use avalon_core::components::PlayerId;
use avalon_core::data::Ruleset;
use avalon_core::math::Fixed;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ServerConfig;
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::registry::{GameRegistry, Outbox};

/// Capacity of the inbound event queue.
pub const EVENT_QUEUE: usize = 1024;

/// Capacity of each client's outbound queue, in messages.
pub const CLIENT_QUEUE: usize = 64;

/// Transport failures.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inbound traffic for the driver.
#[derive(Debug)]
pub enum DriverEvent {
    /// A socket finished its handshake.
    Connected {
        /// Where to push this client's messages.
        outbound: mpsc::Sender<ServerMessage>,
        /// Receives the assigned id.
        reply: oneshot::Sender<PlayerId>,
    },
    /// A decoded client message.
    Message {
        /// Sender.
        player: PlayerId,
        /// Payload.
        message: ClientMessage,
    },
    /// The socket closed.
    Disconnected(PlayerId),
}

/// Bind `config.bind` and serve until the process exits.
pub async fn run(config: ServerConfig, ruleset: Ruleset) -> Result<(), NetworkError> {
    let listener = TcpListener::bind(&config.bind).await?;
    serve(listener, config, ruleset).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, config: ServerConfig, ruleset: Ruleset) -> Result<(), NetworkError> {
    let seed = config.map_seed.unwrap_or_else(rand::random);
    let interval = config.tick_interval();
    let registry = GameRegistry::new(config, ruleset, seed);
    let (events, inbound) = mpsc::channel(EVENT_QUEUE);
    tokio::spawn(drive(registry, inbound, interval));

    tracing::info!(addr = %listener.local_addr()?, "listening");
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(stream, addr, events.clone()));
            }
            Err(err) => tracing::warn!(error = %err, "accept failed"),
        }
    }
}

fn seconds(elapsed: Duration) -> Fixed {
    Fixed::saturating_from_num(elapsed.as_secs_f64())
}

fn dispatch(clients: &BTreeMap<PlayerId, mpsc::Sender<ServerMessage>>, outbox: Outbox) {
    for (player, message) in outbox {
        let Some(client) = clients.get(&player) else {
            continue;
        };
        match client.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(player = player.0, "client queue full, dropping message");
            }
            // The socket is going away; its Disconnected event is on the way.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Own the registry: tick every running game on `interval` with the
/// measured elapsed time, and apply inbound events between ticks.
///
/// Returns when every event sender is gone.
pub async fn drive(mut registry: GameRegistry, mut events: mpsc::Receiver<DriverEvent>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    let mut clients = BTreeMap::new();

    loop {
        tokio::select! {
            now = ticker.tick() => {
                let delta = seconds(now.saturating_duration_since(last));
                last = now;
                dispatch(&clients, registry.tick_all(delta));
            }
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::debug!("driver shutting down");
                    return;
                };
                match event {
                    DriverEvent::Connected { outbound, reply } => {
                        let player = registry.connect();
                        clients.insert(player, outbound);
                        if reply.send(player).is_err() {
                            clients.remove(&player);
                            dispatch(&clients, registry.disconnect(player));
                        }
                    }
                    DriverEvent::Message { player, message } => {
                        dispatch(&clients, registry.handle(player, message));
                    }
                    DriverEvent::Disconnected(player) => {
                        clients.remove(&player);
                        dispatch(&clients, registry.disconnect(player));
                    }
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, events: mpsc::Sender<DriverEvent>) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            tracing::warn!(%addr, error = %err, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    let (outbound, mut queue) = mpsc::channel::<ServerMessage>(CLIENT_QUEUE);
    let (reply, assigned) = oneshot::channel();
    if events.send(DriverEvent::Connected { outbound, reply }).await.is_err() {
        return;
    }
    let Ok(player) = assigned.await else {
        return;
    };
    tracing::debug!(player = player.0, %addr, "websocket open");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            match message.to_json() {
                Ok(text) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(err) => tracing::warn!(error = %err, "failed to encode message"),
            }
        }
    });

    let inbound = events.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = read.next().await {
            match frame {
                Message::Text(text) => match protocol::decode(&text) {
                    Ok(message) => {
                        if inbound.send(DriverEvent::Message { player, message }).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(player = player.0, error = %err, "dropping malformed frame"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    let _ = events.send(DriverEvent::Disconnected(player)).await;
    tracing::debug!(player = player.0, %addr, "websocket closed");
}
