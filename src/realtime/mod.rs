//! Realtime push channel client.
//!
//! Maintains the single authenticated WebSocket connection to `/ws/chat`:
//! session handshake, room joins, heartbeats, and automatic reconnection
//! with exponential backoff. A rejected credential triggers one token
//! refresh instead of blind retries.

pub mod envelope;
pub mod session;
pub mod socket;

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use thiserror::Error;
use tokio::time;

use crate::api::client::ApiClient;
use crate::auth;
use crate::state::{PresenceRegistry, RoomSet};
use envelope::Event;
use session::Session;

/// Why a realtime connection attempt or session failed.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("credential rejected by the realtime endpoint")]
    Unauthorized,
    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("connection closed by server")]
    Closed,
}

/// Reconnect delay: 1s doubling to a 64s cap.
#[derive(Debug)]
pub struct Backoff {
    current_secs: u64,
}

impl Backoff {
    const INITIAL_SECS: u64 = 1;
    const MAX_SECS: u64 = 64;

    pub fn new() -> Self {
        Self {
            current_secs: Self::INITIAL_SECS,
        }
    }

    /// The delay to sleep before the next attempt; doubles for the one after.
    pub fn next(&mut self) -> Duration {
        let delay = self.current_secs;
        self.current_secs = (self.current_secs * 2).min(Self::MAX_SECS);
        Duration::from_secs(delay)
    }

    pub fn reset(&mut self) {
        self.current_secs = Self::INITIAL_SECS;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection that survived this long counts as stable: the next drop
/// starts the backoff ladder from the bottom again.
pub const STABLE_AFTER: Duration = Duration::from_secs(60);

/// How often expired presence entries are swept while watching.
const PRESENCE_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Run the realtime connection with automatic reconnection, printing events
/// to stdout (the `watch` command). Exits cleanly on Ctrl+C.
pub async fn connect_and_run() -> Result<()> {
    // Fail fast when there is no usable login at all.
    ApiClient::new().await?;

    let mut backoff = Backoff::new();
    let mut just_refreshed = false;

    loop {
        let started = Instant::now();
        match run_session().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                if matches!(
                    e.downcast_ref::<RealtimeError>(),
                    Some(RealtimeError::Unauthorized)
                ) {
                    // Refresh once per rejection; a second consecutive
                    // rejection means the credential is dead.
                    if just_refreshed {
                        bail!("Credential still rejected after refresh. Run 'campus-cli login'.");
                    }
                    tracing::info!("Realtime credential rejected, refreshing token...");
                    if !auth::session::refresh().await? {
                        bail!("Session expired and no refresh token. Run 'campus-cli login'.");
                    }
                    just_refreshed = true;
                    continue;
                }
                just_refreshed = false;

                if started.elapsed() >= STABLE_AFTER {
                    backoff.reset();
                }
                let delay = backoff.next();
                tracing::warn!(
                    "Realtime channel lost: {:#}. Reconnecting in {}s...",
                    e,
                    delay.as_secs()
                );

                tokio::select! {
                    _ = time::sleep(delay) => {}
                    _ = tokio::signal::ctrl_c() => {
                        println!("Shutting down...");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// One full session: fetch rooms, connect, join, then pump events until the
/// connection drops (error) or the user interrupts (clean return).
async fn run_session() -> Result<()> {
    // Rebuild the client each attempt so refreshed tokens are picked up.
    let client = ApiClient::new().await?;
    let conversations = crate::api::chat::list_rooms_data(&client)
        .await
        .context("Failed to fetch conversation list")?;

    let mut rooms = RoomSet::new();
    for conv in &conversations {
        rooms.join(&conv.id);
    }

    let mut session = Session::establish(client.server_url()?, &client.access_token()?).await?;
    session.join_rooms(&rooms.snapshot()).await?;

    let mut presence = PresenceRegistry::new(session.presence_ttl());
    let mut heartbeat = time::interval(session.heartbeat_interval());
    heartbeat.tick().await; // skip the immediate first tick
    let mut sweep = time::interval(PRESENCE_SWEEP_INTERVAL);
    sweep.tick().await;

    println!("Connected. Listening for events... (Ctrl-C to stop)");

    loop {
        tokio::select! {
            event = session.recv() => {
                match event? {
                    Some(event) => print_event(&event, &mut presence),
                    None => bail!(RealtimeError::Closed),
                }
            }
            _ = heartbeat.tick() => {
                session.send(&Event::Ping).await?;
            }
            _ = sweep.tick() => {
                for user in presence.sweep(Instant::now()) {
                    println!("[PRESENCE] {} offline (ttl expired)", user);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down...");
                return Ok(());
            }
        }
    }
}

/// Print one event the way `watch` reports them.
fn print_event(event: &Event, presence: &mut PresenceRegistry) {
    match event {
        Event::NewMessage(relay) => {
            let sender = relay
                .message
                .sender
                .display_name
                .as_deref()
                .unwrap_or(&relay.message.sender.id);
            println!(
                "[MSG] {} #{} {}: {}",
                relay.conversation_id, relay.message.seq, sender, relay.message.content
            );
            if let Some(ref url) = relay.message.attachment_url {
                println!("      attachment: {}", url);
            }
        }
        Event::Read(receipt) => {
            println!(
                "[READ] {} read up to #{} in {}",
                receipt.reader_id, receipt.up_to_seq, receipt.conversation_id
            );
        }
        Event::Online(online) => {
            let ttl = online.ttl_secs.map(Duration::from_secs);
            presence.mark_online(&online.user_id, ttl, Instant::now());
            println!("[PRESENCE] {} online", online.user_id);
        }
        Event::Offline(offline) => {
            presence.mark_offline(&offline.user_id);
            println!("[PRESENCE] {} offline", offline.user_id);
        }
        other => {
            tracing::debug!("Unhandled event: {:?}", other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..8).map(|_| backoff.next().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 64, 64]);
    }

    #[test]
    fn test_backoff_reset_restarts_ladder() {
        let mut backoff = Backoff::new();
        backoff.next();
        backoff.next();
        backoff.reset();
        assert_eq!(backoff.next().as_secs(), 1);
    }
}
