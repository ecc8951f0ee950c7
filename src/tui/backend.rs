//! Async backend: bridges the TUI event loop with the REST API and the
//! realtime connection.
//!
//! The TUI sends `BackendCommand` values; a background tokio task executes
//! REST calls and forwards room-membership changes to the realtime task.
//! Everything flowing back (REST results, realtime events, connection state)
//! arrives on a single `BackendResponse` channel, so the TUI loop has one
//! place to `select!` on.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::time;

use crate::api::chat;
use crate::api::client::ApiClient;
use crate::auth;
use crate::models::{Conversation, Message};
use crate::realtime::envelope::Event;
use crate::realtime::session::Session;
use crate::realtime::{Backoff, RealtimeError};
use crate::state::RoomSet;

/// Commands sent from the TUI event loop to the backend.
pub enum BackendCommand {
    LoadRooms,
    LoadHistory {
        conversation_id: String,
        limit: usize,
    },
    SendMessage {
        conversation_id: String,
        content: String,
    },
    MarkRead {
        conversation_id: String,
        up_to_seq: u64,
    },
    JoinRoom {
        conversation_id: String,
    },
    LeaveRoom {
        conversation_id: String,
    },
}

/// Responses and push events delivered to the TUI.
pub enum BackendResponse {
    Rooms(Result<Vec<Conversation>>),
    History {
        conversation_id: String,
        result: Result<Vec<Message>>,
    },
    /// REST create-response; fed through the store so the realtime echo
    /// dedupes against it.
    MessageSent(Result<Message>),
    MarkedRead(Result<()>),
    /// An event from the realtime channel.
    Realtime(Event),
    Connection(ConnectionState),
    /// Initial client creation failed (auth issue).
    ClientError(String),
}

#[derive(Debug, Clone)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting { delay_secs: u64 },
}

/// Cloneable handle for sending commands to the backend.
#[derive(Clone)]
pub struct BackendHandle {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
}

impl BackendHandle {
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }
}

/// Start the backend. Returns the command handle and the response stream.
pub fn start() -> (BackendHandle, mpsc::UnboundedReceiver<BackendResponse>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = mpsc::unbounded_channel();

    tokio::spawn(backend_loop(cmd_rx, resp_tx));

    (BackendHandle { cmd_tx }, resp_rx)
}

/// Membership changes forwarded to the realtime task.
enum RoomCommand {
    Join(String),
    Leave(String),
}

/// Background loop that processes commands.
///
/// Creates the ApiClient once and reuses it across REST calls; spawns the
/// realtime task alongside. If client creation fails, the TUI gets a
/// ClientError and the loop exits.
async fn backend_loop(
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let client = match ApiClient::new().await {
        Ok(c) => Arc::new(c),
        Err(e) => {
            let _ = resp_tx.send(BackendResponse::ClientError(format!("{:#}", e)));
            return;
        }
    };

    let (room_tx, room_rx) = mpsc::unbounded_channel();
    tokio::spawn(realtime_loop(room_rx, resp_tx.clone()));

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            BackendCommand::JoinRoom { conversation_id } => {
                let _ = room_tx.send(RoomCommand::Join(conversation_id));
            }
            BackendCommand::LeaveRoom { conversation_id } => {
                let _ = room_tx.send(RoomCommand::Leave(conversation_id));
            }
            rest_cmd => {
                // Each REST command runs as its own task so a slow request
                // doesn't block the loop.
                let client = Arc::clone(&client);
                let resp_tx = resp_tx.clone();
                tokio::spawn(async move {
                    let _ = resp_tx.send(run_rest_command(&client, rest_cmd).await);
                });
            }
        }
    }
}

async fn run_rest_command(client: &ApiClient, cmd: BackendCommand) -> BackendResponse {
    match cmd {
        BackendCommand::LoadRooms => BackendResponse::Rooms(chat::list_rooms_data(client).await),
        BackendCommand::LoadHistory {
            conversation_id,
            limit,
        } => {
            let result = chat::history_data(client, &conversation_id, limit).await;
            BackendResponse::History {
                conversation_id,
                result,
            }
        }
        BackendCommand::SendMessage {
            conversation_id,
            content,
        } => BackendResponse::MessageSent(
            chat::send_message_with_client(client, &conversation_id, &content, None).await,
        ),
        BackendCommand::MarkRead {
            conversation_id,
            up_to_seq,
        } => BackendResponse::MarkedRead(
            chat::mark_read_with_client(client, &conversation_id, up_to_seq).await,
        ),
        // Room commands are routed before we get here.
        BackendCommand::JoinRoom { .. } | BackendCommand::LeaveRoom { .. } => unreachable!(),
    }
}

/// Own the realtime connection for the TUI: reconnect with backoff, track
/// desired room membership across drops, and forward every event upstream.
async fn realtime_loop(
    mut room_rx: mpsc::UnboundedReceiver<RoomCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let mut rooms = RoomSet::new();
    let mut backoff = Backoff::new();
    let mut just_refreshed = false;

    loop {
        if resp_tx
            .send(BackendResponse::Connection(ConnectionState::Connecting))
            .is_err()
        {
            return;
        }

        let started = Instant::now();
        match run_realtime_session(&mut rooms, &mut room_rx, &resp_tx).await {
            Ok(()) => return,
            Err(e) => {
                if matches!(
                    e.downcast_ref::<RealtimeError>(),
                    Some(RealtimeError::Unauthorized)
                ) {
                    // Refresh once per rejection; a second consecutive
                    // rejection means the credential is dead.
                    tracing::info!("Realtime credential rejected, refreshing token...");
                    match auth::session::refresh().await {
                        Ok(true) if !just_refreshed => {
                            just_refreshed = true;
                            continue;
                        }
                        _ => {
                            let _ = resp_tx.send(BackendResponse::ClientError(
                                "Session expired. Run 'campus-cli login'.".to_string(),
                            ));
                            return;
                        }
                    }
                }
                just_refreshed = false;

                if started.elapsed() >= crate::realtime::STABLE_AFTER {
                    backoff.reset();
                }
                let delay = backoff.next();
                tracing::warn!(
                    "Realtime channel lost: {:#}. Reconnecting in {}s...",
                    e,
                    delay.as_secs()
                );
                if resp_tx
                    .send(BackendResponse::Connection(ConnectionState::Reconnecting {
                        delay_secs: delay.as_secs(),
                    }))
                    .is_err()
                {
                    return;
                }

                // Keep absorbing membership changes while disconnected so the
                // reconnect joins exactly the rooms the TUI currently wants.
                let sleep = time::sleep(delay);
                tokio::pin!(sleep);
                loop {
                    tokio::select! {
                        _ = &mut sleep => break,
                        cmd = room_rx.recv() => match cmd {
                            Some(cmd) => apply_room_command(&mut rooms, cmd),
                            None => return,
                        }
                    }
                }
            }
        }
    }
}

fn apply_room_command(rooms: &mut RoomSet, cmd: RoomCommand) {
    match cmd {
        RoomCommand::Join(id) => {
            rooms.join(&id);
        }
        RoomCommand::Leave(id) => {
            rooms.leave(&id);
        }
    }
}

/// One realtime session: establish, re-join the snapshot, pump events.
/// Returns `Ok(())` only when the TUI side has gone away.
async fn run_realtime_session(
    rooms: &mut RoomSet,
    room_rx: &mut mpsc::UnboundedReceiver<RoomCommand>,
    resp_tx: &mpsc::UnboundedSender<BackendResponse>,
) -> Result<()> {
    // Rebuild the client each attempt so refreshed tokens are picked up.
    let client = ApiClient::new().await.context("API client unavailable")?;
    let mut session = Session::establish(client.server_url()?, &client.access_token()?).await?;
    session.join_rooms(&rooms.snapshot()).await?;

    if resp_tx
        .send(BackendResponse::Connection(ConnectionState::Connected))
        .is_err()
    {
        return Ok(());
    }

    let mut heartbeat = time::interval(session.heartbeat_interval());
    heartbeat.tick().await; // skip the immediate first tick

    loop {
        tokio::select! {
            event = session.recv() => {
                match event? {
                    Some(event) => {
                        if resp_tx.send(BackendResponse::Realtime(event)).is_err() {
                            return Ok(());
                        }
                    }
                    None => bail!(RealtimeError::Closed),
                }
            }
            cmd = room_rx.recv() => match cmd {
                Some(RoomCommand::Join(id)) => {
                    // Only newly tracked rooms produce a join on the wire.
                    if rooms.join(&id) {
                        session
                            .send(&Event::Join(crate::realtime::envelope::RoomRef {
                                conversation_id: id,
                            }))
                            .await?;
                    }
                }
                Some(RoomCommand::Leave(id)) => {
                    if rooms.leave(&id) {
                        session
                            .send(&Event::Leave(crate::realtime::envelope::RoomRef {
                                conversation_id: id,
                            }))
                            .await?;
                    }
                }
                None => return Ok(()),
            },
            _ = heartbeat.tick() => {
                session.send(&Event::Ping).await?;
            }
        }
    }
}
