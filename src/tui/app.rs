//! TUI application state and main event loop

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{Event as TermEvent, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio_stream::StreamExt;
use tokio::sync::mpsc;
use tokio::time;

use super::backend::{self, BackendCommand, BackendHandle, BackendResponse, ConnectionState};
use super::compose::ComposeState;
use super::messages::MessagesState;
use super::sidebar::SidebarState;
use super::ui;
use crate::config::Config;
use crate::realtime::envelope::Event;
use crate::state::{Applied, ChatStore};

/// How many messages to fetch when opening a conversation.
const HISTORY_LIMIT: usize = 50;

/// Presence sweep / redraw cadence.
const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Active pane in the TUI.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

/// Application state.
pub struct App {
    pub should_exit: bool,
    pub store: ChatStore,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub active_pane: Pane,
    /// Connection state description for the status line.
    pub connection: String,
    /// Transient status or error text.
    pub status: Option<String>,
    backend: BackendHandle,
}

impl App {
    fn new(self_id: String, backend: BackendHandle) -> Self {
        Self {
            should_exit: false,
            store: ChatStore::new(self_id),
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            active_pane: Pane::default(),
            connection: "Connecting...".to_string(),
            status: None,
            backend,
        }
    }

    // -- Input -------------------------------------------------------------

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_exit = true;
            return;
        }
        if code == KeyCode::Tab {
            self.active_pane = match self.active_pane {
                Pane::Sidebar => Pane::Messages,
                Pane::Messages => Pane::Compose,
                Pane::Compose => Pane::Sidebar,
            };
            return;
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(code),
            Pane::Messages => self.handle_messages_key(code),
            Pane::Compose => self.handle_compose_key(code),
        }
    }

    fn handle_sidebar_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(&self.store),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(&self.store),
            KeyCode::Enter => self.open_selected(),
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::Up | KeyCode::Char('k') => self.messages.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.messages.scroll_down(1),
            KeyCode::PageUp => self.messages.scroll_up(10),
            KeyCode::PageDown => self.messages.scroll_down(10),
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::Enter => self.send_current_input(),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            KeyCode::Char(c) => self.compose.insert_char(c),
            _ => {}
        }
    }

    fn open_selected(&mut self) {
        let Some(conversation_id) = self.sidebar.selected_conversation(&self.store) else {
            return;
        };
        self.store.set_open(Some(conversation_id.clone()));
        self.messages.reset();
        self.backend.send(BackendCommand::LoadHistory {
            conversation_id,
            limit: HISTORY_LIMIT,
        });
        self.active_pane = Pane::Compose;
    }

    fn send_current_input(&mut self) {
        let Some(content) = self.compose.take() else {
            return;
        };
        let Some(conversation_id) = self.store.open_id().map(str::to_string) else {
            self.status = Some("No conversation open".to_string());
            return;
        };
        self.backend.send(BackendCommand::SendMessage {
            conversation_id,
            content,
        });
    }

    // -- Backend responses and realtime events -----------------------------

    fn handle_backend(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::Rooms(Ok(conversations)) => {
                self.store.set_conversations(conversations);
                self.sidebar.loading = false;
                self.sidebar.clamp(&self.store);
                // Track every room on the realtime connection; the tracker
                // dedupes, so re-sending after each refresh is harmless.
                let ids: Vec<String> =
                    self.store.conversations().iter().map(|c| c.id.clone()).collect();
                for conversation_id in ids {
                    self.backend.send(BackendCommand::JoinRoom { conversation_id });
                }
            }
            BackendResponse::Rooms(Err(e)) => {
                self.status = Some(format!("Failed to load conversations: {:#}", e));
            }
            BackendResponse::History {
                conversation_id,
                result: Ok(messages),
            } => {
                self.store.set_history(&conversation_id, messages);
                if self.store.open_id() == Some(conversation_id.as_str()) {
                    self.report_read(&conversation_id);
                }
            }
            BackendResponse::History { result: Err(e), .. } => {
                self.status = Some(format!("Failed to load history: {:#}", e));
            }
            BackendResponse::MessageSent(Ok(message)) => {
                // Appends unless the realtime echo already arrived.
                self.store.apply_new_message(message);
                self.status = None;
            }
            BackendResponse::MessageSent(Err(e)) => {
                self.status = Some(format!("Send failed: {:#}", e));
            }
            BackendResponse::MarkedRead(Ok(())) => {}
            BackendResponse::MarkedRead(Err(e)) => {
                self.status = Some(format!("Read receipt failed: {:#}", e));
            }
            BackendResponse::Realtime(event) => self.handle_realtime(event),
            BackendResponse::Connection(state) => {
                self.connection = match state {
                    ConnectionState::Connecting => "Connecting...".to_string(),
                    ConnectionState::Connected => "Connected".to_string(),
                    ConnectionState::Reconnecting { delay_secs } => {
                        format!("Reconnecting in {}s...", delay_secs)
                    }
                };
            }
            BackendResponse::ClientError(e) => {
                self.connection = "Offline".to_string();
                self.status = Some(e);
            }
        }
    }

    fn handle_realtime(&mut self, event: Event) {
        match event {
            Event::NewMessage(relay) => {
                let conversation_id = relay.conversation_id;
                match self.store.apply_new_message(relay.message) {
                    Applied::Appended => {
                        if self.store.open_id() == Some(conversation_id.as_str()) {
                            // Viewing the room live: advance our watermark.
                            self.report_read(&conversation_id);
                        }
                        self.sidebar.clamp(&self.store);
                    }
                    Applied::Duplicate => {}
                    Applied::UnknownConversation => {
                        // A room we have never seen; refresh the list.
                        self.backend.send(BackendCommand::LoadRooms);
                    }
                }
            }
            Event::Read(receipt) => {
                self.store.apply_read(
                    &receipt.conversation_id,
                    &receipt.reader_id,
                    receipt.up_to_seq,
                );
            }
            Event::Online(online) => {
                let ttl = online.ttl_secs.map(Duration::from_secs);
                self.store
                    .presence
                    .mark_online(&online.user_id, ttl, Instant::now());
            }
            Event::Offline(offline) => {
                self.store.presence.mark_offline(&offline.user_id);
            }
            other => {
                tracing::debug!("Unhandled realtime event in TUI: {:?}", other);
            }
        }
    }

    /// Advance our own watermark and report it, if anything is newly read.
    fn report_read(&mut self, conversation_id: &str) {
        if let Some(up_to_seq) = self.store.mark_read(conversation_id) {
            self.backend.send(BackendCommand::MarkRead {
                conversation_id: conversation_id.to_string(),
                up_to_seq,
            });
        }
    }

    fn on_tick(&mut self) {
        // TTL expiry for silently dropped peers.
        self.store.presence.sweep(Instant::now());
    }

    /// Render the UI.
    pub fn render(&mut self, frame: &mut ratatui::Frame) {
        ui::render(frame, self);
    }
}

/// Run the TUI application, restoring the terminal on exit.
pub async fn run() -> Result<()> {
    let config = Config::load()?;
    let self_id = config
        .user_id
        .clone()
        .context("Not logged in. Run 'campus-cli login' first.")?;

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, self_id).await;
    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal, self_id: String) -> Result<()> {
    let (handle, mut responses) = backend::start();
    handle.send(BackendCommand::LoadRooms);

    let mut app = App::new(self_id, handle);
    let mut term_events = EventStream::new();
    let mut tick = time::interval(TICK_INTERVAL);

    while !app.should_exit {
        terminal.draw(|frame| app.render(frame))?;

        tokio::select! {
            event = term_events.next() => {
                match event {
                    Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key.code, key.modifiers);
                    }
                    Some(Ok(_)) => {
                        // Resize and similar are handled on the next draw.
                    }
                    Some(Err(e)) => return Err(e).context("Terminal event stream failed"),
                    None => app.should_exit = true,
                }
            }
            response = recv_response(&mut responses) => {
                match response {
                    Some(response) => app.handle_backend(response),
                    None => {
                        app.connection = "Offline".to_string();
                    }
                }
            }
            _ = tick.tick() => app.on_tick(),
        }
    }

    Ok(())
}

/// Wrap the channel recv so a permanently-closed backend doesn't spin the
/// select loop.
async fn recv_response(
    responses: &mut mpsc::UnboundedReceiver<BackendResponse>,
) -> Option<BackendResponse> {
    if responses.is_closed() && responses.is_empty() {
        // Suspend forever; the user can still quit via the keyboard.
        std::future::pending::<()>().await;
    }
    responses.recv().await
}
