//! Terminal user interface for Campus chat
//!
//! Ratatui front-end over the client-side chat state: conversation sidebar,
//! message pane with read indicators, and a compose line. An async backend
//! task owns the REST client and the realtime connection.

mod app;
mod backend;
mod compose;
mod messages;
mod sidebar;
mod ui;

pub use app::run;
