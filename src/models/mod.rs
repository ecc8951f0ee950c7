//! Data models for Campus entities

mod chat;
mod course;
mod message;
mod user;

pub use chat::*;
pub use course::*;
pub use message::*;
pub use user::*;
