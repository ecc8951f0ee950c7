//! Authentication against the Campus backend.
//!
//! The backend issues a short-lived access token plus a refresh token from
//! `POST /auth/login`; the access token authenticates both the REST API and
//! the realtime channel.

pub mod session;
pub mod tokens;

pub use session::{login, logout, status};
pub use tokens::StoredToken;
