//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a user as embedded in messages and participant lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    pub display_name: Option<String>,
}

/// A chat message.
///
/// Immutable once created; read state lives in per-conversation watermarks,
/// not on the message itself. `seq` is the server-assigned per-conversation
/// sequence number and `client_msg_id` is the id the sending client attached
/// at creation time (both the REST response and the realtime echo carry it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub seq: u64,
    pub sender: UserRef,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_msg_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Key used for at-most-once delivery: the client-generated id when
    /// present (dedupes the REST echo against the realtime echo), otherwise
    /// the server id.
    pub fn dedup_key(&self) -> &str {
        self.client_msg_id.as_deref().unwrap_or(&self.id)
    }
}
