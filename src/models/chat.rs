//! Conversation-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserRef;

/// Snapshot of the most recent message, as carried on the conversation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub sender: UserRef,
    pub preview: String,
    pub sent_at: DateTime<Utc>,
}

/// A conversation: a direct (1:1) or group chat room.
///
/// Conversations are never hard-deleted; leaving a group removes the
/// participant but the room persists for the remaining members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    /// Group name; `None` for direct conversations (display the peer's name).
    #[serde(default)]
    pub name: Option<String>,
    pub is_group: bool,
    pub participants: Vec<UserRef>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Unread count for the requesting user, as computed by the backend.
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Display name: the group name, or the first participant other than
    /// `self_id` for direct conversations.
    pub fn display_name(&self, self_id: &str) -> String {
        if let Some(ref name) = self.name {
            if !name.is_empty() {
                return name.clone();
            }
        }
        self.participants
            .iter()
            .find(|p| p.id != self_id)
            .and_then(|p| p.display_name.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> UserRef {
        UserRef {
            id: id.to_string(),
            display_name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_display_name_prefers_group_name() {
        let conv = Conversation {
            id: "conv1".into(),
            name: Some("Algorithms study group".into()),
            is_group: true,
            participants: vec![user("u1", "Ana"), user("u2", "Ben")],
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        };
        assert_eq!(conv.display_name("u1"), "Algorithms study group");
    }

    #[test]
    fn test_display_name_direct_uses_peer() {
        let conv = Conversation {
            id: "conv2".into(),
            name: None,
            is_group: false,
            participants: vec![user("u1", "Ana"), user("u2", "Ben")],
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        };
        assert_eq!(conv.display_name("u1"), "Ben");
        assert_eq!(conv.display_name("u2"), "Ana");
    }
}
