//! Client-side chat state.
//!
//! The backend owns persistence; this store is the client's view of it:
//! the conversation list (ordered by most recent activity), per-conversation
//! message arrays, read watermarks, and the presence registry. REST responses
//! and realtime events both land here, and the store guarantees a message is
//! appended at most once no matter which path delivers it first.

pub mod presence;
pub mod rooms;
pub mod watermark;

pub use presence::PresenceRegistry;
pub use rooms::RoomSet;
pub use watermark::ReadWatermarks;

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::models::{Conversation, LastMessage, Message};

/// Fallback presence TTL until the server advertises one in `session:hello`.
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(90);

const PREVIEW_CHARS: usize = 80;

/// Outcome of feeding a new-message event into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// First sighting; message was appended and the list re-sorted.
    Appended,
    /// Already seen via the other delivery path; dropped.
    Duplicate,
    /// The conversation is not in the list yet; caller should refresh it.
    UnknownConversation,
}

pub struct ChatStore {
    self_id: String,
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
    /// Per conversation: server ids and client ids already appended.
    seen: HashMap<String, HashSet<String>>,
    watermarks: HashMap<String, ReadWatermarks>,
    /// Conversation currently displayed, if any.
    open: Option<String>,
    pub presence: PresenceRegistry,
}

impl ChatStore {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
            conversations: Vec::new(),
            messages: HashMap::new(),
            seen: HashMap::new(),
            watermarks: HashMap::new(),
            open: None,
            presence: PresenceRegistry::new(DEFAULT_PRESENCE_TTL),
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    // -- Conversation list -------------------------------------------------

    /// Replace the conversation list from a REST refresh (last write wins).
    pub fn set_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        self.sort_conversations();
    }

    /// Conversations, most recent activity first.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.id == conversation_id)
    }

    /// Set (or clear) the conversation being displayed. Opening a
    /// conversation zeroes its unread badge.
    pub fn set_open(&mut self, conversation_id: Option<String>) {
        if let Some(ref id) = conversation_id {
            if let Some(conv) = self.conversations.iter_mut().find(|c| &c.id == id) {
                conv.unread_count = 0;
            }
        }
        self.open = conversation_id;
    }

    pub fn open_id(&self) -> Option<&str> {
        self.open.as_deref()
    }

    // -- Messages ----------------------------------------------------------

    /// Replace a conversation's history from REST, rebuilding dedup keys so
    /// realtime echoes of already-fetched messages are dropped.
    pub fn set_history(&mut self, conversation_id: &str, mut messages: Vec<Message>) {
        messages.sort_by_key(|m| m.seq);

        let mut keys = HashSet::new();
        for msg in &messages {
            keys.insert(msg.id.clone());
            keys.insert(msg.dedup_key().to_string());
        }
        self.seen.insert(conversation_id.to_string(), keys);
        self.messages.insert(conversation_id.to_string(), messages);
    }

    pub fn messages(&self, conversation_id: &str) -> &[Message] {
        self.messages
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Apply a `chat:newMessage` event (or a REST create-response).
    ///
    /// Appends at most once per message: the server id and the
    /// client-generated id are both tracked, so whichever of the REST
    /// response and the realtime echo arrives second is dropped.
    pub fn apply_new_message(&mut self, message: Message) -> Applied {
        let conv_id = message.conversation_id.clone();
        if self.conversation(&conv_id).is_none() {
            return Applied::UnknownConversation;
        }

        let seen = self.seen.entry(conv_id.clone()).or_default();
        let client_key = message.dedup_key().to_string();
        if seen.contains(&message.id) || seen.contains(&client_key) {
            return Applied::Duplicate;
        }
        seen.insert(message.id.clone());
        seen.insert(client_key);

        let from_self = message.sender.id == self.self_id;
        let is_open = self.open.as_deref() == Some(conv_id.as_str());

        if let Some(conv) = self.conversations.iter_mut().find(|c| c.id == conv_id) {
            conv.last_message = Some(LastMessage {
                sender: message.sender.clone(),
                preview: preview_of(&message.content),
                sent_at: message.created_at,
            });
            conv.last_message_at = Some(message.created_at);
            if !from_self && !is_open {
                conv.unread_count += 1;
            }
        }

        let list = self.messages.entry(conv_id).or_default();
        let pos = list.partition_point(|m| m.seq <= message.seq);
        list.insert(pos, message);

        self.sort_conversations();
        Applied::Appended
    }

    pub fn latest_seq(&self, conversation_id: &str) -> Option<u64> {
        self.messages(conversation_id).last().map(|m| m.seq)
    }

    // -- Read receipts -----------------------------------------------------

    /// Apply a `chat:read` event from any participant. Returns `false` for
    /// stale (non-advancing) receipts.
    pub fn apply_read(&mut self, conversation_id: &str, reader_id: &str, up_to_seq: u64) -> bool {
        self.watermarks
            .entry(conversation_id.to_string())
            .or_default()
            .advance(reader_id, up_to_seq)
    }

    /// Mark the open history read locally, up to the latest known message.
    ///
    /// Clears the unread badge and returns the watermark to report via
    /// `POST /chat/{id}/read`, or `None` when there is nothing new to report.
    pub fn mark_read(&mut self, conversation_id: &str) -> Option<u64> {
        if let Some(conv) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conv.unread_count = 0;
        }

        let latest = self.latest_seq(conversation_id)?;
        let self_id = self.self_id.clone();
        self.apply_read(conversation_id, &self_id, latest)
            .then_some(latest)
    }

    pub fn is_read_by(&self, conversation_id: &str, reader_id: &str, seq: u64) -> bool {
        self.watermarks
            .get(conversation_id)
            .is_some_and(|marks| marks.is_read(reader_id, seq))
    }

    /// Whether every participant other than ourselves has read `seq`.
    /// Drives the delivered/read indicator on own messages.
    pub fn is_read_by_peers(&self, conversation_id: &str, seq: u64) -> bool {
        let Some(conv) = self.conversation(conversation_id) else {
            return false;
        };
        let peers: Vec<&str> = conv
            .participants
            .iter()
            .filter(|p| p.id != self.self_id)
            .map(|p| p.id.as_str())
            .collect();
        !peers.is_empty()
            && peers
                .iter()
                .all(|peer| self.is_read_by(conversation_id, peer, seq))
    }

    // -- Presence ----------------------------------------------------------

    /// Whether the peer of a direct conversation is currently online.
    pub fn peer_online(&self, conversation_id: &str, now: Instant) -> bool {
        let Some(conv) = self.conversation(conversation_id) else {
            return false;
        };
        if conv.is_group {
            return false;
        }
        conv.participants
            .iter()
            .any(|p| p.id != self.self_id && self.presence.is_online(&p.id, now))
    }

    // -- Internal ----------------------------------------------------------

    fn sort_conversations(&mut self) {
        // Stable sort: ties keep their current relative order.
        self.conversations
            .sort_by(|a, b| match (a.last_message_at, b.last_message_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
    }
}

fn preview_of(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRef;
    use chrono::{TimeZone, Utc};

    fn user(id: &str) -> UserRef {
        UserRef {
            id: id.to_string(),
            display_name: Some(id.to_string()),
        }
    }

    fn conv(id: &str, participants: &[&str]) -> Conversation {
        Conversation {
            id: id.to_string(),
            name: None,
            is_group: participants.len() > 2,
            participants: participants.iter().map(|p| user(p)).collect(),
            last_message: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    fn message(id: &str, conv_id: &str, seq: u64, sender: &str, content: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conv_id.to_string(),
            seq,
            sender: user(sender),
            content: content.to_string(),
            attachment_url: None,
            client_msg_id: Some(format!("client-{id}")),
            created_at: Utc.timestamp_opt(1_700_000_000 + seq as i64, 0).unwrap(),
        }
    }

    fn store_with_two_conversations() -> ChatStore {
        let mut store = ChatStore::new("b");
        store.set_conversations(vec![conv("conv1", &["a", "b"]), conv("conv2", &["b", "c"])]);
        // conv2 has the most recent activity to begin with (own message, so
        // no unread is counted).
        store.apply_new_message(message("m0", "conv2", 1, "b", "earlier"));
        store
    }

    #[test]
    fn test_delivery_appends_once_and_reorders_list() {
        let mut store = store_with_two_conversations();
        assert_eq!(store.conversations()[0].id, "conv2");

        // A sends "hello" to conv1; B receives the relay event.
        let applied = store.apply_new_message(message("m1", "conv1", 1, "a", "hello"));
        assert_eq!(applied, Applied::Appended);
        assert_eq!(store.messages("conv1").len(), 1);
        assert_eq!(store.messages("conv1")[0].content, "hello");
        assert_eq!(store.conversations()[0].id, "conv1");
        assert_eq!(store.conversations()[0].unread_count, 1);
    }

    #[test]
    fn test_rest_response_and_realtime_echo_dedupe() {
        let mut store = store_with_two_conversations();
        let msg = message("m1", "conv1", 1, "b", "hi");

        // REST create-response lands first, then the realtime echo.
        assert_eq!(store.apply_new_message(msg.clone()), Applied::Appended);
        assert_eq!(store.apply_new_message(msg), Applied::Duplicate);
        assert_eq!(store.messages("conv1").len(), 1);
    }

    #[test]
    fn test_dedupe_by_client_id_across_server_ids() {
        let mut store = store_with_two_conversations();
        let first = message("m1", "conv1", 1, "b", "hi");
        let mut echo = message("m2", "conv1", 1, "b", "hi");
        echo.client_msg_id = first.client_msg_id.clone();

        assert_eq!(store.apply_new_message(first), Applied::Appended);
        assert_eq!(store.apply_new_message(echo), Applied::Duplicate);
    }

    #[test]
    fn test_history_refresh_then_echo_is_duplicate() {
        let mut store = store_with_two_conversations();
        let msg = message("m1", "conv1", 1, "a", "hello");

        store.set_history("conv1", vec![msg.clone()]);
        assert_eq!(store.apply_new_message(msg), Applied::Duplicate);
    }

    #[test]
    fn test_unread_skips_open_conversation_and_own_messages() {
        let mut store = store_with_two_conversations();
        store.set_open(Some("conv1".to_string()));

        store.apply_new_message(message("m1", "conv1", 1, "a", "seen live"));
        store.apply_new_message(message("m2", "conv2", 2, "b", "my own"));
        assert_eq!(store.conversation("conv1").unwrap().unread_count, 0);
        assert_eq!(store.conversation("conv2").unwrap().unread_count, 0);

        store.apply_new_message(message("m3", "conv2", 3, "c", "while away"));
        assert_eq!(store.conversation("conv2").unwrap().unread_count, 1);
    }

    #[test]
    fn test_unknown_conversation_requests_refresh() {
        let mut store = store_with_two_conversations();
        let applied = store.apply_new_message(message("m1", "conv9", 1, "a", "new room"));
        assert_eq!(applied, Applied::UnknownConversation);
        assert!(store.messages("conv9").is_empty());
    }

    #[test]
    fn test_out_of_order_event_keeps_seq_order() {
        let mut store = store_with_two_conversations();
        store.apply_new_message(message("m2", "conv1", 2, "a", "second"));
        store.apply_new_message(message("m1", "conv1", 1, "a", "first"));

        let seqs: Vec<u64> = store.messages("conv1").iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn test_read_watermark_covers_earlier_messages() {
        let mut store = store_with_two_conversations();
        for seq in 1..=3 {
            store.apply_new_message(message(&format!("m{seq}"), "conv1", seq, "b", "msg"));
        }

        assert!(store.apply_read("conv1", "a", 2));
        assert!(store.is_read_by("conv1", "a", 1));
        assert!(store.is_read_by("conv1", "a", 2));
        assert!(!store.is_read_by("conv1", "a", 3));

        // conv1 is 1:1 with "a", so peer-read tracks a's watermark.
        assert!(store.is_read_by_peers("conv1", 2));
        assert!(!store.is_read_by_peers("conv1", 3));
    }

    #[test]
    fn test_mark_read_reports_watermark_once() {
        let mut store = store_with_two_conversations();
        store.apply_new_message(message("m1", "conv1", 1, "a", "hello"));
        store.apply_new_message(message("m2", "conv1", 2, "a", "again"));
        assert_eq!(store.conversation("conv1").unwrap().unread_count, 2);

        assert_eq!(store.mark_read("conv1"), Some(2));
        assert_eq!(store.conversation("conv1").unwrap().unread_count, 0);
        // Nothing new arrived; no second receipt goes out.
        assert_eq!(store.mark_read("conv1"), None);
    }

    #[test]
    fn test_peer_online_for_direct_conversations() {
        let mut store = store_with_two_conversations();
        let now = Instant::now();

        store.presence.mark_online("a", None, now);
        assert!(store.peer_online("conv1", now));
        assert!(!store.peer_online("conv2", now));

        store.presence.mark_offline("a");
        assert!(!store.peer_online("conv1", now));
    }
}
