//! Room membership tracking for the realtime connection.
//!
//! The tracker holds the set of conversation rooms this connection should be
//! subscribed to. Joins are idempotent: a room already in the set produces no
//! second join on the wire, and after a reconnect the full snapshot is
//! re-issued so membership matches exactly the set held before the drop.

use std::collections::BTreeSet;

/// Desired room membership for one realtime connection.
#[derive(Debug, Default)]
pub struct RoomSet {
    rooms: BTreeSet<String>,
}

impl RoomSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room. Returns `true` if the room was not already tracked, i.e.
    /// a `chat:join` should actually be sent.
    pub fn join(&mut self, conversation_id: &str) -> bool {
        self.rooms.insert(conversation_id.to_string())
    }

    /// Remove a room (group leave). Returns `true` if it was tracked.
    pub fn leave(&mut self, conversation_id: &str) -> bool {
        self.rooms.remove(conversation_id)
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.rooms.contains(conversation_id)
    }

    /// The rooms to (re-)join after a connect, in stable order.
    pub fn snapshot(&self) -> Vec<String> {
        self.rooms.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_idempotent() {
        let mut rooms = RoomSet::new();
        assert!(rooms.join("conv1"));
        assert!(!rooms.join("conv1"));
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn test_snapshot_matches_membership_after_churn() {
        let mut rooms = RoomSet::new();
        rooms.join("conv2");
        rooms.join("conv1");
        rooms.join("conv3");
        rooms.leave("conv2");

        // The snapshot re-issued on reconnect is exactly the tracked set,
        // with no duplicates.
        assert_eq!(rooms.snapshot(), vec!["conv1", "conv3"]);
    }

    #[test]
    fn test_leave_untracked_room_is_noop() {
        let mut rooms = RoomSet::new();
        rooms.join("conv1");
        assert!(!rooms.leave("conv9"));
        assert!(rooms.contains("conv1"));
    }
}
