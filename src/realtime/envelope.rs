//! Versioned event envelope for the realtime channel.
//!
//! Every frame on `/ws/chat` is one JSON envelope: a protocol version plus a
//! discriminated union of `kind` and `payload`. Unknown kinds and unsupported
//! versions are skipped with a warning rather than dropping the connection,
//! so old clients survive server-side additions.

use serde::{Deserialize, Serialize};

use crate::models::Message;

pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub v: u8,
    #[serde(flatten)]
    pub event: Event,
}

impl Envelope {
    pub fn new(event: Event) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            event,
        }
    }
}

/// All event kinds carried over the realtime channel. Wire names are fixed
/// by the backend contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Event {
    /// Server's opening frame after the connection is accepted.
    #[serde(rename = "session:hello")]
    Hello(Hello),
    /// Client heartbeat; the server refreshes our presence TTL on receipt.
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    /// Client request to subscribe to a conversation's room. Idempotent.
    #[serde(rename = "chat:join")]
    Join(RoomRef),
    #[serde(rename = "chat:leave")]
    Leave(RoomRef),
    /// Fan-out of a newly created message to all room members.
    #[serde(rename = "chat:newMessage")]
    NewMessage(NewMessage),
    /// A participant advanced their read watermark.
    #[serde(rename = "chat:read")]
    Read(ReadReceipt),
    #[serde(rename = "user:online")]
    Online(PresenceOnline),
    #[serde(rename = "user:offline")]
    Offline(PresenceOffline),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub session_id: String,
    /// Interval at which the client should ping, in seconds.
    pub heartbeat_secs: u64,
    /// How long a presence entry lives without a heartbeat, in seconds.
    pub presence_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub conversation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub conversation_id: String,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub conversation_id: String,
    pub reader_id: String,
    pub up_to_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceOnline {
    pub user_id: String,
    /// TTL for this entry; peers expire it themselves if no refresh arrives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceOffline {
    pub user_id: String,
}

/// Decode one text frame. Returns `None` (with a warning) for frames this
/// client version cannot interpret: bad JSON, a future protocol version, or
/// an unknown event kind.
pub fn decode(text: &str) -> Option<Event> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Skipping unparseable realtime frame: {}", e);
            return None;
        }
    };

    let version = value.get("v").and_then(|v| v.as_u64());
    if version != Some(PROTOCOL_VERSION as u64) {
        tracing::warn!(
            "Skipping realtime frame with unsupported version {:?}",
            version
        );
        return None;
    }

    match serde_json::from_value::<Envelope>(value) {
        Ok(envelope) => Some(envelope.event),
        Err(e) => {
            tracing::warn!("Skipping unrecognized realtime event: {}", e);
            None
        }
    }
}

/// Encode an event as a wire frame.
pub fn encode(event: &Event) -> serde_json::Result<String> {
    serde_json::to_string(&Envelope::new(event.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRef;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_new_message_wire_shape() {
        let event = Event::NewMessage(NewMessage {
            conversation_id: "conv1".into(),
            message: Message {
                id: "m1".into(),
                conversation_id: "conv1".into(),
                seq: 4,
                sender: UserRef {
                    id: "a".into(),
                    display_name: Some("Ana".into()),
                },
                content: "hello".into(),
                attachment_url: None,
                client_msg_id: Some("c-9".into()),
                created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            },
        });

        let text = encode(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["v"], 1);
        assert_eq!(value["kind"], "chat:newMessage");
        assert_eq!(value["payload"]["conversationId"], "conv1");
        assert_eq!(value["payload"]["message"]["clientMsgId"], "c-9");
        assert_eq!(value["payload"]["message"]["seq"], 4);

        match decode(&text) {
            Some(Event::NewMessage(relay)) => {
                assert_eq!(relay.message.content, "hello");
                assert_eq!(relay.message.sender.id, "a");
            }
            other => panic!("expected NewMessage, got {:?}", other),
        }
    }

    #[test]
    fn test_read_receipt_round_trip() {
        let event = Event::Read(ReadReceipt {
            conversation_id: "conv1".into(),
            reader_id: "b".into(),
            up_to_seq: 17,
        });

        let text = encode(&event).unwrap();
        assert!(text.contains("\"chat:read\""));
        assert!(text.contains("\"upToSeq\":17"));

        match decode(&text) {
            Some(Event::Read(receipt)) => assert_eq!(receipt.up_to_seq, 17),
            other => panic!("expected Read, got {:?}", other),
        }
    }

    #[test]
    fn test_hello_and_presence_decode() {
        let hello = r#"{"v":1,"kind":"session:hello","payload":{"sessionId":"s1","heartbeatSecs":30,"presenceTtlSecs":90}}"#;
        match decode(hello) {
            Some(Event::Hello(h)) => {
                assert_eq!(h.heartbeat_secs, 30);
                assert_eq!(h.presence_ttl_secs, 90);
            }
            other => panic!("expected Hello, got {:?}", other),
        }

        let online = r#"{"v":1,"kind":"user:online","payload":{"userId":"a","ttlSecs":60}}"#;
        match decode(online) {
            Some(Event::Online(p)) => {
                assert_eq!(p.user_id, "a");
                assert_eq!(p.ttl_secs, Some(60));
            }
            other => panic!("expected Online, got {:?}", other),
        }
    }

    #[test]
    fn test_ping_has_no_payload() {
        let text = encode(&Event::Ping).unwrap();
        assert_eq!(text, r#"{"v":1,"kind":"ping"}"#);
        assert!(matches!(decode(&text), Some(Event::Ping)));
    }

    #[test]
    fn test_unknown_kind_is_skipped() {
        let frame = r#"{"v":1,"kind":"quiz:started","payload":{"quizId":"q1"}}"#;
        assert!(decode(frame).is_none());
    }

    #[test]
    fn test_future_version_is_skipped() {
        let frame = r#"{"v":2,"kind":"ping"}"#;
        assert!(decode(frame).is_none());
    }

    #[test]
    fn test_garbage_frame_is_skipped() {
        assert!(decode("not json").is_none());
    }
}
