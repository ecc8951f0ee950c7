//! Realtime session establishment.
//!
//! One session is: connect the WebSocket, wait for the server's
//! `session:hello`, then re-issue `chat:join` for the full room snapshot.
//! Joins are fire-once per session; idempotence across reconnects is the
//! `RoomSet`'s job.

use std::time::Duration;

use super::envelope::{Event, Hello, RoomRef};
use super::socket::ChatSocket;
use super::RealtimeError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// An established realtime session (handshake completed).
pub struct Session {
    socket: ChatSocket,
    pub hello: Hello,
}

impl Session {
    /// Connect to `/ws/chat` and complete the opening handshake.
    pub async fn establish(server_url: &str, access_token: &str) -> Result<Self, RealtimeError> {
        let url = realtime_url(server_url, access_token);
        let mut socket = ChatSocket::connect(&url).await?;

        let first = tokio::time::timeout(HANDSHAKE_TIMEOUT, socket.recv_event())
            .await
            .map_err(|_| RealtimeError::Protocol("handshake timed out".into()))??;

        let hello = match first {
            Some(Event::Hello(hello)) => hello,
            Some(other) => {
                return Err(RealtimeError::Protocol(format!(
                    "expected session:hello, got {:?}",
                    other
                )))
            }
            None => return Err(RealtimeError::Closed),
        };

        tracing::info!(
            "Realtime session {} established (heartbeat {}s, presence TTL {}s)",
            hello.session_id,
            hello.heartbeat_secs,
            hello.presence_ttl_secs
        );

        Ok(Self { socket, hello })
    }

    /// Join every room in the snapshot. Issued in full after each connect so
    /// membership after a reconnect matches the set held before the drop.
    pub async fn join_rooms(&mut self, rooms: &[String]) -> Result<(), RealtimeError> {
        for conversation_id in rooms {
            self.socket
                .send_event(&Event::Join(RoomRef {
                    conversation_id: conversation_id.clone(),
                }))
                .await?;
        }
        tracing::info!("Joined {} rooms", rooms.len());
        Ok(())
    }

    pub async fn send(&mut self, event: &Event) -> Result<(), RealtimeError> {
        self.socket.send_event(event).await
    }

    pub async fn recv(&mut self) -> Result<Option<Event>, RealtimeError> {
        self.socket.recv_event().await
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.hello.heartbeat_secs.max(5))
    }

    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.hello.presence_ttl_secs.max(1))
    }
}

/// Build the WebSocket URL from the configured server URL, carrying the
/// bearer credential and a per-connection endpoint id as query parameters.
fn realtime_url(server_url: &str, access_token: &str) -> String {
    let e = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
    let base = server_url
        .trim_end_matches('/')
        .replace("https://", "wss://")
        .replace("http://", "ws://");
    let epid = uuid::Uuid::new_v4().to_string();

    format!("{}/ws/chat?token={}&epid={}", base, e(access_token), e(&epid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_url_scheme_and_path() {
        let url = realtime_url("https://campus.example.edu/", "tok en+1");
        assert!(url.starts_with("wss://campus.example.edu/ws/chat?token=tok+en%2B1&epid="));

        let url = realtime_url("http://localhost:3000", "t");
        assert!(url.starts_with("ws://localhost:3000/ws/chat?token=t&epid="));
    }
}
