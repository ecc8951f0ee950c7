//! WebSocket connection and frame handling for the realtime channel.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

use super::envelope::{self, Event};
use super::RealtimeError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub struct ChatSocket {
    stream: WsStream,
}

impl ChatSocket {
    /// Connect to the realtime endpoint.
    ///
    /// Auth is carried as a query parameter on the URL; a 401 during the
    /// upgrade is surfaced as `RealtimeError::Unauthorized` so the caller can
    /// refresh the token instead of blindly backing off.
    pub async fn connect(ws_url: &str) -> Result<Self, RealtimeError> {
        tracing::info!("Connecting realtime channel");
        tracing::debug!("WS URL: {}", ws_url);

        match connect_async(ws_url).await {
            Ok((stream, response)) => {
                tracing::info!("Realtime channel connected (status={})", response.status());
                Ok(Self { stream })
            }
            Err(tungstenite::Error::Http(response))
                if response.status() == StatusCode::UNAUTHORIZED =>
            {
                Err(RealtimeError::Unauthorized)
            }
            Err(e) => Err(RealtimeError::Transport(e)),
        }
    }

    /// Send one event frame.
    pub async fn send_event(&mut self, event: &Event) -> Result<(), RealtimeError> {
        let text = envelope::encode(event)
            .map_err(|e| RealtimeError::Protocol(format!("encode failed: {e}")))?;
        tracing::debug!("WS send: {}", text);
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(RealtimeError::Transport)
    }

    /// Receive the next substantive event.
    ///
    /// Transport pings, heartbeat `ping`/`pong` events, and frames this
    /// client version cannot interpret are handled here and never surfaced.
    /// Returns `Ok(None)` when the server closes the connection.
    pub async fn recv_event(&mut self) -> Result<Option<Event>, RealtimeError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);
                    match envelope::decode(&text) {
                        Some(Event::Ping) => {
                            self.send_event(&Event::Pong).await?;
                        }
                        Some(Event::Pong) => {
                            tracing::debug!("Heartbeat pong from server");
                        }
                        Some(event) => return Ok(Some(event)),
                        None => {}
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(RealtimeError::Transport)?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Realtime channel closed: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(RealtimeError::Transport(e));
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }
}
