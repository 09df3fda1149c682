/// WebSocket connection implementation for DisplayConnection trait
use std::fmt::Debug;
use tracing::{debug, error, warn};

use axum::extract::ws::Message::{Binary, Close, Ping, Pong, Text};
use axum::extract::ws::WebSocket;
use futures_util::StreamExt;

use crate::protocol::{
    ChannelMessage, ConnectionError, ConnectionResult, DisplayConnection, Envelope,
};

/// Display channel over a WebSocket.
///
/// Binary frames carry raw bytes (output towards the display, input from
/// it). Text frames carry a JSON [`Envelope`].
pub struct WebSocketConnection {
    pub socket: WebSocket,
    pub id: String,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, id: String) -> Self {
        Self { socket, id }
    }
}

impl Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("id", &self.id)
            .finish()
    }
}

#[async_trait::async_trait]
impl DisplayConnection for WebSocketConnection {
    async fn send(&mut self, message: ChannelMessage) -> ConnectionResult<()> {
        let frame = match message {
            ChannelMessage::Output(bytes) | ChannelMessage::Input(bytes) => Binary(bytes),
            ChannelMessage::Exit(exit) => {
                let json = serde_json::to_string(&Envelope::from(&exit))
                    .map_err(|e| ConnectionError::Serialization(e.to_string()))?;
                Text(json)
            }
        };
        self.socket
            .send(frame)
            .await
            .map_err(|e| ConnectionError::WebSocket(e.to_string()))
    }

    async fn receive(&mut self) -> Option<ConnectionResult<ChannelMessage>> {
        loop {
            match self.socket.next().await {
                Some(Ok(Binary(bin))) => {
                    debug!("WebSocket {} received {} input bytes", self.id, bin.len());
                    return Some(Ok(ChannelMessage::Input(bin)));
                }
                Some(Ok(Text(text))) => match serde_json::from_str::<Envelope>(&text) {
                    Ok(envelope) => return Some(Ok(envelope.into())),
                    Err(e) => {
                        warn!("WebSocket {} sent an unreadable envelope: {}", self.id, e);
                    }
                },
                // axum answers pings itself
                Some(Ok(Ping(_))) | Some(Ok(Pong(_))) => {}
                Some(Ok(Close(_))) => {
                    debug!("WebSocket {} received close message", self.id);
                    return None;
                }
                Some(Err(e)) => {
                    error!("WebSocket {} receive error: {}", self.id, e);
                    return Some(Err(ConnectionError::WebSocket(e.to_string())));
                }
                None => {
                    debug!("WebSocket {} connection closed", self.id);
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> ConnectionResult<()> {
        self.socket
            .send(Close(None))
            .await
            .map_err(|e| ConnectionError::WebSocket(e.to_string()))
    }

    fn id(&self) -> &str {
        &self.id
    }
}
