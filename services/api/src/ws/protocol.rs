//! Defines the WebSocket message protocol between the browser client and the relay.

use gemini_realtime::RelayEvent;
use serde::{Deserialize, Serialize};

pub const READY_MESSAGE: &str = "AI assistant is ready to chat!";

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the upstream session.
    StartSession,
    /// One encoded audio chunk; forwarded upstream as a complete turn.
    AudioData {
        #[serde(default)]
        audio: Option<String>,
    },
    /// Closes the upstream session.
    EndSession,
    /// Keepalive; answered with `pong` in any state.
    Ping,
    /// Any other `type`. Logged and ignored.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The upstream handshake completed.
    Ready { message: String },
    /// A chunk of model audio, passed through untouched.
    Audio { data: String },
    /// The model finished its turn.
    TurnComplete,
    /// The model turn was interrupted.
    Interrupted,
    /// A recoverable or terminal failure.
    Error { message: String },
    /// Reply to `ping`.
    Pong,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

impl From<RelayEvent> for ServerMessage {
    fn from(event: RelayEvent) -> Self {
        match event {
            RelayEvent::Ready => ServerMessage::Ready {
                message: READY_MESSAGE.to_string(),
            },
            RelayEvent::Audio { data } => ServerMessage::Audio { data },
            RelayEvent::TurnComplete => ServerMessage::TurnComplete,
            RelayEvent::Interrupted => ServerMessage::Interrupted,
            RelayEvent::Error { message } => ServerMessage::Error { message },
        }
    }
}
