//! Client-facing notifications and the upstream frame translation.

use crate::types::ServerMessage;
use tracing::debug;

pub const NOT_CONNECTED: &str = "Not connected to AI service";
pub const NO_AUDIO: &str = "No audio data received";
pub const PARSE_FAILED: &str = "Failed to parse AI response";
pub const SEND_FAILED: &str = "Failed to send audio to AI";
pub const SETUP_FAILED: &str = "Failed to setup AI session";

/// A notification from an upstream session to its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// The upstream handshake completed.
    Ready,
    /// One inline audio fragment, forwarded as received.
    Audio { data: String },
    TurnComplete,
    Interrupted,
    /// A recoverable or terminal failure description.
    Error { message: String },
}

impl RelayEvent {
    pub fn error(message: impl Into<String>) -> Self {
        RelayEvent::Error {
            message: message.into(),
        }
    }
}

/// Translates one upstream frame into client notifications, in frame order.
///
/// A setup acknowledgement yields only `Ready`. Otherwise audio parts come
/// first, then turn-complete, then interrupted, then any error frame. The
/// turn-complete and interrupted flags are checked independently.
pub fn translate(frame: ServerMessage) -> Vec<RelayEvent> {
    if frame.setup_complete.is_some() {
        return vec![RelayEvent::Ready];
    }

    let mut events = Vec::new();
    if let Some(content) = frame.server_content {
        let parts = content.model_turn.map(|turn| turn.parts).unwrap_or_default();
        for part in parts {
            if let Some(text) = &part.text {
                debug!(len = text.len(), "Dropping text part from model turn");
            }
            if let Some(data) = part.into_audio() {
                events.push(RelayEvent::Audio { data });
            }
        }
        if content.turn_complete == Some(true) {
            events.push(RelayEvent::TurnComplete);
        }
        if content.interrupted == Some(true) {
            events.push(RelayEvent::Interrupted);
        }
    }

    if let Some(err) = frame.error {
        let message = err.message.as_deref().unwrap_or("Unknown error");
        events.push(RelayEvent::error(format!("AI Error: {}", message)));
    }
    events
}
