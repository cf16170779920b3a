//! Wire types for the Gemini Live `BidiGenerateContent` WebSocket protocol.
//!
//! Outbound frames are serialized with camelCase keys. Inbound frames accept
//! both camelCase and snake_case keys, since the service has been observed to
//! emit either depending on the API version.

use serde::{Deserialize, Serialize};

// --- Client -> Gemini ---

/// A frame sent from the relay to Gemini.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// The one-time handshake frame, sent once per opened socket.
    Setup(BidiGenerateContentSetup),
    /// One or more complete conversation turns.
    ClientContent(BidiGenerateContentClientContent),
}

impl ClientMessage {
    /// Wraps an opaque audio payload as a complete, single-part user turn.
    pub fn audio_turn(mime_type: &str, data: String) -> Self {
        ClientMessage::ClientContent(BidiGenerateContentClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::inline_data(mime_type, data)],
            }],
            turn_complete: true,
        })
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BidiGenerateContentSetup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    pub speech_config: SpeechConfig,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Text,
    Audio,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BidiGenerateContentClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_data(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

// --- Gemini -> Client ---

/// A frame received from Gemini. Exactly one of the fields is normally set.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, alias = "setup_complete")]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default, alias = "server_content")]
    pub server_content: Option<LiveServerContent>,
    #[serde(default)]
    pub error: Option<ServerError>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerContent {
    #[serde(default, alias = "model_turn")]
    pub model_turn: Option<ServerContentTurn>,
    #[serde(default, alias = "turn_complete")]
    pub turn_complete: Option<bool>,
    #[serde(default)]
    pub interrupted: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerContentTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data")]
    pub inline_data: Option<ServerBlob>,
}

impl ServerPart {
    /// Returns the audio payload of this part, if it carries inline audio.
    ///
    /// Parts without a MIME type are treated as audio, since the session only
    /// requests the AUDIO response modality.
    pub fn into_audio(self) -> Option<String> {
        let blob = self.inline_data?;
        match blob.mime_type.as_deref() {
            None => Some(blob.data),
            Some(mime) if mime.starts_with("audio/") => Some(blob.data),
            Some(_) => None,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerBlob {
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerError {
    #[serde(default)]
    pub message: Option<String>,
}
