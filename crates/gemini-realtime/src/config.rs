//! Session configuration: credential, handshake content and reconnect policy.

use crate::error::ConfigError;
use crate::types::{
    BidiGenerateContentSetup, ClientMessage, Content, GenerationConfig, Part, PrebuiltVoiceConfig,
    ResponseModality, SpeechConfig, VoiceConfig,
};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-live-001";
pub const DEFAULT_VOICE: &str = "Aoede";
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";
/// MIME type attached to every audio chunk forwarded from the browser.
pub const CLIENT_AUDIO_MIME_TYPE: &str = "audio/webm";
pub const API_KEY_PREFIX: &str = "AI";

/// A Gemini API key that passed the shape check.
///
/// `Debug` and `masked` never print more than the first ten characters.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !raw.starts_with(API_KEY_PREFIX) {
            return Err(ConfigError::MalformedApiKey);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The first `n` characters of the key.
    pub fn prefix(&self, n: usize) -> &str {
        char_prefix(&self.0, n)
    }

    pub fn masked(&self) -> String {
        mask(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn char_prefix(raw: &str, n: usize) -> &str {
    match raw.char_indices().nth(n) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

fn mask(raw: &str) -> String {
    format!("{}...", char_prefix(raw, 10))
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

/// Bounded reconnection after abnormal upstream closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive abnormal closes tolerated before the session gives up.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl ReconnectPolicy {
    /// Whether another attempt is allowed after `failures` consecutive abnormal closes.
    pub fn should_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }
}

/// Everything a session needs to open and configure an upstream connection.
///
/// Built once at startup and shared read-only between sessions. `Debug`
/// masks the credential.
#[derive(Clone)]
pub struct LiveConfig {
    /// Raw credential; validated on every `connect`.
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub system_instruction: String,
    pub endpoint: String,
    pub audio_mime_type: String,
    pub reconnect: ReconnectPolicy,
}

impl fmt::Debug for LiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveConfig")
            .field("api_key", &mask(&self.api_key))
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("system_instruction", &self.system_instruction)
            .field("endpoint", &self.endpoint)
            .field("audio_mime_type", &self.audio_mime_type)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

impl LiveConfig {
    pub fn new(api_key: impl Into<String>, system_instruction: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            temperature: 0.7,
            max_output_tokens: 1024,
            system_instruction: system_instruction.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            audio_mime_type: CLIENT_AUDIO_MIME_TYPE.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// The upstream URL with the credential attached as a query parameter.
    pub fn url(&self, api_key: &ApiKey) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", self.endpoint, separator, api_key.expose())
    }

    /// Builds the handshake frame sent once per opened socket.
    pub fn setup_message(&self) -> ClientMessage {
        let model = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        ClientMessage::Setup(BidiGenerateContentSetup {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec![ResponseModality::Audio],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice.clone(),
                        },
                    },
                },
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(self.system_instruction.clone())],
            },
        })
    }
}
