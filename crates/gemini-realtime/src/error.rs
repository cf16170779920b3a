//! Error types and the best-effort transport failure classification.

use crate::config::API_KEY_PREFIX;
use tokio_tungstenite::tungstenite;

/// Credential validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not found in environment variables")]
    MissingApiKey,
    #[error("Invalid GEMINI_API_KEY format - should start with \"{prefix}\"", prefix = API_KEY_PREFIX)]
    MalformedApiKey,
}

/// Errors surfaced by the upstream session.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("WebSocket error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Category of a transport-level failure, derived from the error text.
///
/// The upstream handshake failures only surface as HTTP status lines inside
/// the error message, so this is substring matching and can drift if the
/// wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    InvalidCredential,
    AccessDenied,
    RateLimited,
    Unavailable,
    Connection,
}

/// Ordered pattern table; the first match wins.
const CLASSIFICATION: &[(&str, TransportFailure)] = &[
    ("401", TransportFailure::InvalidCredential),
    ("Unauthorized", TransportFailure::InvalidCredential),
    ("403", TransportFailure::AccessDenied),
    ("429", TransportFailure::RateLimited),
    ("500", TransportFailure::Unavailable),
];

impl TransportFailure {
    pub fn classify(message: &str) -> Self {
        CLASSIFICATION
            .iter()
            .find(|(pattern, _)| message.contains(pattern))
            .map(|(_, failure)| *failure)
            .unwrap_or(TransportFailure::Connection)
    }

    /// The notification text shown to the client for this category.
    pub fn client_message(self) -> &'static str {
        match self {
            TransportFailure::InvalidCredential => "Invalid API key - check your GEMINI_API_KEY",
            TransportFailure::AccessDenied => "API access denied - check permissions",
            TransportFailure::RateLimited => "Rate limit exceeded - please wait",
            TransportFailure::Unavailable => "AI service temporarily unavailable",
            TransportFailure::Connection => "Connection to AI service failed",
        }
    }
}
