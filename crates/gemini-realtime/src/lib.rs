//! Gemini Live Relay Client
//!
//! A client for the Gemini Live `BidiGenerateContent` WebSocket API, shaped
//! for relaying a browser voice session: one [`LiveSession`] per browser
//! client, a one-time setup handshake per socket, one complete user turn per
//! audio chunk, and bounded reconnection after abnormal closes.
//!
//! - `types`: the JSON wire frames.
//! - `config`: credential validation, handshake content and reconnect policy.
//! - `transport`: the [`Connector`] seam and its `tokio-tungstenite` implementation.
//! - `event`: client-facing [`RelayEvent`]s and upstream frame translation.
//! - `session`: the per-client state machine.

pub mod config;
pub mod error;
pub mod event;
pub mod session;
pub mod transport;
pub mod types;

pub use config::{ApiKey, LiveConfig, ReconnectPolicy};
pub use error::{ConfigError, LiveError, TransportFailure};
pub use event::RelayEvent;
pub use session::{EventSender, LiveSession};
pub use transport::{Connector, TungsteniteConnector};
