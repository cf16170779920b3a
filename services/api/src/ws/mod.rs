//! WebSocket Relay
//!
//! This module contains the browser-facing side of the voice relay. It is
//! structured into submodules:
//!
//! - `protocol`: Defines the JSON message format between browser and relay.
//! - `gateway`: The per-client state machine that owns the upstream session.
//! - `session`: Manages the WebSocket connection lifecycle and the relay loop.

pub mod gateway;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
