//! Rev Voice API Library Crate
//!
//! This library contains the web service that relays browser voice sessions
//! to the Gemini Live API: configuration, application state, HTTP handlers,
//! the WebSocket relay and routing. The `api` binary is a thin wrapper around
//! this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
