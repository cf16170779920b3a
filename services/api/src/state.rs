//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the configuration
//! and the upstream connector shared by every relay session.

use crate::config::Config;
use gemini_realtime::{Connector, LiveConfig};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Upstream session parameters, identical for every client.
    pub live_config: Arc<LiveConfig>,
    pub connector: Arc<dyn Connector>,
}
