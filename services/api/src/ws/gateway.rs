//! The per-client relay state machine.
//!
//! A [`Gateway`] owns at most one upstream [`LiveSession`] and decides, for
//! every message the browser sends, whether to start, feed or end it. Replies
//! that can be decided locally are returned directly; everything produced by
//! the upstream session is read with [`Gateway::next_event`] and passed back
//! through [`Gateway::on_event`]. Each `start_session` gets a fresh event
//! channel, so nothing queued by a previous session leaks into the next one.

use super::protocol::{ClientMessage, ServerMessage};
use gemini_realtime::{Connector, LiveConfig, LiveSession, RelayEvent, event::NOT_CONNECTED};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// No session has been requested yet.
    Idle,
    /// The upstream socket is being opened or awaits `setupComplete`.
    Starting,
    /// The upstream session is ready for audio.
    Active,
    /// The client ended the session, or the upstream session stopped on its
    /// own. A new `start_session` may follow.
    Ended,
}

pub struct Gateway {
    live_config: Arc<LiveConfig>,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<RelayEvent>,
    events_rx: mpsc::UnboundedReceiver<RelayEvent>,
    session: Option<LiveSession>,
    state: GatewayState,
}

impl Gateway {
    pub fn new(live_config: Arc<LiveConfig>, connector: Arc<dyn Connector>) -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();
        Self {
            live_config,
            connector,
            events,
            events_rx,
            session: None,
            state: GatewayState::Idle,
        }
    }

    /// The current state. A session whose driver has stopped (normal close or
    /// exhausted reconnects) reports `Ended`.
    pub fn state(&self) -> GatewayState {
        match self.state {
            GatewayState::Starting | GatewayState::Active if !self.session_running() => {
                GatewayState::Ended
            }
            state => state,
        }
    }

    /// Waits for the next notification from the current upstream session.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to the client socket.
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        self.events_rx.recv().await
    }

    /// Handles one text frame from the client.
    ///
    /// Returns the reply to send immediately, if any. Frames that are not valid
    /// JSON, or lack a `type`, are answered with a `Server error`.
    pub async fn handle_text(&mut self, text: &str) -> Option<ServerMessage> {
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => {
                warn!(error = %e, "Failed to parse client message");
                Some(ServerMessage::error(format!("Server error: {}", e)))
            }
        }
    }

    pub async fn handle_message(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::StartSession => self.start().await,
            ClientMessage::AudioData { audio } => self.forward_audio(audio.unwrap_or_default()).await,
            ClientMessage::EndSession => {
                self.end().await;
                None
            }
            ClientMessage::Ping => Some(ServerMessage::Pong),
            ClientMessage::Unknown => {
                warn!("Ignoring unknown client message type");
                None
            }
        }
    }

    /// Converts an upstream event for the client, advancing `Starting` to `Active` on ready.
    pub fn on_event(&mut self, event: RelayEvent) -> ServerMessage {
        self.state = self.state();
        if event == RelayEvent::Ready && self.state == GatewayState::Starting {
            info!("Upstream session is ready");
            self.state = GatewayState::Active;
        }
        ServerMessage::from(event)
    }

    /// Ends the upstream session, if one is open. Safe to call more than once.
    pub async fn end(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!("Ending upstream session");
            session.disconnect().await;
        }
        if self.state != GatewayState::Idle {
            self.state = GatewayState::Ended;
        }
    }

    async fn start(&mut self) -> Option<ServerMessage> {
        info!(state = ?self.state, "Starting upstream session");
        let mut session = self.session.take().unwrap_or_else(|| {
            LiveSession::new(Arc::clone(&self.live_config), Arc::clone(&self.connector))
        });

        // Drop whatever the previous session left unread.
        let (events, events_rx) = mpsc::unbounded_channel();
        self.events = events;
        self.events_rx = events_rx;

        match session.connect(self.events.clone()).await {
            Ok(()) => {
                self.session = Some(session);
                self.state = GatewayState::Starting;
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to start upstream session");
                session.disconnect().await;
                self.state = GatewayState::Idle;
                Some(ServerMessage::error(format!("Connection error: {}", e)))
            }
        }
    }

    async fn forward_audio(&mut self, audio: String) -> Option<ServerMessage> {
        let Some(session) = &self.session else {
            warn!(state = ?self.state, "Audio received without an upstream session");
            return Some(ServerMessage::error(NOT_CONNECTED));
        };
        debug!(size = audio.len(), "Forwarding client audio");
        session.send_audio(audio).await;
        None
    }

    fn session_running(&self) -> bool {
        self.session.as_ref().is_some_and(LiveSession::is_running)
    }
}
