//! Upstream session: one Gemini Live socket per browser client.
//!
//! `LiveSession` is the handle owned by the client gateway. The socket itself
//! lives in a spawned driver task that performs the handshake, translates
//! frames in both directions and applies the reconnect policy. Notifications
//! flow back over an unbounded channel, so the driver never waits on the
//! client and frame order is preserved.

use crate::config::{ApiKey, LiveConfig};
use crate::error::{LiveError, TransportFailure};
use crate::event::{
    NO_AUDIO, NOT_CONNECTED, PARSE_FAILED, RelayEvent, SEND_FAILED, SETUP_FAILED, translate,
};
use crate::transport::{Connector, UpstreamSink, UpstreamStream};
use crate::types::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message, protocol::CloseFrame};
use tracing::{Instrument, debug, error, info, info_span, warn};

pub const NORMAL_CLOSURE: u16 = 1000;
pub const NO_STATUS_RECEIVED: u16 = 1005;
pub const ABNORMAL_CLOSURE: u16 = 1006;

const COMMAND_BUFFER: usize = 128;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Sender half of the notification channel; the session's client handle.
pub type EventSender = mpsc::UnboundedSender<RelayEvent>;

#[derive(Debug)]
enum Command {
    Audio(String),
    Close,
}

struct Running {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

/// The per-client handle to an upstream Gemini Live connection.
pub struct LiveSession {
    config: Arc<LiveConfig>,
    connector: Arc<dyn Connector>,
    connected: Arc<AtomicBool>,
    events: Option<EventSender>,
    running: Option<Running>,
}

impl LiveSession {
    pub fn new(config: Arc<LiveConfig>, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            connected: Arc::new(AtomicBool::new(false)),
            events: None,
            running: None,
        }
    }

    /// True while an upstream socket is open and the setup frame has been queued ahead of any audio.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// True while the driver task is alive, including during a reconnect delay.
    ///
    /// Turns false once the session is disconnected, the upstream closed
    /// normally or the reconnect attempts are exhausted.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Validates the credential and starts the upstream driver.
    ///
    /// Fails with [`LiveError::Config`] before any socket is opened if the key
    /// is missing or malformed. Any previous driver is shut down first, so a
    /// session never holds two sockets.
    pub async fn connect(&mut self, events: EventSender) -> Result<(), LiveError> {
        let api_key = ApiKey::parse(&self.config.api_key)?;
        info!(api_key = %api_key.masked(), model = %self.config.model, "Connecting to Gemini Live API");

        self.disconnect().await;

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let driver = Driver {
            url: self.config.url(&api_key),
            config: Arc::clone(&self.config),
            connector: Arc::clone(&self.connector),
            events: events.clone(),
            commands: commands_rx,
            connected: Arc::clone(&self.connected),
            failures: 0,
        };
        let span = info_span!("upstream", model = %self.config.model);
        let task = tokio::spawn(driver.run().instrument(span));

        self.events = Some(events);
        self.running = Some(Running {
            commands: commands_tx,
            task,
        });
        Ok(())
    }

    /// Forwards one audio chunk as a complete user turn.
    ///
    /// Rejections are reported to the client, never to the caller.
    pub async fn send_audio(&self, payload: String) {
        let running = match &self.running {
            Some(running) if self.is_connected() => running,
            _ => {
                warn!("Audio received while not connected to Gemini");
                self.notify(RelayEvent::error(NOT_CONNECTED));
                return;
            }
        };
        if payload.is_empty() {
            warn!("Empty audio chunk rejected");
            self.notify(RelayEvent::error(NO_AUDIO));
            return;
        }

        debug!(size = payload.len(), "Queueing audio for Gemini");
        match running.commands.try_send(Command::Audio(payload)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                error!("Upstream socket is not draining audio; chunk dropped");
                self.notify(RelayEvent::error(SEND_FAILED));
            }
            Err(TrySendError::Closed(_)) => {
                error!("Upstream driver has stopped; audio dropped");
                self.notify(RelayEvent::error(SEND_FAILED));
            }
        }
    }

    /// Closes the upstream socket and cancels any pending reconnect.
    ///
    /// Idempotent: a second call finds no driver and does nothing.
    pub async fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        let Some(Running { commands, mut task }) = self.running.take() else {
            return;
        };

        // Closed: the driver already exited. Full: it is stuck on the socket
        // and the grace timeout below aborts it.
        if let Err(TrySendError::Full(_)) = commands.try_send(Command::Close) {
            warn!("Upstream command queue is full; close request not queued");
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
            warn!("Upstream driver did not stop in time; aborting it");
            task.abort();
            let _ = task.await;
        }
        self.connected.store(false, Ordering::SeqCst);
        info!("Disconnected from Gemini Live API");
    }

    fn notify(&self, event: RelayEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

/// Why a single socket's lifetime ended.
enum LinkOutcome {
    Closed { code: u16, reason: String },
    Shutdown,
}

/// Owns the upstream socket across reconnects.
struct Driver {
    config: Arc<LiveConfig>,
    connector: Arc<dyn Connector>,
    url: String,
    events: EventSender,
    commands: mpsc::Receiver<Command>,
    connected: Arc<AtomicBool>,
    /// Consecutive abnormal closes; reset when a socket opens.
    failures: u32,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let outcome = match self.open().await {
                None => LinkOutcome::Shutdown,
                Some(Ok((sink, stream))) => self.serve(sink, stream).await,
                Some(Err(e)) => {
                    self.on_transport_error(&e);
                    LinkOutcome::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: e.to_string(),
                    }
                }
            };
            self.connected.store(false, Ordering::SeqCst);

            let (code, reason) = match outcome {
                LinkOutcome::Shutdown => break,
                LinkOutcome::Closed { code, reason } => (code, reason),
            };
            info!(code, %reason, "Disconnected from Gemini Live API");
            if code == NORMAL_CLOSURE {
                break;
            }

            self.failures += 1;
            if !self.config.reconnect.should_retry(self.failures) {
                error!(failures = self.failures, code, "Reconnect attempts exhausted");
                self.notify(RelayEvent::error(format!(
                    "Connection closed: {} {}",
                    code, reason
                )));
                break;
            }

            info!(
                attempt = self.failures,
                max = self.config.reconnect.max_attempts,
                delay = ?self.config.reconnect.delay,
                "Scheduling reconnect"
            );
            if !self.wait_before_reconnect().await {
                info!("Pending reconnect cancelled");
                break;
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        debug!("Upstream driver finished");
    }

    /// Opens a socket, returning `None` if the session was closed meanwhile.
    async fn open(&mut self) -> Option<Result<(UpstreamSink, UpstreamStream), WsError>> {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let connecting = connector.connect(&url);
        tokio::pin!(connecting);

        loop {
            tokio::select! {
                result = &mut connecting => return Some(result),
                command = self.commands.recv() => match command {
                    Some(Command::Audio(_)) => self.notify(RelayEvent::error(NOT_CONNECTED)),
                    Some(Command::Close) | None => return None,
                },
            }
        }
    }

    /// Runs one open socket until it closes or the session shuts down.
    async fn serve(&mut self, mut sink: UpstreamSink, mut stream: UpstreamStream) -> LinkOutcome {
        info!("Connected to Gemini Live API");
        self.failures = 0;
        self.connected.store(true, Ordering::SeqCst);

        // Setup goes out before the command queue is read, so it always precedes audio.
        let setup = self.config.setup_message();
        match send_json(&mut sink, &setup).await {
            Ok(()) => info!(model = %self.config.model, "Sent session setup"),
            Err(e) => {
                error!(error = %e, "Failed to send setup message");
                self.notify(RelayEvent::error(SETUP_FAILED));
            }
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Audio(data)) => self.forward_audio(&mut sink, data).await,
                    Some(Command::Close) | None => {
                        if let Err(e) = sink.close().await {
                            debug!(error = %e, "Error while closing upstream socket");
                        }
                        return LinkOutcome::Shutdown;
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.on_frame(text.as_str()),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => self.on_frame(text),
                        Err(e) => {
                            error!(error = %e, "Binary frame from Gemini is not UTF-8");
                            self.notify(RelayEvent::error(PARSE_FAILED));
                        }
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(e) = sink.send(Message::Pong(payload)).await {
                            warn!(error = %e, "Failed to answer upstream ping");
                        }
                    }
                    Some(Ok(Message::Close(frame))) => return close_outcome(frame),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.on_transport_error(&e);
                        return LinkOutcome::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: e.to_string(),
                        };
                    }
                    None => {
                        return LinkOutcome::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: "connection dropped".to_string(),
                        };
                    }
                },
            }
        }
    }

    async fn forward_audio(&self, sink: &mut UpstreamSink, data: String) {
        let size = data.len();
        let message = ClientMessage::audio_turn(&self.config.audio_mime_type, data);
        match send_json(sink, &message).await {
            Ok(()) => debug!(size, "Audio sent to Gemini"),
            Err(e) => {
                error!(error = %e, "Failed to send audio");
                self.notify(RelayEvent::error(SEND_FAILED));
            }
        }
    }

    fn on_frame(&self, text: &str) {
        let frame: ServerMessage = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to parse Gemini message");
                self.notify(RelayEvent::error(PARSE_FAILED));
                return;
            }
        };
        for event in translate(frame) {
            match &event {
                RelayEvent::Ready => info!("Gemini setup complete"),
                RelayEvent::Audio { data } => debug!(size = data.len(), "Relaying audio"),
                RelayEvent::Error { message } => warn!(%message, "Gemini reported an error"),
                other => debug!(event = ?other, "Relaying event"),
            }
            self.notify(event);
        }
    }

    fn on_transport_error(&self, e: &WsError) {
        let failure = TransportFailure::classify(&e.to_string());
        error!(error = %e, ?failure, "Gemini WebSocket error");
        self.notify(RelayEvent::error(failure.client_message()));
    }

    /// Sleeps out the reconnect delay. Returns `false` if the session closed meanwhile.
    async fn wait_before_reconnect(&mut self) -> bool {
        let delay = tokio::time::sleep(self.config.reconnect.delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = &mut delay => return true,
                command = self.commands.recv() => match command {
                    Some(Command::Audio(_)) => self.notify(RelayEvent::error(NOT_CONNECTED)),
                    Some(Command::Close) | None => return false,
                },
            }
        }
    }

    fn notify(&self, event: RelayEvent) {
        if self.events.send(event).is_err() {
            debug!("Client is gone; dropping notification");
        }
    }
}

fn close_outcome(frame: Option<CloseFrame>) -> LinkOutcome {
    match frame {
        Some(frame) => LinkOutcome::Closed {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_string(),
        },
        None => LinkOutcome::Closed {
            code: NO_STATUS_RECEIVED,
            reason: String::new(),
        },
    }
}

async fn send_json(sink: &mut UpstreamSink, message: &ClientMessage) -> Result<(), LiveError> {
    let payload = serde_json::to_string(message)?;
    sink.send(Message::Text(payload.into())).await?;
    Ok(())
}
