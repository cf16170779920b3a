//! The seam between the session state machine and the WebSocket library.

use async_trait::async_trait;
use futures_util::{Sink, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::debug;

/// Write half of an upstream socket.
pub type UpstreamSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
/// Read half of an upstream socket.
pub type UpstreamStream = Pin<Box<dyn Stream<Item = Result<Message, WsError>> + Send>>;

/// Opens upstream sockets. A successful return is the transport "open" event.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(UpstreamSink, UpstreamStream), WsError>;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<(UpstreamSink, UpstreamStream), WsError> {
        let (ws_stream, response) = connect_async(url).await?;
        debug!(status = %response.status(), "Upstream WebSocket handshake complete");
        let (sink, stream) = ws_stream.split();
        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
