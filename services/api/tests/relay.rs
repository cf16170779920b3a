//! End-to-end relay tests: a real server, a browser-side WebSocket client and
//! a local stand-in for the Gemini Live endpoint.

use futures_util::{SinkExt, StreamExt};
use gemini_realtime::{ApiKey, LiveConfig, TungsteniteConnector};
use rev_voice_api::{config::Config, router::create_router, state::AppState};
use serde_json::{Value, json};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::Level;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The test's handle on the fake Gemini endpoint.
struct Upstream {
    endpoint: String,
    /// Frames the relay sent after the setup frame. `None` marks the close.
    received: mpsc::UnboundedReceiver<Option<Value>>,
    /// Frames to push to the relay.
    outbound: mpsc::UnboundedSender<String>,
}

async fn spawn_upstream() -> Upstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/live", listener.local_addr().unwrap());
    let (received_tx, received) = mpsc::unbounded_channel();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        loop {
            tokio::select! {
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                        if frame.get("setup").is_some() {
                            ws.send(Message::Text(r#"{"setupComplete":{}}"#.into())).await.unwrap();
                        } else {
                            let _ = received_tx.send(Some(frame));
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                },
                Some(frame) = outbound_rx.recv() => {
                    ws.send(Message::Text(frame.into())).await.unwrap();
                }
            }
        }
        let _ = received_tx.send(None);
    });

    Upstream {
        endpoint,
        received,
        outbound,
    }
}

fn test_config(endpoint: &str, public_dir: PathBuf) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        gemini_api_key: ApiKey::parse("AIzaIntegrationTest").unwrap(),
        gemini_model: "gemini-2.0-flash-live-001".to_string(),
        gemini_voice: "Aoede".to_string(),
        gemini_ws_url: endpoint.to_string(),
        log_level: Level::INFO,
        prompts_path: PathBuf::from("./prompts"),
        public_dir,
        environment: "test".to_string(),
    }
}

async fn spawn_server(config: Config) -> SocketAddr {
    let live_config: LiveConfig = config.live_config("You are Rev.");
    let state = Arc::new(AppState {
        config: Arc::new(config),
        live_config: Arc::new(live_config),
        connector: Arc::new(TungsteniteConnector),
    });
    let app = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn send(client: &mut Client, msg: Value) {
    client
        .send(Message::Text(msg.to_string().into()))
        .await
        .unwrap();
}

async fn recv(client: &mut Client) -> Value {
    let next = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for the relay");
    match next {
        Some(Ok(Message::Text(text))) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_full_voice_turn_is_relayed() {
    let mut upstream = spawn_upstream().await;
    let addr = spawn_server(test_config(&upstream.endpoint, PathBuf::from("./public"))).await;
    let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    send(&mut client, json!({"type": "ping"})).await;
    assert_eq!(recv(&mut client).await, json!({"type": "pong"}));

    send(&mut client, json!({"type": "start_session"})).await;
    assert_eq!(
        recv(&mut client).await,
        json!({"type": "ready", "message": "AI assistant is ready to chat!"})
    );

    send(&mut client, json!({"type": "audio_data", "audio": "AAAA"})).await;
    let frame = upstream.received.recv().await.unwrap().unwrap();
    assert_eq!(
        frame["clientContent"]["turns"][0]["parts"][0]["inlineData"]["data"],
        "AAAA"
    );
    assert_eq!(frame["clientContent"]["turnComplete"], true);

    upstream
        .outbound
        .send(
            json!({
                "serverContent": {
                    "modelTurn": {"parts": [
                        {"text": "thinking"},
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "UklG"}}
                    ]},
                    "turnComplete": true
                }
            })
            .to_string(),
        )
        .unwrap();
    assert_eq!(
        recv(&mut client).await,
        json!({"type": "audio", "data": "UklG"})
    );
    assert_eq!(recv(&mut client).await, json!({"type": "turn_complete"}));

    upstream
        .outbound
        .send(json!({"error": {"message": "quota"}}).to_string())
        .unwrap();
    assert_eq!(
        recv(&mut client).await,
        json!({"type": "error", "message": "AI Error: quota"})
    );

    client.close(None).await.unwrap();
    assert_eq!(upstream.received.recv().await.unwrap(), None);
}

#[tokio::test]
async fn test_end_session_closes_upstream() {
    let mut upstream = spawn_upstream().await;
    let addr = spawn_server(test_config(&upstream.endpoint, PathBuf::from("./public"))).await;
    let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    send(&mut client, json!({"type": "start_session"})).await;
    assert_eq!(recv(&mut client).await["type"], "ready");

    send(&mut client, json!({"type": "end_session"})).await;
    assert_eq!(upstream.received.recv().await.unwrap(), None);

    send(&mut client, json!({"type": "audio_data", "audio": "AAAA"})).await;
    assert_eq!(
        recv(&mut client).await,
        json!({"type": "error", "message": "Not connected to AI service"})
    );
}

#[tokio::test]
async fn test_malformed_client_frame_keeps_connection_open() {
    let upstream = spawn_upstream().await;
    let addr = spawn_server(test_config(&upstream.endpoint, PathBuf::from("./public"))).await;
    let (mut client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    client
        .send(Message::Text("{oops".to_string().into()))
        .await
        .unwrap();
    let reply = recv(&mut client).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].as_str().unwrap().starts_with("Server error: "));

    send(&mut client, json!({"type": "ping"})).await;
    assert_eq!(recv(&mut client).await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_health_and_debug_endpoints() {
    let upstream = spawn_upstream().await;
    let addr = spawn_server(test_config(&upstream.endpoint, PathBuf::from("./public"))).await;

    let health = http_get(addr, "/health").await;
    assert!(health.starts_with("HTTP/1.1 200"));
    assert!(health.contains(r#""status":"OK""#));
    assert!(health.contains(r#""api_key_configured":true"#));

    let debug = http_get(addr, "/debug").await;
    assert!(debug.starts_with("HTTP/1.1 200"));
    assert!(debug.contains(r#""api_key_prefix":"AIzaI""#));
    assert!(!debug.contains("AIzaIntegrationTest"));
}

#[tokio::test]
async fn test_static_client_is_served() {
    let public_dir = std::env::temp_dir().join(format!("rev-voice-public-{}", std::process::id()));
    std::fs::create_dir_all(&public_dir).unwrap();
    std::fs::write(public_dir.join("index.html"), "<h1>Talk to Rev</h1>").unwrap();

    let upstream = spawn_upstream().await;
    let addr = spawn_server(test_config(&upstream.endpoint, public_dir.clone())).await;

    let index = http_get(addr, "/").await;
    assert!(index.starts_with("HTTP/1.1 200"));
    assert!(index.contains("Talk to Rev"));

    let missing = http_get(addr, "/nope.js").await;
    assert!(missing.starts_with("HTTP/1.1 404"));

    std::fs::remove_dir_all(public_dir).unwrap();
}
