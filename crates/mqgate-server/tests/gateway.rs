//! End-to-end gateway tests against a stub protocol engine.
//!
//! The stub speaks a one-line-per-request protocol (`CONNECT`, `PUB`, `SUB`)
//! over whatever byte stream the gateway hands it, consults the real
//! auth/ACL hooks, and emits real engine events. Clients connect over actual
//! TCP and WebSocket sockets, so these tests cover listener wiring, frame
//! bridging, fan-out, and shutdown ordering together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use mqgate_auth::{AuthGate, CredentialStore, GatewayHooks};
use mqgate_core::{
    BrokerHooks, EngineError, EngineEvent, GATEWAY_CONNECTION_ID, Principal, ProtocolEngine,
    SessionConn,
};
use mqgate_server::{GatewayConfig, GatewayServer, RunningGateway};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const TICK: Duration = Duration::from_secs(5);

// ── stub engine ─────────────────────────────────────────────────────────

struct StubEngine {
    hooks: Arc<dyn BrokerHooks>,
    events: broadcast::Sender<EngineEvent>,
    closed: AtomicBool,
}

impl StubEngine {
    fn new(hooks: Arc<dyn BrokerHooks>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            hooks,
            events,
            closed: AtomicBool::new(false),
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl ProtocolEngine for StubEngine {
    async fn handle(&self, conn: SessionConn) {
        let SessionConn { id, stream, .. } = conn;
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();
        let mut principal: Option<Principal> = None;

        while let Ok(Some(line)) = lines.next_line().await {
            let mut parts = line.splitn(3, ' ');
            let reply = match parts.next() {
                Some("CONNECT") => {
                    let user = parts.next();
                    let pass = parts.next().map(str::as_bytes);
                    match self.hooks.authenticate(id, user, pass).await {
                        Ok(p) => {
                            self.emit(EngineEvent::Connect {
                                id,
                                principal: p.name.clone(),
                            });
                            let reply = format!("OK {}\n", p.name);
                            principal = Some(p);
                            reply
                        }
                        Err(err) => format!("ERR {err}\n"),
                    }
                }
                Some("PUB") => match (parts.next(), parts.next(), principal.as_ref()) {
                    (Some(topic), Some(payload), Some(p)) => {
                        match self
                            .hooks
                            .authorize_publish(id, p, topic, payload.as_bytes())
                            .await
                        {
                            Ok(()) => {
                                self.emit(EngineEvent::Publish {
                                    id,
                                    principal: p.name.clone(),
                                    topic: topic.to_string(),
                                    payload: Bytes::copy_from_slice(payload.as_bytes()),
                                });
                                "OK\n".to_string()
                            }
                            Err(err) => format!("DENY {err}\n"),
                        }
                    }
                    _ => "ERR bad request\n".to_string(),
                },
                Some("SUB") => match (parts.next(), principal.as_ref()) {
                    (Some(filter), Some(p)) => {
                        match self.hooks.authorize_subscribe(id, p, filter).await {
                            Ok(granted) => {
                                self.emit(EngineEvent::Subscribe {
                                    id,
                                    principal: p.name.clone(),
                                    topics: vec![granted.clone()],
                                });
                                format!("OK {granted}\n")
                            }
                            Err(err) => format!("DENY {err}\n"),
                        }
                    }
                    _ => "ERR bad request\n".to_string(),
                },
                _ => "ERR unknown\n".to_string(),
            };
            if write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }

        if principal.is_some() {
            self.emit(EngineEvent::Disconnect { id });
        }
    }

    fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn inject_publish(&self, topic: &str, payload: Bytes) -> Result<(), EngineError> {
        self.emit(EngineEvent::Publish {
            id: GATEWAY_CONNECTION_ID,
            principal: "gateway".to_string(),
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Engine that shuts its write half immediately and then drains its read
/// half to EOF, for exercising half-close through the bridge.
struct HalfCloseEngine {
    events: broadcast::Sender<EngineEvent>,
    reader_done: tokio::sync::Notify,
}

impl HalfCloseEngine {
    fn new() -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            events,
            reader_done: tokio::sync::Notify::new(),
        }
    }
}

#[async_trait]
impl ProtocolEngine for HalfCloseEngine {
    async fn handle(&self, conn: SessionConn) {
        let SessionConn { stream, .. } = conn;
        let (mut read, mut write) = tokio::io::split(stream);
        let _ = write.shutdown().await;
        let mut rest = Vec::new();
        let _ = read.read_to_end(&mut rest).await;
        self.reader_done.notify_one();
    }

    fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn inject_publish(&self, _topic: &str, _payload: Bytes) -> Result<(), EngineError> {
        Ok(())
    }

    async fn close(&self) {}
}

// ── harness ─────────────────────────────────────────────────────────────

async fn start_gateway() -> (RunningGateway, Arc<StubEngine>) {
    let mut cfg = GatewayConfig::demo();
    cfg.tcp.host = "127.0.0.1".into();
    cfg.tcp.port = 0;
    cfg.ws.host = "127.0.0.1".into();
    cfg.ws.port = 0;

    let hooks = Arc::new(GatewayHooks::new(
        AuthGate::new(CredentialStore::new(cfg.users.clone())),
        cfg.acl.clone(),
    ));
    let engine = Arc::new(StubEngine::new(hooks));

    let server = GatewayServer::new(cfg, Arc::clone(&engine) as Arc<dyn ProtocolEngine>);
    let running = server.start().await.expect("gateway start");
    (running, engine)
}

/// Line-oriented client over raw TCP.
struct TcpClient {
    reader: tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl TcpClient {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("tcp connect");
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("tcp write");
    }

    async fn recv(&mut self) -> String {
        timeout(TICK, self.reader.next_line())
            .await
            .expect("reply timeout")
            .expect("tcp read")
            .expect("stream closed")
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Line-oriented client over the framed endpoint.
struct WsClient {
    tx: futures::stream::SplitSink<WsStream, Message>,
    rx: futures::stream::SplitStream<WsStream>,
    buffer: String,
}

impl WsClient {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/mqtt"))
            .await
            .expect("ws connect");
        let (tx, rx) = ws.split();
        Self {
            tx,
            rx,
            buffer: String::new(),
        }
    }

    async fn send_frame(&mut self, bytes: &[u8]) {
        self.tx
            .send(Message::binary(bytes.to_vec()))
            .await
            .expect("ws send");
    }

    async fn send(&mut self, line: &str) {
        self.send_frame(format!("{line}\n").as_bytes()).await;
    }

    /// Read frames until one full reply line is buffered.
    async fn recv(&mut self) -> String {
        loop {
            if let Some(pos) = self.buffer.find('\n') {
                let line = self.buffer[..pos].to_string();
                self.buffer.drain(..=pos);
                return line;
            }
            let msg = timeout(TICK, self.rx.next())
                .await
                .expect("reply timeout")
                .expect("stream closed")
                .expect("ws read");
            if let Message::Binary(data) = msg {
                self.buffer.push_str(std::str::from_utf8(&data).expect("utf8"));
            }
        }
    }
}

/// Observer client on the events endpoint.
struct Observer {
    ws: WsStream,
}

impl Observer {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/events"))
            .await
            .expect("observer connect");
        Self { ws }
    }

    async fn recv(&mut self) -> serde_json::Value {
        loop {
            let msg = timeout(TICK, self.ws.next())
                .await
                .expect("record timeout")
                .expect("stream closed")
                .expect("ws read");
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).expect("record json");
            }
        }
    }

    /// Like `recv` but with a short deadline, for asserting silence.
    async fn try_recv(&mut self) -> Option<serde_json::Value> {
        match timeout(Duration::from_millis(300), self.ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                Some(serde_json::from_str(text.as_str()).expect("record json"))
            }
            _ => None,
        }
    }

    async fn send(&mut self, text: &str) {
        self.ws.send(Message::text(text)).await.expect("observer send");
    }
}

// ── byte-stream listener ────────────────────────────────────────────────

#[tokio::test]
async fn tcp_auth_publish_subscribe_flow() {
    let (running, _engine) = start_gateway().await;
    let mut client = TcpClient::connect(running.tcp_addr.unwrap()).await;

    client.send("CONNECT alice password123").await;
    assert_eq!(client.recv().await, "OK alice");

    client.send("PUB alice/status online").await;
    assert_eq!(client.recv().await, "OK");

    client.send("SUB common/news").await;
    assert_eq!(client.recv().await, "OK common/news");

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn tcp_invalid_credentials_rejected() {
    let (running, _engine) = start_gateway().await;
    let mut client = TcpClient::connect(running.tcp_addr.unwrap()).await;

    client.send("CONNECT carol nope").await;
    assert!(client.recv().await.starts_with("ERR"));

    client.send("CONNECT alice wrongpass").await;
    assert!(client.recv().await.starts_with("ERR"));

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn restricted_user_is_confined_to_its_prefix() {
    let (running, _engine) = start_gateway().await;
    let mut client = TcpClient::connect(running.tcp_addr.unwrap()).await;

    client.send("CONNECT bob secret").await;
    assert_eq!(client.recv().await, "OK bob");

    client.send("PUB common/news hi").await;
    assert!(client.recv().await.starts_with("DENY"));

    // Denial is per-operation: the session continues and in-prefix
    // operations still succeed.
    client.send("PUB bob/status hi").await;
    assert_eq!(client.recv().await, "OK");

    client.send("SUB bob/updates").await;
    assert_eq!(client.recv().await, "OK bob/updates");

    client.send("SUB admin/secret").await;
    assert!(client.recv().await.starts_with("DENY"));

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn reserved_namespace_denied_for_everyone() {
    let (running, _engine) = start_gateway().await;
    let mut client = TcpClient::connect(running.tcp_addr.unwrap()).await;

    client.send("CONNECT alice password123").await;
    assert_eq!(client.recv().await, "OK alice");

    client.send("PUB $SYS/stats x").await;
    assert!(client.recv().await.starts_with("DENY"));

    running.stop(Some(TICK)).await;
}

// ── framed listener ─────────────────────────────────────────────────────

#[tokio::test]
async fn framed_session_behaves_like_tcp() {
    let (running, _engine) = start_gateway().await;
    let mut client = WsClient::connect(running.ws_addr.unwrap()).await;

    client.send("CONNECT alice password123").await;
    assert_eq!(client.recv().await, "OK alice");

    client.send("PUB alice/status online").await;
    assert_eq!(client.recv().await, "OK");

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn frame_boundaries_are_invisible_to_the_engine() {
    let (running, _engine) = start_gateway().await;
    let mut client = WsClient::connect(running.ws_addr.unwrap()).await;

    // One request split across frames, with an empty frame in between;
    // the engine must see a single contiguous line.
    client.send_frame(b"CONNECT al").await;
    client.send_frame(b"").await;
    client.send_frame(b"ice password123\n").await;
    assert_eq!(client.recv().await, "OK alice");

    // Two requests in one frame arrive as two ordered replies.
    client.send_frame(b"PUB alice/a 1\nPUB alice/b 2\n").await;
    assert_eq!(client.recv().await, "OK");
    assert_eq!(client.recv().await, "OK");

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn engine_half_close_reaches_the_reader_as_eof() {
    let mut cfg = GatewayConfig::demo();
    cfg.tcp.enabled = false;
    cfg.ws.host = "127.0.0.1".into();
    cfg.ws.port = 0;

    let engine = Arc::new(HalfCloseEngine::new());
    let server = GatewayServer::new(cfg, Arc::clone(&engine) as Arc<dyn ProtocolEngine>);
    let running = server.start().await.expect("gateway start");

    let client = WsClient::connect(running.ws_addr.unwrap()).await;

    // The engine shut its writer but still holds its reader open. The
    // session must surface that as EOF rather than leaving the engine task
    // blocked on a socket nobody polls anymore.
    timeout(TICK, engine.reader_done.notified())
        .await
        .expect("engine reader never saw eof");

    drop(client);
    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn concurrent_sessions_never_interleave_replies() {
    let (running, _engine) = start_gateway().await;
    let mut tcp = TcpClient::connect(running.tcp_addr.unwrap()).await;
    let mut ws = WsClient::connect(running.ws_addr.unwrap()).await;

    tcp.send("CONNECT alice password123").await;
    ws.send("CONNECT bob secret").await;
    assert_eq!(tcp.recv().await, "OK alice");
    assert_eq!(ws.recv().await, "OK bob");

    // Interleave requests across the two live sessions; each must get
    // exactly its own replies back, in its own request order.
    for i in 0..10 {
        tcp.send(&format!("SUB alice/n{i}")).await;
        ws.send(&format!("SUB bob/n{i}")).await;
    }
    for i in 0..10 {
        assert_eq!(tcp.recv().await, format!("OK alice/n{i}"));
        assert_eq!(ws.recv().await, format!("OK bob/n{i}"));
    }

    running.stop(Some(TICK)).await;
}

// ── observer fan-out ────────────────────────────────────────────────────

#[tokio::test]
async fn observers_receive_identical_event_records() {
    let (running, _engine) = start_gateway().await;
    let ws_addr = running.ws_addr.unwrap();
    let mut obs1 = Observer::connect(ws_addr).await;
    let mut obs2 = Observer::connect(ws_addr).await;

    let mut client = TcpClient::connect(running.tcp_addr.unwrap()).await;
    client.send("CONNECT alice password123").await;
    assert_eq!(client.recv().await, "OK alice");

    let a = obs1.recv().await;
    let b = obs2.recv().await;
    assert_eq!(a["type"], "connect");
    assert_eq!(a["principalName"], "alice");
    assert_eq!(a, b);

    client.send("PUB alice/status online").await;
    assert_eq!(client.recv().await, "OK");

    let a = obs1.recv().await;
    let b = obs2.recv().await;
    assert_eq!(a["type"], "publish");
    assert_eq!(a["topic"], "alice/status");
    // Payload travels base64-encoded.
    assert_eq!(a["payload"], "b25saW5l");
    assert_eq!(a, b);

    drop(client);
    assert_eq!(obs1.recv().await["type"], "disconnect");

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn late_observer_misses_earlier_events() {
    let (running, _engine) = start_gateway().await;
    let ws_addr = running.ws_addr.unwrap();
    let mut early = Observer::connect(ws_addr).await;

    let mut client = TcpClient::connect(running.tcp_addr.unwrap()).await;
    client.send("CONNECT alice password123").await;
    assert_eq!(client.recv().await, "OK alice");
    assert_eq!(early.recv().await["type"], "connect");

    // No replay: a fresh observer starts from silence.
    let mut late = Observer::connect(ws_addr).await;
    assert!(late.try_recv().await.is_none());

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn observer_publish_is_injected_as_the_gateway() {
    let (running, _engine) = start_gateway().await;
    let ws_addr = running.ws_addr.unwrap();
    let mut watcher = Observer::connect(ws_addr).await;
    let mut sender = Observer::connect(ws_addr).await;

    sender
        .send(r#"{"type":"publish","topic":"common/alert","payload":"fire"}"#)
        .await;

    let record = watcher.recv().await;
    assert_eq!(record["type"], "publish");
    assert_eq!(record["topic"], "common/alert");
    assert_eq!(record["connectionId"], 0);

    running.stop(Some(TICK)).await;
}

#[tokio::test]
async fn malformed_observer_message_is_ignored() {
    let (running, _engine) = start_gateway().await;
    let ws_addr = running.ws_addr.unwrap();
    let mut watcher = Observer::connect(ws_addr).await;
    let mut sender = Observer::connect(ws_addr).await;

    sender.send("this is not json").await;
    sender.send(r#"{"type":"subscribe","topic":"x"}"#).await;

    // The connection survives bad input and a later valid request works.
    sender
        .send(r#"{"type":"publish","topic":"common/ok","payload":"y"}"#)
        .await;
    let record = watcher.recv().await;
    assert_eq!(record["topic"], "common/ok");

    running.stop(Some(TICK)).await;
}

// ── shutdown ────────────────────────────────────────────────────────────

#[tokio::test]
async fn shutdown_stops_intake_then_closes_engine() {
    let (running, engine) = start_gateway().await;
    let ws_addr = running.ws_addr.unwrap();
    let tcp_addr = running.tcp_addr.unwrap();
    let mut observer = Observer::connect(ws_addr).await;

    running.stop(Some(TICK)).await;
    assert!(engine.closed.load(Ordering::SeqCst));

    // The observer's connection ends rather than hanging.
    let ended = timeout(TICK, async {
        loop {
            match observer.ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());

    // New connections are refused once the listeners are gone.
    assert!(TcpStream::connect(tcp_addr).await.is_err());
}
