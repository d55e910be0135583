//! Test helpers for integration tests
//!
//! `MockGatewayTransport` hands every opened connection to the test as a
//! `GatewayPeer`, which plays the remote side of the gateway. `MockHttpTransport`
//! answers REST calls from canned responses keyed by path and records every
//! request it sees.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shardline_common::{ClientConfig, ClientError, ClientResult};
use shardline_gateway::protocol::{GatewayMessage, OpCode};
use shardline_gateway::{Client, Connection, GatewayTransport, OutboundFrame, TransportEvent};
use shardline_http::{HttpTransport, RestRequest, RestResponse};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// How long a helper waits for something to arrive before failing the test
pub const WAIT: Duration = Duration::from_secs(10);

pub const TEST_TOKEN: &str = "MTA1.Gx9k2a.abcdefghijklmnop";

/// Config with short reconnect delays. Shard starts keep the 5s stagger.
pub fn test_config() -> ClientConfig {
    ClientConfig::new(TEST_TOKEN)
        .with_reconnect_delay(Duration::from_millis(10))
        .with_max_ratelimit_wait(Duration::from_secs(1))
}

/// Remote side of one gateway connection
pub struct GatewayPeer {
    pub url: String,
    events: mpsc::Sender<TransportEvent>,
    frames: mpsc::Receiver<OutboundFrame>,
}

impl GatewayPeer {
    /// Deliver a frame to the shard
    pub async fn push(&self, message: &GatewayMessage) {
        let text = message.to_json().expect("frame serializes");
        self.events
            .send(TransportEvent::Message(text))
            .await
            .expect("shard is reading");
    }

    /// Close the connection from the remote side
    pub async fn close(&self, code: u16, reason: &str) {
        let _ = self
            .events
            .send(TransportEvent::Close {
                code,
                reason: reason.to_string(),
            })
            .await;
    }

    /// Next outbound frame that is not a heartbeat
    pub async fn next_frame(&mut self) -> OutboundFrame {
        loop {
            let frame = timeout(WAIT, self.frames.recv())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed");
            if let OutboundFrame::Text(text) = &frame {
                let message = GatewayMessage::from_json(text).expect("valid frame");
                if message.op == OpCode::Heartbeat {
                    continue;
                }
            }
            return frame;
        }
    }

    /// Next non-heartbeat frame, which must be a text frame
    pub async fn next_message(&mut self) -> GatewayMessage {
        match self.next_frame().await {
            OutboundFrame::Text(text) => GatewayMessage::from_json(&text).expect("valid frame"),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Gateway transport whose connections are driven by the test
pub struct MockGatewayTransport {
    peers: mpsc::UnboundedSender<GatewayPeer>,
}

impl MockGatewayTransport {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<GatewayPeer>) {
        let (peers, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { peers }), receiver)
    }
}

#[async_trait]
impl GatewayTransport for MockGatewayTransport {
    async fn open(&self, url: &str) -> ClientResult<Connection> {
        let (sender, frames) = mpsc::channel(64);
        let (events, receiver) = mpsc::channel(64);
        events
            .send(TransportEvent::Open)
            .await
            .map_err(|_| ClientError::Transport("peer dropped".to_string()))?;
        self.peers
            .send(GatewayPeer {
                url: url.to_string(),
                events,
                frames,
            })
            .map_err(|_| ClientError::Transport("test ended".to_string()))?;
        Ok(Connection {
            sender,
            events: receiver,
        })
    }
}

/// Wait for the next connection the client opens
pub async fn next_peer(peers: &mut mpsc::UnboundedReceiver<GatewayPeer>) -> GatewayPeer {
    timeout(WAIT, peers.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("transport dropped")
}

/// REST transport answering from canned responses
#[derive(Default)]
pub struct MockHttpTransport {
    routes: Mutex<HashMap<String, (u16, Value)>>,
    requests: Mutex<Vec<RestRequest>>,
}

impl MockHttpTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer requests whose path ends with `path`
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.routes.lock().insert(path.to_string(), (status, body));
    }

    /// URLs of every request seen so far
    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }

    pub fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn execute(&self, request: RestRequest) -> ClientResult<RestResponse> {
        let route = self
            .routes
            .lock()
            .iter()
            .find(|(path, _)| request.url.ends_with(path.as_str()))
            .map(|(_, response)| response.clone());
        self.requests.lock().push(request);

        let (status, body) = route.unwrap_or((404, serde_json::json!({"message": "Unknown route"})));
        Ok(RestResponse {
            status,
            body: body.to_string(),
            ..RestResponse::default()
        })
    }
}

/// A client wired to mock transports, already running in the background
pub struct TestClient {
    pub client: Arc<Client>,
    pub http: Arc<MockHttpTransport>,
    pub peers: mpsc::UnboundedReceiver<GatewayPeer>,
    runner: tokio::task::JoinHandle<ClientResult<()>>,
}

impl TestClient {
    /// Build a client over mocks; `setup` runs before `run` so listeners and
    /// commands registered there see the first events.
    pub fn start(config: ClientConfig, setup: impl FnOnce(&Client)) -> Self {
        let http = MockHttpTransport::new();
        http.respond(
            "/gateway/bot",
            200,
            serde_json::json!({
                "url": "wss://gateway.test",
                "shards": config.shard_count,
                "session_start_limit": {"total": 1000, "remaining": 999, "reset_after": 0}
            }),
        );
        let (gateway, peers) = MockGatewayTransport::channel();

        let client = Client::builder(config)
            .http_transport(http.clone())
            .gateway_transport(gateway)
            .build()
            .expect("client builds");
        setup(&client);

        let client = Arc::new(client);
        let runner = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.run().await })
        };

        Self {
            client,
            http,
            peers,
            runner,
        }
    }

    /// Next connection opened by any shard
    pub async fn next_peer(&mut self) -> GatewayPeer {
        next_peer(&mut self.peers).await
    }

    /// Stop the client and return what `run` returned
    pub async fn stop(self) -> ClientResult<()> {
        self.client.stop().await;
        timeout(WAIT, self.runner)
            .await
            .expect("run loop did not stop")
            .expect("run task panicked")
    }
}

/// Wait until `check` holds, polling
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
