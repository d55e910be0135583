//! Gateway shard
//!
//! A shard owns one connection and its session. Its connection loop opens the
//! transport, answers Hello with Identify or Resume, feeds dispatch frames into
//! the shard's lane, and reopens the transport after a backoff whenever the
//! connection is lost, until the shard is closed.

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde_json::Value;
use shardline_common::{ClientConfig, ClientError, ClientResult};
use shardline_core::Activity;
use shardline_http::RateLimiter;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

use super::lane::{DispatchFrame, LaneItem, LaneSender};
use super::state::{ShardInfo, ShardState};
use super::stopped;
use crate::events::Event;
use crate::protocol::{
    CloseCode, GatewayIntents, GatewayMessage, HelloPayload, IdentifyPayload, IdentifyProperties,
    OpCode, PresenceUpdatePayload, ResumePayload,
};
use crate::transport::{Connection, GatewayTransport, OutboundFrame, TransportEvent};

/// Wait before re-identifying after a non-resumable invalid session
const INVALID_SESSION_DELAY: Duration = Duration::from_secs(1);

/// Close code for a shutdown; ends the session
const NORMAL_CLOSURE: u16 = 1000;

/// Close code for a client-side reconnect; keeps the session resumable
const RECONNECT_CLOSURE: u16 = 4000;

/// Reported when the transport fails without a close frame
const ABNORMAL_CLOSURE: u16 = 1006;

/// Heartbeat interval assumed until Hello says otherwise
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41_250;

/// One gateway connection and its session
pub struct Shard {
    info: ShardInfo,
    token: String,
    intents: GatewayIntents,
    large_threshold: u16,
    reconnect_delay: Duration,

    transport: Arc<dyn GatewayTransport>,
    rate_limiter: Arc<RateLimiter>,
    lane: LaneSender,

    gateway_url: RwLock<String>,
    state: RwLock<ShardState>,
    session_id: RwLock<Option<String>>,
    /// Presence sent with every Identify once set
    presence: RwLock<Option<PresenceUpdatePayload>>,
    /// Writer of the open connection, if any
    outbound: Mutex<Option<mpsc::Sender<OutboundFrame>>>,

    /// Last sequence number received, -1 before the first dispatch
    last_sequence: AtomicI64,
    heartbeat_interval_ms: AtomicU64,
    heartbeat_acked: AtomicBool,
    heartbeat_started: AtomicBool,
    reconnecting: AtomicBool,
    /// Set with `reconnect_signal`; cleared when a new connection starts
    reconnect_pending: AtomicBool,
    disconnected: AtomicBool,
    /// Suppresses every further reconnect attempt
    stay_disconnected: AtomicBool,
    reconnect_count: AtomicU64,

    reconnect_signal: Notify,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shard {
    pub fn new(
        info: ShardInfo,
        config: &ClientConfig,
        transport: Arc<dyn GatewayTransport>,
        rate_limiter: Arc<RateLimiter>,
        lane: LaneSender,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            info,
            token: config.token.clone(),
            intents: GatewayIntents::from_config(config.intents),
            large_threshold: config.large_threshold,
            reconnect_delay: config.reconnect_delay,
            transport,
            rate_limiter,
            lane,
            gateway_url: RwLock::new(String::new()),
            state: RwLock::new(ShardState::Disconnected),
            session_id: RwLock::new(None),
            presence: RwLock::new(None),
            outbound: Mutex::new(None),
            last_sequence: AtomicI64::new(-1),
            heartbeat_interval_ms: AtomicU64::new(DEFAULT_HEARTBEAT_INTERVAL_MS),
            heartbeat_acked: AtomicBool::new(true),
            heartbeat_started: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
            reconnect_pending: AtomicBool::new(false),
            disconnected: AtomicBool::new(true),
            stay_disconnected: AtomicBool::new(false),
            reconnect_count: AtomicU64::new(0),
            reconnect_signal: Notify::new(),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn info(&self) -> ShardInfo {
        self.info
    }

    pub fn state(&self) -> ShardState {
        *self.state.read()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Last sequence number received, `None` before the first dispatch
    pub fn last_sequence(&self) -> Option<u64> {
        let seq = self.last_sequence.load(Ordering::SeqCst);
        (seq >= 0).then_some(seq as u64)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.load(Ordering::SeqCst))
    }

    pub fn is_heartbeat_acked(&self) -> bool {
        self.heartbeat_acked.load(Ordering::SeqCst)
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::SeqCst)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Whether the shard has been closed for good
    pub fn is_stopped(&self) -> bool {
        self.stay_disconnected.load(Ordering::SeqCst)
    }

    /// Number of transitions into `Reconnecting`
    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::SeqCst)
    }

    /// Spawn the connection loop against `gateway_url`
    pub fn start(self: &Arc<Self>, gateway_url: impl Into<String>) {
        *self.gateway_url.write() = gateway_url.into();
        let shard = Arc::clone(self);
        let handle = tokio::spawn(async move { shard.run().await });
        self.tasks.lock().push(handle);
    }

    /// Stop for good: no further reconnects, the connection is closed with
    /// 1000 and the heartbeat loop wakes and exits.
    pub fn close(&self) {
        tracing::info!(shard = %self.info, "Closing shard");
        self.stay_disconnected.store(true, Ordering::SeqCst);
        self.shutdown.send_replace(true);
    }

    /// Wait for the connection and heartbeat loops to finish
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(shard = %self.info, "Shard task panicked");
                }
            }
        }
    }

    /// Set the presence and send it when connected.
    ///
    /// The presence is also carried in every later Identify.
    pub async fn update_presence(&self, status: &str, activity: Option<Activity>) -> ClientResult<()> {
        let payload = PresenceUpdatePayload::new(status, activity);
        if !payload.is_valid_status() {
            return Err(ClientError::Protocol(format!("invalid presence status: {status}")));
        }
        *self.presence.write() = Some(payload.clone());

        if !self.is_connected() {
            return Ok(());
        }
        self.send(&GatewayMessage::presence_update(&payload)?).await
    }

    /// Send a frame through the globally rate-limited path.
    ///
    /// Gives up with `ShuttingDown` as soon as the shard is closed, even while
    /// waiting on the rate limiter.
    pub async fn send(&self, message: &GatewayMessage) -> ClientResult<()> {
        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            biased;
            () = stopped(&mut shutdown) => Err(ClientError::ShuttingDown),
            result = self.send_limited(message) => result,
        }
    }

    async fn send_limited(&self, message: &GatewayMessage) -> ClientResult<()> {
        self.rate_limiter.wait_global().await?;

        let sender = self
            .outbound
            .lock()
            .clone()
            .ok_or_else(|| ClientError::Transport("shard is not connected".to_string()))?;
        let text = message.to_json()?;

        tracing::debug!(shard = %self.info, frame = %message, "Sending gateway frame");
        sender
            .send(OutboundFrame::Text(text))
            .await
            .map_err(|_| ClientError::Transport("connection closed".to_string()))
    }

    /// Move to `Reconnecting` and tear the connection down.
    ///
    /// Returns false when a reconnect is already under way or the shard is
    /// closed, so repeated triggers reconnect once.
    pub fn request_reconnect(&self, reason: &str) -> bool {
        if self.is_stopped() || self.reconnecting.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.disconnected.store(true, Ordering::SeqCst);
        self.set_state(ShardState::Reconnecting);
        self.reconnect_count.fetch_add(1, Ordering::SeqCst);
        self.reconnect_pending.store(true, Ordering::SeqCst);
        self.reconnect_signal.notify_one();
        tracing::info!(shard = %self.info, reason, "Reconnecting");
        true
    }

    fn is_connected(&self) -> bool {
        self.outbound.lock().is_some()
    }

    fn set_state(&self, state: ShardState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            tracing::debug!(shard = %self.info, from = %previous, to = %state, "Shard state changed");
        }
    }

    fn clear_session(&self) {
        *self.session_id.write() = None;
        self.last_sequence.store(-1, Ordering::SeqCst);
    }

    async fn emit(&self, event: Event) {
        if self.lane.send(LaneItem::Lifecycle(event)).await.is_err() {
            tracing::debug!(shard = %self.info, "Dispatch lane closed");
        }
    }

    // === Connection loop ===

    async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if self.is_stopped() {
                break;
            }
            self.reconnect_pending.store(false, Ordering::SeqCst);
            self.set_state(ShardState::Connecting);

            let url = self.gateway_url.read().clone();
            tracing::info!(shard = %self.info, url = %url, "Connecting to gateway");

            let opened = tokio::select! {
                result = self.transport.open(&url) => result,
                () = stopped(&mut shutdown) => break,
            };
            match opened {
                Ok(connection) => self.drive(connection).await,
                Err(e) => {
                    tracing::warn!(shard = %self.info, error = %e, "Failed to open gateway connection");
                }
            }

            if self.is_stopped() {
                break;
            }
            self.request_reconnect("connection closed");

            let delay = self.backoff_delay();
            tracing::debug!(shard = %self.info, delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = stopped(&mut shutdown) => break,
            }
        }

        *self.outbound.lock() = None;
        self.disconnected.store(true, Ordering::SeqCst);
        self.set_state(ShardState::Disconnected);
        tracing::info!(shard = %self.info, "Shard stopped");
    }

    /// Pump one connection until it closes or is torn down
    async fn drive(self: &Arc<Self>, mut connection: Connection) {
        *self.outbound.lock() = Some(connection.sender.clone());
        let mut shutdown = self.shutdown.subscribe();

        loop {
            tokio::select! {
                () = stopped(&mut shutdown) => {
                    let _ = connection.sender.send(OutboundFrame::Close(NORMAL_CLOSURE)).await;
                    break;
                }
                () = self.reconnect_signal.notified() => {
                    // A stale permit from an earlier connection is ignored
                    if self.reconnect_pending.swap(false, Ordering::SeqCst) {
                        let _ = connection.sender.send(OutboundFrame::Close(RECONNECT_CLOSURE)).await;
                        break;
                    }
                }
                event = connection.events.recv() => match event {
                    Some(TransportEvent::Open) => self.on_open().await,
                    Some(TransportEvent::Message(text)) => self.on_message(&text).await,
                    Some(TransportEvent::Close { code, reason }) => {
                        self.on_close(code, &reason).await;
                        break;
                    }
                    Some(TransportEvent::Error(error)) => {
                        self.on_error(&error).await;
                        break;
                    }
                    None => {
                        tracing::debug!(shard = %self.info, "Transport event stream ended");
                        break;
                    }
                },
            }
        }

        *self.outbound.lock() = None;
    }

    fn backoff_delay(&self) -> Duration {
        let base = self.reconnect_delay.as_millis() as u64;
        let spread = base / 11;
        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread * 2)
        };
        Duration::from_millis(base - spread + jitter)
    }

    // === Transport events ===

    async fn on_open(&self) {
        self.disconnected.store(false, Ordering::SeqCst);
        self.set_state(ShardState::AwaitHello);
        if self.is_reconnecting() {
            self.emit(Event::Reconnected).await;
        }
    }

    async fn on_message(self: &Arc<Self>, text: &str) {
        let message = match GatewayMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                let error = ClientError::Protocol(e.to_string());
                tracing::warn!(shard = %self.info, error = %error, "Dropping malformed gateway frame");
                return;
            }
        };
        tracing::trace!(shard = %self.info, frame = %message, "Received gateway frame");

        match message.op {
            OpCode::Dispatch => self.on_dispatch(message).await,
            OpCode::Hello => match message.as_hello() {
                Some(hello) => self.on_hello(hello).await,
                None => tracing::warn!(shard = %self.info, "Hello without heartbeat interval"),
            },
            OpCode::HeartbeatAck => {
                self.heartbeat_acked.store(true, Ordering::SeqCst);
                tracing::trace!(shard = %self.info, "Heartbeat acknowledged");
            }
            OpCode::Heartbeat => {
                if let Err(e) = self.send_heartbeat().await {
                    tracing::debug!(shard = %self.info, error = %e, "Failed to answer heartbeat request");
                }
            }
            OpCode::Reconnect => {
                self.request_reconnect("requested by server");
            }
            OpCode::InvalidSession => self.on_invalid_session(message.is_resumable()).await,
            other => {
                tracing::debug!(shard = %self.info, op = %other, "Ignoring unexpected op");
            }
        }
    }

    async fn on_dispatch(&self, message: GatewayMessage) {
        if let Some(seq) = message.s {
            self.last_sequence.store(seq as i64, Ordering::SeqCst);
        }
        let Some(name) = message.t else {
            tracing::warn!(shard = %self.info, "Dispatch frame without event name");
            return;
        };

        match name.as_str() {
            "READY" => {
                match message.d.get("session_id").and_then(Value::as_str) {
                    Some(session_id) => *self.session_id.write() = Some(session_id.to_string()),
                    None => tracing::warn!(shard = %self.info, "READY without session id"),
                }
                self.reconnecting.store(false, Ordering::SeqCst);
                self.set_state(ShardState::Ready);
                tracing::info!(shard = %self.info, "Session ready");
            }
            "RESUMED" => {
                self.reconnecting.store(false, Ordering::SeqCst);
                self.set_state(ShardState::Ready);
                tracing::info!(shard = %self.info, seq = ?self.last_sequence(), "Session resumed");
                self.emit(Event::Resumed).await;
            }
            _ => {}
        }

        let frame = DispatchFrame {
            shard: self.info,
            name,
            sequence: message.s,
            data: message.d,
        };
        if self.lane.send(LaneItem::Dispatch(frame)).await.is_err() {
            tracing::debug!(shard = %self.info, "Dispatch lane closed");
        }
    }

    async fn on_hello(self: &Arc<Self>, hello: HelloPayload) {
        self.heartbeat_interval_ms
            .store(hello.heartbeat_interval, Ordering::SeqCst);
        self.heartbeat_acked.store(true, Ordering::SeqCst);
        tracing::debug!(shard = %self.info, interval_ms = hello.heartbeat_interval, "Received Hello");

        let resume = self.is_reconnecting() && self.session_id.read().is_some();
        self.reconnecting.store(false, Ordering::SeqCst);
        let result = if resume {
            self.set_state(ShardState::Resuming);
            self.send_resume().await
        } else {
            self.set_state(ShardState::Identifying);
            self.send_identify().await
        };

        if let Err(e) = result {
            tracing::warn!(shard = %self.info, error = %e, resume, "Failed to start session");
        }
        self.ensure_heartbeat();
    }

    async fn on_invalid_session(&self, resumable: bool) {
        tracing::warn!(shard = %self.info, resumable, "Session invalidated");
        self.emit(Event::InvalidSession { resumable }).await;

        let has_session = self.session_id.read().is_some();
        let result = if resumable && has_session {
            self.set_state(ShardState::Resuming);
            self.send_resume().await
        } else {
            let mut shutdown = self.shutdown.subscribe();
            tokio::select! {
                () = tokio::time::sleep(INVALID_SESSION_DELAY) => {}
                () = stopped(&mut shutdown) => return,
            }
            self.clear_session();
            self.set_state(ShardState::Identifying);
            self.send_identify().await
        };

        if let Err(e) = result {
            tracing::warn!(shard = %self.info, error = %e, "Failed to restart session");
        }
    }

    async fn on_close(&self, code: u16, reason: &str) {
        if self.is_stopped() {
            tracing::debug!(shard = %self.info, code, "Connection closed");
            return;
        }
        if self.is_reconnecting() {
            tracing::debug!(shard = %self.info, code, "Connection closed while reconnecting");
            return;
        }

        let close = CloseCode::from_u16(code);
        if close.is_some_and(CloseCode::invalidates_session) {
            self.clear_session();
        }

        if !CloseCode::raw_should_reconnect(code) {
            tracing::error!(
                shard = %self.info,
                code,
                reason,
                description = close.map_or("unknown", CloseCode::description),
                "Gateway closed the connection permanently"
            );
            self.stay_disconnected.store(true, Ordering::SeqCst);
            self.shutdown.send_replace(true);
        } else {
            tracing::warn!(shard = %self.info, code, reason, "Gateway connection closed");
        }

        self.emit(Event::Disconnected {
            code,
            reason: reason.to_string(),
        })
        .await;
    }

    async fn on_error(&self, error: &str) {
        if self.is_reconnecting() || self.is_stopped() {
            tracing::debug!(shard = %self.info, error, "Transport error while reconnecting");
            return;
        }
        let error = ClientError::Transport(error.to_string());
        tracing::warn!(shard = %self.info, error = %error, "Gateway transport error");
        self.emit(Event::Disconnected {
            code: ABNORMAL_CLOSURE,
            reason: error.to_string(),
        })
        .await;
    }

    // === Session frames ===

    async fn send_identify(&self) -> ClientResult<()> {
        let payload = IdentifyPayload {
            token: self.token.clone(),
            properties: IdentifyProperties::current(),
            compress: false,
            large_threshold: self.large_threshold,
            shard: [self.info.id, self.info.count],
            intents: self.intents,
            presence: self.presence.read().clone(),
        };
        tracing::info!(shard = %self.info, intents = self.intents.bits(), "Identifying");
        self.send(&GatewayMessage::identify(&payload)?).await
    }

    async fn send_resume(&self) -> ClientResult<()> {
        let Some(session_id) = self.session_id() else {
            return self.send_identify().await;
        };
        let payload = ResumePayload {
            token: self.token.clone(),
            session_id,
            seq: self.last_sequence(),
        };
        tracing::info!(shard = %self.info, seq = ?payload.seq, "Resuming session");
        self.send(&GatewayMessage::resume(&payload)?).await
    }

    pub(super) async fn send_heartbeat(&self) -> ClientResult<()> {
        self.heartbeat_acked.store(false, Ordering::SeqCst);
        self.send(&GatewayMessage::heartbeat(self.last_sequence())).await
    }

    pub(super) fn connected(&self) -> bool {
        self.is_connected()
    }

    pub(super) fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub(super) fn mark_heartbeat_started(&self) -> bool {
        !self.heartbeat_started.swap(true, Ordering::SeqCst)
    }

    pub(super) fn track(&self, handle: JoinHandle<()>) {
        self.tasks.lock().push(handle);
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("info", &self.info)
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .field("last_sequence", &self.last_sequence())
            .field("reconnecting", &self.is_reconnecting())
            .finish()
    }
}
