//! Client facade
//!
//! Owns the cache, the rate limiter, the task queue, and the shards. `run`
//! resolves the gateway endpoint, starts every shard with the session-start
//! stagger, and then reaps finished tasks until `stop` is called.

use futures::Future;
use parking_lot::{Mutex, RwLock};
use shardline_cache::Cache;
use shardline_common::{ClientConfig, ClientResult, ConfigError};
use shardline_core::Activity;
use shardline_http::{RateLimiter, RestClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::builder::ClientBuilder;
use super::context::Context;
use crate::commands::{Command, CommandHandler, CommandRegistry};
use crate::dispatch::{EventDispatcher, ListenerId, ListenerRegistry};
use crate::events::{Event, EventType};
use crate::shard::{lane, stopped, Shard, ShardInfo};
use crate::tasks::TaskQueue;
use crate::transport::GatewayTransport;

/// How often the run loop reaps finished tasks
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Gateway client
pub struct Client {
    pub(super) config: ClientConfig,
    pub(super) cache: Arc<Cache>,
    pub(super) rest: Arc<RestClient>,
    pub(super) rate_limiter: Arc<RateLimiter>,
    pub(super) queue: Arc<TaskQueue>,
    pub(super) listeners: Arc<ListenerRegistry>,
    pub(super) commands: Arc<CommandRegistry>,
    pub(super) dispatcher: Arc<EventDispatcher>,
    pub(super) gateway_transport: Arc<dyn GatewayTransport>,
    pub(super) shards: RwLock<Vec<Arc<Shard>>>,
    pub(super) lanes: Mutex<Vec<JoinHandle<()>>>,
    pub(super) shutdown: watch::Sender<bool>,
}

impl Client {
    /// Client with the default transports
    ///
    /// # Errors
    /// Returns an error if the REST transport cannot be created
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Connect every shard and process events until [`Client::stop`].
    ///
    /// # Errors
    /// Fails before any connection attempt on an invalid configuration, when
    /// the gateway endpoint cannot be resolved, or when the session-start
    /// limit is exhausted.
    pub async fn run(&self) -> ClientResult<()> {
        self.config.validate()?;
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return Ok(());
        }

        let gateway = self.rest.gateway_bot().await?;
        if let Some(limit) = gateway.session_start_limit.as_ref().filter(|l| l.is_exhausted()) {
            return Err(ConfigError::SessionLimitExhausted {
                reset_after: limit.reset_after(),
            }
            .into());
        }
        if let Some(recommended) = gateway.shards {
            if recommended > self.config.shard_count {
                tracing::warn!(
                    configured = self.config.shard_count,
                    recommended,
                    "Shard count is below the recommended value"
                );
            }
        }

        let url = format!(
            "{}/{}",
            gateway.url.trim_end_matches('/'),
            self.config.gateway_query()
        );
        tracing::info!(url = %url, shards = self.config.shard_count, "Starting client");

        for id in 0..self.config.shard_count {
            if id > 0 {
                tokio::select! {
                    () = tokio::time::sleep(self.config.shard_start_delay) => {}
                    () = stopped(&mut shutdown) => break,
                }
            }
            if !self.start_shard(ShardInfo::new(id, self.config.shard_count), &url) {
                break;
            }
        }

        let mut ticker = tokio::time::interval(DRAIN_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.queue.drain();
                }
                () = stopped(&mut shutdown) => break,
            }
        }

        tracing::info!("Client run loop stopped");
        Ok(())
    }

    /// Start one shard unless `stop` has been called.
    ///
    /// The shutdown check and the registration happen under the shard list
    /// lock, so `stop` either sees the new shard or the shard is never started.
    fn start_shard(&self, info: ShardInfo, url: &str) -> bool {
        let mut shards = self.shards.write();
        if *self.shutdown.borrow() {
            return false;
        }

        let (sender, receiver) = lane();
        let shard = Shard::new(
            info,
            &self.config,
            Arc::clone(&self.gateway_transport),
            Arc::clone(&self.rate_limiter),
            sender,
        );

        let dispatcher = Arc::clone(&self.dispatcher);
        let handle = tokio::spawn(dispatcher.run_lane(
            Arc::clone(&shard),
            receiver,
            self.shutdown.subscribe(),
        ));
        self.lanes.lock().push(handle);

        shard.start(url);
        tracing::info!(shard = %info, "Shard started");
        shards.push(shard);
        true
    }

    /// Disconnect every shard, halt the run loop, and wait for shard tasks.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);

        let shards = self.shards();
        for shard in &shards {
            shard.close();
        }
        for shard in &shards {
            shard.join().await;
        }

        let lanes = std::mem::take(&mut *self.lanes.lock());
        for lane in lanes {
            lane.abort();
        }

        self.queue.drain();
        self.queue.shutdown();
        tracing::info!(shards = shards.len(), "Client stopped");
    }

    /// Register a listener for one event kind
    pub fn on<F, Fut>(&self, kind: EventType, listener: F) -> ListenerId
    where
        F: Fn(Context, Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.listeners.on(kind, listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Register a command, replacing any command with the same name
    pub fn register_command(&self, command: Command) -> Option<Arc<Command>> {
        self.commands.register(command)
    }

    pub fn set_command_handler(&self, handler: Arc<dyn CommandHandler>) {
        self.dispatcher.set_command_handler(handler);
    }

    /// Update the presence on every shard
    ///
    /// # Errors
    /// Returns the first shard error; an invalid status fails before anything is sent
    pub async fn update_presence(&self, status: &str, activity: Option<Activity>) -> ClientResult<()> {
        for shard in self.shards() {
            shard.update_presence(status, activity.clone()).await?;
        }
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn rest(&self) -> &Arc<RestClient> {
        &self.rest
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    pub fn shards(&self) -> Vec<Arc<Shard>> {
        self.shards.read().clone()
    }

    /// Whether `stop` has been called
    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("shards", &self.shards.read().len())
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use shardline_common::ClientError;
    use shardline_http::{HttpTransport, RestRequest, RestResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TOKEN: &str = "MTA1.Gx9k2a.abcdefghijklmnop";

    struct GatewayBotOnly {
        body: serde_json::Value,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for GatewayBotOnly {
        async fn execute(&self, _request: RestRequest) -> ClientResult<RestResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RestResponse {
                status: 200,
                body: self.body.to_string(),
                ..RestResponse::default()
            })
        }
    }

    fn client(config: ClientConfig, body: serde_json::Value) -> (Client, Arc<GatewayBotOnly>) {
        let http = Arc::new(GatewayBotOnly {
            body,
            calls: AtomicUsize::new(0),
        });
        let client = Client::builder(config)
            .http_transport(http.clone())
            .build()
            .unwrap();
        (client, http)
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_request() {
        let (client, http) = client(ClientConfig::new("not a token"), json!({}));
        let err = client.run().await.unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_session_limit_fails_run() {
        let body = json!({
            "url": "wss://gateway.example",
            "shards": 1,
            "session_start_limit": {"total": 1000, "remaining": 0, "reset_after": 60_000}
        });
        let (client, _) = client(ClientConfig::new(TOKEN), body);

        let err = client.run().await.unwrap_err();
        match err {
            ClientError::Config(ConfigError::SessionLimitExhausted { reset_after }) => {
                assert_eq!(reset_after, Duration::from_secs(60));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(client.shards().is_empty());
    }

    #[tokio::test]
    async fn test_run_after_stop_returns_immediately() {
        let (client, http) = client(ClientConfig::new(TOKEN), json!({}));
        client.stop().await;
        assert!(client.is_stopped());
        client.run().await.unwrap();
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_shard_starts_after_stop() {
        let (client, _) = client(ClientConfig::new(TOKEN), json!({}));
        client.stop().await;
        assert!(!client.start_shard(ShardInfo::new(0, 1), "wss://gateway.example"));
        assert!(client.shards().is_empty());
        assert!(client.lanes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_listener_handles() {
        let (client, _) = client(ClientConfig::new(TOKEN), json!({}));
        let id = client.on(EventType::Ready, |_, _| async { Ok(()) });
        assert!(client.remove_listener(id));
        assert!(!client.remove_listener(id));
    }

    #[tokio::test]
    async fn test_presence_without_shards() {
        let (client, _) = client(ClientConfig::new(TOKEN), json!({}));
        client.update_presence("online", None).await.unwrap();
    }
}
