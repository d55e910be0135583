//! Client builder
//!
//! Every collaborator is optional; missing ones fall back to the production
//! implementations (`reqwest` for REST, `tokio-tungstenite` for the gateway).

use parking_lot::{Mutex, RwLock};
use shardline_cache::Cache;
use shardline_common::{ClientConfig, ClientResult};
use shardline_http::{HttpTransport, RateLimiter, ReqwestTransport, RestClient};
use std::sync::Arc;
use tokio::sync::watch;

use super::client::Client;
use crate::commands::{CommandHandler, CommandRegistry, PrefixCommandHandler};
use crate::dispatch::{EventDispatcher, ListenerRegistry};
use crate::tasks::TaskQueue;
use crate::transport::{GatewayTransport, TungsteniteTransport};

/// Builder for [`Client`]
pub struct ClientBuilder {
    config: ClientConfig,
    gateway_transport: Option<Arc<dyn GatewayTransport>>,
    http_transport: Option<Arc<dyn HttpTransport>>,
    command_handler: Option<Arc<dyn CommandHandler>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            gateway_transport: None,
            http_transport: None,
            command_handler: None,
        }
    }

    /// Set the gateway transport
    pub fn gateway_transport(mut self, transport: Arc<dyn GatewayTransport>) -> Self {
        self.gateway_transport = Some(transport);
        self
    }

    /// Set the REST transport
    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http_transport = Some(transport);
        self
    }

    /// Replace the default prefix command handler
    pub fn command_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.command_handler = Some(handler);
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns an error if the default REST transport cannot be created
    pub fn build(self) -> ClientResult<Client> {
        let config = self.config;

        let http_transport: Arc<dyn HttpTransport> = match self.http_transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let gateway_transport: Arc<dyn GatewayTransport> = match self.gateway_transport {
            Some(transport) => transport,
            None => Arc::new(TungsteniteTransport::new()),
        };

        let rate_limiter = Arc::new(RateLimiter::new(config.max_ratelimit_wait));
        let rest = Arc::new(RestClient::new(
            &config,
            http_transport,
            Arc::clone(&rate_limiter),
        ));
        let cache = Arc::new(Cache::new(config.message_cache_size, rest.clone()));
        let queue = Arc::new(TaskQueue::new(config.task_queue_capacity));
        let listeners = Arc::new(ListenerRegistry::new());
        let commands = Arc::new(CommandRegistry::new());

        let command_handler: Arc<dyn CommandHandler> = match self.command_handler {
            Some(handler) => handler,
            None => Arc::new(PrefixCommandHandler::new(
                Arc::clone(&commands),
                config.command_prefixes.clone(),
            )),
        };

        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::clone(&cache),
            Arc::clone(&rest),
            Arc::clone(&listeners),
            Arc::clone(&queue),
            command_handler,
        ));
        let (shutdown, _) = watch::channel(false);

        Ok(Client {
            config,
            cache,
            rest,
            rate_limiter,
            queue,
            listeners,
            commands,
            dispatcher,
            gateway_transport,
            shards: RwLock::new(Vec::new()),
            lanes: Mutex::new(Vec::new()),
            shutdown,
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("gateway_transport", &self.gateway_transport.is_some())
            .field("http_transport", &self.http_transport.is_some())
            .field("command_handler", &self.command_handler.is_some())
            .finish()
    }
}
