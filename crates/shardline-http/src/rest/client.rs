//! Rate-limited request path
//!
//! Every call waits for bucket capacity, sends through the transport, feeds the
//! response headers back into the limiter, and only then maps the status. A
//! rejected response therefore still updates its bucket.

use async_trait::async_trait;
use serde_json::json;
use shardline_cache::EntityFetcher;
use shardline_common::{ClientConfig, ClientError, ClientResult, TokenType};
use shardline_core::{parse_document, Document, FromDocument, Message, Snowflake, User};
use std::sync::Arc;

use super::models::GatewayBot;
use super::transport::{HttpTransport, Method, RestRequest, RestResponse};
use crate::ratelimit::{BucketKind, RateLimiter};

pub const USER_AGENT: &str = concat!("DiscordBot (shardline, ", env!("CARGO_PKG_VERSION"), ")");

/// REST client shared by the cache, the shards, and user code
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    token_type: TokenType,
    authorization: String,
}

impl RestClient {
    pub fn new(config: &ClientConfig, transport: Arc<dyn HttpTransport>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            rate_limiter,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token_type: config.token_type,
            authorization: config.token_type.authorization(&config.token),
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Send a request accounted against `(bucket, major_id)`.
    ///
    /// An empty success body yields `Document::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        bucket: BucketKind,
        major_id: Option<Snowflake>,
        body: Option<Document>,
    ) -> ClientResult<Document> {
        self.rate_limiter.wait_for_capacity(bucket, major_id).await?;

        let request = RestRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers: self.default_headers(),
            body,
        };
        tracing::debug!(request = %request, bucket = bucket.as_str(), "Sending REST request");

        let response = self.transport.execute(request).await?;
        self.rate_limiter
            .update_from_response(&response.headers, bucket, major_id);

        if !response.is_success() {
            let rejection = rejection(&response);
            tracing::warn!(
                method = method.as_str(),
                path,
                status = response.status,
                error = %rejection,
                "REST request rejected"
            );
            return Err(rejection);
        }

        if response.body.trim().is_empty() {
            return Ok(Document::Null);
        }
        Ok(parse_document(&response.body)?)
    }

    pub async fn get(&self, path: &str, bucket: BucketKind, major_id: Option<Snowflake>) -> ClientResult<Document> {
        self.request(Method::Get, path, bucket, major_id, None).await
    }

    /// Resolve the gateway endpoint.
    ///
    /// Bot tokens use `/gateway/bot`, which also reports the recommended shard
    /// count and the session start limit.
    pub async fn gateway_bot(&self) -> ClientResult<GatewayBot> {
        let path = match self.token_type {
            TokenType::Bot => "/gateway/bot",
            TokenType::Bearer => "/gateway",
        };
        let document = self.get(path, BucketKind::Global, None).await?;
        Ok(GatewayBot::from_document(&document)?)
    }

    pub async fn current_user(&self) -> ClientResult<User> {
        let document = self.fetch_current_user().await?;
        Ok(User::from_document(&document)?)
    }

    /// Post a plain text message to a channel
    pub async fn create_message(&self, channel_id: Snowflake, content: &str) -> ClientResult<Message> {
        let document = self
            .request(
                Method::Post,
                &format!("/channels/{channel_id}/messages"),
                BucketKind::Channel,
                Some(channel_id),
                Some(json!({ "content": content })),
            )
            .await?;
        Ok(Message::from_document(&document)?)
    }

    fn default_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", self.authorization.clone()),
            ("User-Agent", USER_AGENT.to_string()),
            ("X-RateLimit-Precision", "millisecond".to_string()),
        ]
    }
}

#[async_trait]
impl EntityFetcher for RestClient {
    async fn fetch_guild(&self, guild_id: Snowflake) -> ClientResult<Document> {
        self.get(&format!("/guilds/{guild_id}"), BucketKind::Guild, Some(guild_id))
            .await
    }

    async fn fetch_channel(&self, channel_id: Snowflake) -> ClientResult<Document> {
        self.get(&format!("/channels/{channel_id}"), BucketKind::Channel, Some(channel_id))
            .await
    }

    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> ClientResult<Document> {
        self.get(
            &format!("/guilds/{guild_id}/members/{user_id}"),
            BucketKind::Guild,
            Some(guild_id),
        )
        .await
    }

    async fn fetch_message(&self, channel_id: Snowflake, message_id: Snowflake) -> ClientResult<Document> {
        self.get(
            &format!("/channels/{channel_id}/messages/{message_id}"),
            BucketKind::Channel,
            Some(channel_id),
        )
        .await
    }

    async fn fetch_user(&self, user_id: Snowflake) -> ClientResult<Document> {
        self.get(&format!("/users/{user_id}"), BucketKind::Global, None).await
    }

    async fn fetch_current_user(&self) -> ClientResult<Document> {
        self.get("/users/@me", BucketKind::Global, None).await
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("token_type", &self.token_type)
            .finish()
    }
}

fn rejection(response: &RestResponse) -> ClientError {
    let message = parse_document(&response.body)
        .ok()
        .and_then(|doc| doc.get("message").and_then(Document::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or("Unknown status")
                .to_string()
        });
    ClientError::RemoteRejection {
        status: response.status,
        message,
    }
}
