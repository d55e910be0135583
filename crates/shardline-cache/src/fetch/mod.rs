//! Fetch collaborator
//!
//! The cache never talks to the network itself. On a miss with fetching allowed
//! it asks an [`EntityFetcher`] for the raw document and builds the entity from it.

use async_trait::async_trait;
use shardline_common::ClientResult;
use shardline_core::{Document, Snowflake};

/// Source of entity documents for cache misses
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    async fn fetch_guild(&self, guild_id: Snowflake) -> ClientResult<Document>;

    async fn fetch_channel(&self, channel_id: Snowflake) -> ClientResult<Document>;

    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> ClientResult<Document>;

    async fn fetch_message(&self, channel_id: Snowflake, message_id: Snowflake) -> ClientResult<Document>;

    async fn fetch_user(&self, user_id: Snowflake) -> ClientResult<Document>;

    /// The account the client is logged in as
    async fn fetch_current_user(&self) -> ClientResult<Document>;
}
