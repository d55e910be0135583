//! # shardline-cache
//!
//! In-memory mirror of the remote state a client has seen: guilds with their
//! channels, roles, and members, direct-message channels, a bounded message set,
//! and the current user.
//!
//! ## Example
//!
//! ```ignore
//! use shardline_cache::Cache;
//!
//! let cache = Cache::new(config.message_cache_size, rest.clone());
//!
//! // Cached or fetched through the REST layer
//! let guild = cache.guild(guild_id, true).await?;
//!
//! // Cached only
//! let member = cache.member(guild_id, user_id, false).await?;
//! ```

pub mod fetch;
pub mod store;

pub use fetch::EntityFetcher;
pub use store::{Cache, MemberRemoval};
