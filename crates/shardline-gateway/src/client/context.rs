//! Listener context

use shardline_cache::Cache;
use shardline_http::RestClient;
use std::sync::Arc;

use crate::shard::ShardInfo;

/// Handed to every listener and command body.
///
/// Carries the originating shard and the shared client services instead of a
/// process-wide "current client".
#[derive(Debug, Clone)]
pub struct Context {
    pub shard: ShardInfo,
    pub cache: Arc<Cache>,
    pub rest: Arc<RestClient>,
}

impl Context {
    pub fn new(shard: ShardInfo, cache: Arc<Cache>, rest: Arc<RestClient>) -> Self {
        Self { shard, cache, rest }
    }
}
