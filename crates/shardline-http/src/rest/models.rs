//! Response bodies the client itself consumes

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of `GET /gateway/bot` (or the url-only `GET /gateway`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBot {
    pub url: String,
    #[serde(default)]
    pub shards: Option<u64>,
    #[serde(default)]
    pub session_start_limit: Option<SessionStartLimit>,
}

/// How many sessions may still be started before the limit resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    pub total: u64,
    pub remaining: u64,
    /// Milliseconds until the limit resets
    pub reset_after: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u64,
}

fn default_max_concurrency() -> u64 {
    1
}

impl SessionStartLimit {
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn reset_after(&self) -> Duration {
        Duration::from_millis(self.reset_after)
    }
}
