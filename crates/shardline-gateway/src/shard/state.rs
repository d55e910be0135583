//! Shard identity and connection state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a shard within the session's shard set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardInfo {
    pub id: u64,
    pub count: u64,
}

impl ShardInfo {
    pub const fn new(id: u64, count: u64) -> Self {
        Self { id, count }
    }

    /// Whether this shard receives events for the guild.
    ///
    /// Direct messages always go to shard 0.
    pub fn handles_guild(&self, guild_id: u64) -> bool {
        (guild_id >> 22) % self.count.max(1) == self.id
    }
}

impl fmt::Display for ShardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.count)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShardState {
    /// Not connected; the initial and the terminal state
    #[default]
    Disconnected,
    /// Transport is being opened
    Connecting,
    /// Transport open, waiting for Hello
    AwaitHello,
    /// Identify sent, waiting for READY
    Identifying,
    /// Resume sent, waiting for the replay to finish
    Resuming,
    /// Session established
    Ready,
    /// Connection torn down, waiting out the backoff
    Reconnecting,
}

impl ShardState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitHello => "await_hello",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_routing() {
        // (id >> 22) % count
        let guild = 41_771_983_423_143_937_u64;
        let expected = (guild >> 22) % 4;
        let shards: Vec<ShardInfo> = (0..4).map(|id| ShardInfo::new(id, 4)).collect();
        let owners: Vec<_> = shards.iter().filter(|s| s.handles_guild(guild)).collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].id, expected);

        assert!(ShardInfo::new(0, 1).handles_guild(guild));
        assert_eq!(ShardInfo::new(2, 4).to_string(), "2/4");
    }
}
