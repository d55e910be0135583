//! Rate-limit buckets

use shardline_core::Snowflake;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Scope a request is accounted against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    /// Routes without a major parameter share the global budget
    Global,
    Channel,
    Guild,
    Webhook,
}

impl BucketKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Channel => "channel",
            Self::Guild => "guild",
            Self::Webhook => "webhook",
        }
    }
}

/// Identity of one bucket: its kind plus the major object id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub kind: BucketKind,
    pub id: Option<Snowflake>,
}

impl BucketKey {
    /// Global keys never carry an id.
    pub fn new(kind: BucketKind, id: Option<Snowflake>) -> Self {
        let id = if kind == BucketKind::Global { None } else { id };
        Self { kind, id }
    }

    pub const fn global() -> Self {
        Self {
            kind: BucketKind::Global,
            id: None,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}:{}", self.kind.as_str(), id),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// What the client knows about a bucket
///
/// `Unknown` means no response has reported limits yet, which is not the same as
/// "unlimited": the first request simply goes through and its response fills the
/// bucket in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketState {
    #[default]
    Unknown,
    Known {
        limit: u32,
        remaining: u32,
        reset_at: Instant,
    },
}

impl BucketState {
    /// How long a caller must wait at `now`, or `None` if it may send.
    ///
    /// A bucket whose reset time has passed counts as refilled.
    pub fn wait_at(&self, now: Instant) -> Option<Duration> {
        match *self {
            Self::Known {
                remaining: 0,
                reset_at,
                ..
            } if reset_at > now => Some(reset_at - now),
            _ => None,
        }
    }

    /// Whether the bucket is empty at `now`
    #[inline]
    pub fn is_exhausted_at(&self, now: Instant) -> bool {
        self.wait_at(now).is_some()
    }

    pub fn remaining(&self) -> Option<u32> {
        match self {
            Self::Known { remaining, .. } => Some(*remaining),
            Self::Unknown => None,
        }
    }

    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Known { limit, .. } => Some(*limit),
            Self::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_key_drops_id() {
        let key = BucketKey::new(BucketKind::Global, Some(Snowflake::new(5)));
        assert_eq!(key, BucketKey::global());
        assert_eq!(key.to_string(), "global");

        let key = BucketKey::new(BucketKind::Channel, Some(Snowflake::new(5)));
        assert_eq!(key.to_string(), "channel:5");
    }

    #[test]
    fn test_wait_at() {
        let now = Instant::now();
        assert_eq!(BucketState::Unknown.wait_at(now), None);

        let exhausted = BucketState::Known {
            limit: 5,
            remaining: 0,
            reset_at: now + Duration::from_millis(300),
        };
        assert_eq!(exhausted.wait_at(now), Some(Duration::from_millis(300)));
        assert!(!exhausted.is_exhausted_at(now + Duration::from_millis(300)));

        let available = BucketState::Known {
            limit: 5,
            remaining: 2,
            reset_at: now + Duration::from_secs(1),
        };
        assert_eq!(available.wait_at(now), None);
        assert_eq!(available.remaining(), Some(2));
    }
}
