//! Shared rate limiter
//!
//! One instance is shared by every shard and every REST call site.

use dashmap::DashMap;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use shardline_common::{ClientError, ClientResult};
use shardline_core::Snowflake;
use std::time::Duration;
use tokio::time::Instant;

use super::bucket::{BucketKey, BucketKind, BucketState};
use super::headers::RateLimitHeaders;

/// Per-bucket and global send budgets
pub struct RateLimiter {
    /// The global bucket; takes priority over every specific bucket while empty
    global: Mutex<BucketState>,
    /// Buckets created lazily on first use of a (kind, id) pair
    buckets: DashMap<BucketKey, BucketState>,
    /// Longest wait a caller will sit through before failing
    max_wait: Duration,
}

impl RateLimiter {
    pub fn new(max_wait: Duration) -> Self {
        Self {
            global: Mutex::new(BucketState::Unknown),
            buckets: DashMap::new(),
            max_wait,
        }
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Block until the bucket for `(kind, id)` has capacity.
    ///
    /// Fails with `RatelimitTooLong` without sleeping when the wait would exceed
    /// the configured maximum.
    pub async fn wait_for_capacity(&self, kind: BucketKind, id: Option<Snowflake>) -> ClientResult<()> {
        let key = BucketKey::new(kind, id);

        loop {
            let Some((limited_by, wait)) = self.pending_wait(key, Instant::now()) else {
                return Ok(());
            };

            if wait > self.max_wait {
                tracing::warn!(
                    bucket = %limited_by,
                    wait_ms = wait.as_millis() as u64,
                    max_ms = self.max_wait.as_millis() as u64,
                    "Rate limit wait exceeds maximum"
                );
                return Err(ClientError::RatelimitTooLong {
                    wait,
                    max: self.max_wait,
                });
            }

            tracing::debug!(bucket = %limited_by, wait_ms = wait.as_millis() as u64, "Waiting for rate limit");
            tokio::time::sleep(wait).await;
        }
    }

    /// Wait on the global bucket only (gateway frames)
    pub async fn wait_global(&self) -> ClientResult<()> {
        self.wait_for_capacity(BucketKind::Global, None).await
    }

    /// Record the limits a response reported for `(kind, id)`.
    ///
    /// A response without rate-limit headers leaves every bucket untouched.
    pub fn update_from_response(&self, headers: &HeaderMap, kind: BucketKind, id: Option<Snowflake>) {
        let now_millis = chrono::Utc::now().timestamp_millis();
        let Some(parsed) = RateLimitHeaders::parse(headers, now_millis) else {
            return;
        };
        self.apply(parsed, BucketKey::new(kind, id), Instant::now());
    }

    /// Current state of a bucket
    pub fn bucket_state(&self, kind: BucketKind, id: Option<Snowflake>) -> BucketState {
        let key = BucketKey::new(kind, id);
        if key.kind == BucketKind::Global {
            return *self.global.lock();
        }
        self.buckets.get(&key).map(|b| *b).unwrap_or_default()
    }

    fn pending_wait(&self, key: BucketKey, now: Instant) -> Option<(BucketKey, Duration)> {
        if let Some(wait) = self.global.lock().wait_at(now) {
            return Some((BucketKey::global(), wait));
        }
        if key.kind == BucketKind::Global {
            return None;
        }
        // Lazily create so the bucket exists for the matching update
        let state = *self.buckets.entry(key).or_default();
        state.wait_at(now).map(|wait| (key, wait))
    }

    fn apply(&self, parsed: RateLimitHeaders, key: BucketKey, now: Instant) {
        if parsed.global {
            let reset_at = now + parsed.reset_after.unwrap_or_default();
            let mut global = self.global.lock();
            *global = BucketState::Known {
                limit: parsed.limit.or(global.limit()).unwrap_or(0),
                remaining: 0,
                reset_at,
            };
            tracing::warn!(
                reset_after_ms = parsed.reset_after.unwrap_or_default().as_millis() as u64,
                "Global rate limit hit"
            );
            return;
        }

        let merge = |previous: BucketState| {
            let (prev_limit, prev_remaining, prev_reset) = match previous {
                BucketState::Known {
                    limit,
                    remaining,
                    reset_at,
                } => (limit, remaining, reset_at),
                BucketState::Unknown => (0, 0, now),
            };
            let limit = parsed.limit.unwrap_or(prev_limit);
            BucketState::Known {
                limit,
                remaining: parsed.remaining.unwrap_or(if previous == BucketState::Unknown {
                    limit
                } else {
                    prev_remaining
                }),
                reset_at: parsed.reset_after.map_or(prev_reset, |after| now + after),
            }
        };

        if key.kind == BucketKind::Global {
            let mut global = self.global.lock();
            *global = merge(*global);
        } else {
            let mut entry = self.buckets.entry(key).or_default();
            *entry = merge(*entry);
        }
        tracing::trace!(bucket = %key, ?parsed, "Rate limit bucket updated");
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("buckets", &self.buckets.len())
            .field("max_wait", &self.max_wait)
            .finish()
    }
}
