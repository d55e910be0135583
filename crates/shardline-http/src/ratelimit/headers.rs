//! Rate-limit response headers

use reqwest::header::HeaderMap;
use std::time::Duration;

pub const GLOBAL: &str = "x-ratelimit-global";
pub const LIMIT: &str = "x-ratelimit-limit";
pub const REMAINING: &str = "x-ratelimit-remaining";
pub const RESET: &str = "x-ratelimit-reset";
pub const RESET_AFTER: &str = "x-ratelimit-reset-after";
pub const RETRY_AFTER: &str = "retry-after";

/// Rate-limit fields reported by one response
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateLimitHeaders {
    pub global: bool,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Time until the bucket resets, relative to when the response arrived
    pub reset_after: Option<Duration>,
}

impl RateLimitHeaders {
    /// Parse the rate-limit headers, or `None` when the response has none.
    ///
    /// `now_millis` is the current Unix time, used to turn the absolute
    /// `X-RateLimit-Reset` into a relative duration when `Reset-After` is absent.
    pub fn parse(headers: &HeaderMap, now_millis: i64) -> Option<Self> {
        let global = header_str(headers, GLOBAL).is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let limit = header_str(headers, LIMIT).and_then(|v| v.parse().ok());
        let remaining = header_str(headers, REMAINING).and_then(|v| v.parse().ok());

        let reset_after = header_seconds(headers, RESET_AFTER)
            .or_else(|| {
                header_seconds(headers, RESET).map(|reset_at| {
                    let delta_ms = (reset_at.as_millis() as i64 - now_millis).max(0);
                    Duration::from_millis(delta_ms as u64)
                })
            })
            .or_else(|| if global { header_seconds(headers, RETRY_AFTER) } else { None });

        if !global && limit.is_none() && remaining.is_none() && reset_after.is_none() {
            return None;
        }

        Some(Self {
            global,
            limit,
            remaining,
            reset_after,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

// Seconds with an optional fractional (millisecond) part
fn header_seconds(headers: &HeaderMap, name: &str) -> Option<Duration> {
    header_str(headers, name)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}
