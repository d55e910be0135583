//! Rate limiting driven by response headers

mod bucket;
pub mod headers;
mod limiter;

pub use bucket::{BucketKey, BucketKind, BucketState};
pub use headers::RateLimitHeaders;
pub use limiter::RateLimiter;
