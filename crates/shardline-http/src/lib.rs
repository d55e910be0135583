//! # shardline-http
//!
//! The shared rate limiter and the REST request path built on it.
//!
//! ## Example
//!
//! ```ignore
//! use shardline_http::{RateLimiter, ReqwestTransport, RestClient};
//!
//! let limiter = Arc::new(RateLimiter::new(config.max_ratelimit_wait));
//! let rest = RestClient::new(&config, Arc::new(ReqwestTransport::new()?), limiter.clone());
//!
//! let gateway = rest.gateway_bot().await?;
//! ```

pub mod ratelimit;
pub mod rest;

pub use ratelimit::{BucketKey, BucketKind, BucketState, RateLimitHeaders, RateLimiter};
pub use rest::{
    GatewayBot, HttpTransport, Method, ReqwestTransport, RestClient, RestRequest, RestResponse,
    SessionStartLimit, USER_AGENT,
};
