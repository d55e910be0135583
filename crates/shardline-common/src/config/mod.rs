//! Configuration structs

mod client_config;

pub use client_config::{ClientConfig, ConfigError, TokenType, MIN_SHARD_START_DELAY};
