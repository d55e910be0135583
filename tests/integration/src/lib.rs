//! Integration test utilities for shardline
//!
//! Scripted gateway and REST transports, plus payload fixtures, for driving a
//! full `Client` end to end without a network.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
