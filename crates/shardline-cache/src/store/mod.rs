//! In-memory entity store

mod cache;
mod messages;

pub use cache::{Cache, MemberRemoval};
