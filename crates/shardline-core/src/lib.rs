//! # shardline-core
//!
//! Domain layer containing snowflakes, entities, and the document abstraction.
//! This crate performs no I/O.

pub mod document;
pub mod entities;
pub mod error;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use document::{parse_document, Document, DocumentExt, FromDocument};
pub use entities::{
    Activity, Channel, ChannelType, Emoji, Guild, Keyed, Member, Message, Presence, Reaction, Role,
    User,
};
pub use error::DomainError;
pub use value_objects::{Permissions, Snowflake, SnowflakeParseError};
