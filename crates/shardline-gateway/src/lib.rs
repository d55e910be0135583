//! # shardline-gateway
//!
//! Sharded gateway client: connection state machine, event dispatch into the
//! cache, listeners, prefix commands, and the client facade.

pub mod client;
pub mod commands;
pub mod dispatch;
pub mod events;
pub mod protocol;
pub mod shard;
pub mod tasks;
pub mod transport;

pub use client::{Client, ClientBuilder, Context};
pub use commands::{Command, CommandContext, CommandHandler, CommandRegistry, PrefixCommandHandler};
pub use dispatch::{EventDispatcher, ListenerId};
pub use events::{Event, EventType};
pub use shard::{Shard, ShardInfo, ShardState};
pub use tasks::TaskQueue;
pub use transport::{Connection, GatewayTransport, OutboundFrame, TransportEvent, TungsteniteTransport};
