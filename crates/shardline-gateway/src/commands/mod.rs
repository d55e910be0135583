//! Prefix command framework

mod command;
mod context;
mod handler;
mod preconditions;
mod registry;

pub use command::{Command, CommandBody, CommandBuilder, Precondition};
pub use context::CommandContext;
pub use handler::{CommandHandler, PrefixCommandHandler};
pub use preconditions::{guild_only, owner_only, require_permissions};
pub use registry::CommandRegistry;
