//! Command handling for incoming messages

use async_trait::async_trait;
use shardline_core::Message;
use std::sync::Arc;

use super::context::CommandContext;
use super::registry::CommandRegistry;
use crate::client::Context;
use crate::tasks::TaskQueue;

/// Decides whether a created message invokes a command
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a created message; returns whether a command was scheduled
    async fn handle(&self, ctx: Context, message: &Message, queue: &TaskQueue) -> bool;
}

/// Default handler: `<prefix><name> <args...>`
pub struct PrefixCommandHandler {
    registry: Arc<CommandRegistry>,
    prefixes: Vec<String>,
}

impl PrefixCommandHandler {
    pub fn new(registry: Arc<CommandRegistry>, prefixes: Vec<String>) -> Self {
        Self { registry, prefixes }
    }

    /// Split `content` into a lowercase command name and its arguments
    pub fn parse(&self, content: &str) -> Option<(String, Vec<String>)> {
        let rest = self
            .prefixes
            .iter()
            .find_map(|prefix| content.strip_prefix(prefix.as_str()))?;
        let mut words = rest.split_whitespace();
        // The name must follow the prefix directly
        if rest.starts_with(char::is_whitespace) {
            return None;
        }
        let name = words.next()?.to_lowercase();
        Some((name, words.map(String::from).collect()))
    }
}

#[async_trait]
impl CommandHandler for PrefixCommandHandler {
    async fn handle(&self, ctx: Context, message: &Message, queue: &TaskQueue) -> bool {
        if message.author.bot {
            return false;
        }
        let Some((name, args)) = self.parse(&message.content) else {
            return false;
        };
        let Some(command) = self.registry.get(&name) else {
            tracing::debug!(command = %name, "Unknown command");
            return false;
        };

        let invocation = CommandContext {
            ctx,
            message: message.clone(),
            name,
            args,
        };
        if !command.permits(&invocation) {
            tracing::debug!(
                command = %invocation.name,
                author = %message.author.id,
                "Command precondition failed"
            );
            return false;
        }

        tracing::debug!(
            shard = %invocation.ctx.shard,
            command = %invocation.name,
            args = invocation.args.len(),
            "Running command"
        );
        let body = Arc::clone(&command.body);
        queue.schedule("command", body(invocation))
    }
}

impl std::fmt::Debug for PrefixCommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixCommandHandler")
            .field("prefixes", &self.prefixes)
            .field("commands", &self.registry.len())
            .finish()
    }
}
