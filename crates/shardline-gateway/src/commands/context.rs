//! Command invocation context

use shardline_common::ClientResult;
use shardline_core::Message;

use crate::client::Context;

/// One command invocation
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub ctx: Context,
    /// The message that invoked the command
    pub message: Message,
    /// Command name as typed, lowercased
    pub name: String,
    pub args: Vec<String>,
}

impl CommandContext {
    /// Argument at `index`
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Arguments joined back with single spaces
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }

    /// Post `content` to the channel the command came from
    pub async fn reply(&self, content: &str) -> ClientResult<Message> {
        self.ctx.rest.create_message(self.message.channel_id, content).await
    }
}
