//! Command definitions

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

use super::context::CommandContext;

/// Boxed command body
pub type CommandBody = Arc<dyn Fn(CommandContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Check evaluated before the body runs
pub type Precondition = Arc<dyn Fn(&CommandContext) -> bool + Send + Sync>;

/// A prefix command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: String,
    /// Argument names shown in help output
    pub hint_args: Vec<String>,
    pub preconditions: Vec<Precondition>,
    pub body: CommandBody,
}

impl Command {
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            description: String::new(),
            hint_args: Vec::new(),
            preconditions: Vec::new(),
        }
    }

    /// Whether every precondition passes
    pub fn permits(&self, ctx: &CommandContext) -> bool {
        self.preconditions.iter().all(|check| check(ctx))
    }

    /// Usage line such as `ban <user> <reason>`
    pub fn usage(&self) -> String {
        std::iter::once(self.name.clone())
            .chain(self.hint_args.iter().map(|arg| format!("<{arg}>")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("hint_args", &self.hint_args)
            .field("preconditions", &self.preconditions.len())
            .finish()
    }
}

/// Builder for [`Command`]
pub struct CommandBuilder {
    name: String,
    description: String,
    hint_args: Vec<String>,
    preconditions: Vec<Precondition>,
}

impl CommandBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hint_arg(mut self, arg: impl Into<String>) -> Self {
        self.hint_args.push(arg.into());
        self
    }

    pub fn precondition(mut self, check: Precondition) -> Self {
        self.preconditions.push(check);
        self
    }

    pub fn build<F, Fut>(self, body: F) -> Command
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Command {
            name: self.name,
            description: self.description,
            hint_args: self.hint_args,
            preconditions: self.preconditions,
            body: Arc::new(move |ctx| body(ctx).boxed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let command = Command::builder("ban")
            .description("Ban a member")
            .hint_arg("user")
            .hint_arg("reason")
            .build(|_| async { Ok(()) });

        assert_eq!(command.name, "ban");
        assert_eq!(command.usage(), "ban <user> <reason>");
        assert!(command.preconditions.is_empty());
    }
}
