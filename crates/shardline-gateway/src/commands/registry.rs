//! Command registry

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::command::Command;

/// Commands keyed by lowercase name
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register, replacing any command with the same name
    pub fn register(&self, command: Command) -> Option<Arc<Command>> {
        let name = command.name.to_lowercase();
        tracing::debug!(command = %name, "Command registered");
        self.commands.write().insert(name, Arc::new(command))
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.write().remove(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.read().get(&name.to_lowercase()).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = CommandRegistry::new();
        registry.register(Command::builder("Ping").build(|_| async { Ok(()) }));

        assert!(registry.get("ping").is_some());
        assert!(registry.get("PING").is_some());
        assert_eq!(registry.names(), vec!["ping".to_string()]);

        assert!(registry.unregister("pInG").is_some());
        assert!(registry.is_empty());
    }
}
