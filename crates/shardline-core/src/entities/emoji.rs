//! Emoji entity - custom guild emoji or unicode emoji

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Emoji
///
/// Unicode emoji have no id and carry the character itself as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

impl Emoji {
    /// A unicode emoji
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A custom guild emoji
    pub fn custom(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Same emoji: custom emoji compare by id, unicode emoji by name
    pub fn same_as(&self, other: &Emoji) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.name == other.name,
            _ => false,
        }
    }

    /// Form used in reaction routes (`name:id` or the unicode character)
    pub fn reaction_key(&self) -> String {
        match (self.id, self.name.as_deref()) {
            (Some(id), Some(name)) => format!("{name}:{id}"),
            (Some(id), None) => format!("_:{id}"),
            (None, name) => name.unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_as() {
        let thumbs = Emoji::unicode("👍");
        assert!(thumbs.same_as(&Emoji::unicode("👍")));
        assert!(!thumbs.same_as(&Emoji::unicode("👎")));

        let custom = Emoji::custom(Snowflake::new(7), "blob");
        let renamed = Emoji::custom(Snowflake::new(7), "blob2");
        assert!(custom.same_as(&renamed));
        assert!(!custom.same_as(&Emoji::unicode("blob")));
    }

    #[test]
    fn test_reaction_key() {
        assert_eq!(Emoji::custom(Snowflake::new(7), "blob").reaction_key(), "blob:7");
        assert_eq!(Emoji::unicode("🔥").reaction_key(), "🔥");
    }
}
