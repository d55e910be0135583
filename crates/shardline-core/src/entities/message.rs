//! Message entity - a message in a channel, with its reactions

use serde::{Deserialize, Serialize};

use super::emoji::Emoji;
use super::keyed::Keyed;
use super::user::User;
use crate::document::{Document, DocumentExt};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Aggregated reaction on a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub count: u32,
    #[serde(default)]
    pub me: bool,
    pub emoji: Emoji,
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub mention_roles: Vec<Snowflake>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub webhook_id: Option<Snowflake>,
}

impl Message {
    /// Create a new Message
    pub fn new(id: Snowflake, channel_id: Snowflake, author: User, content: impl Into<String>) -> Self {
        Self {
            id,
            channel_id,
            author,
            content: content.into(),
            ..Self::default()
        }
    }

    /// Whether the message has ever been edited
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    /// Whether this is a direct message
    #[inline]
    pub fn is_private(&self) -> bool {
        self.guild_id.is_none()
    }

    /// Count one more reaction, inserting the emoji if it is new.
    pub fn add_reaction(&mut self, emoji: Emoji, me: bool) {
        if let Some(reaction) = self.reactions.iter_mut().find(|r| r.emoji.same_as(&emoji)) {
            reaction.count += 1;
            reaction.me |= me;
        } else {
            self.reactions.push(Reaction { count: 1, me, emoji });
        }
    }

    /// Count one fewer reaction, erasing the emoji when it reaches zero.
    pub fn remove_reaction(&mut self, emoji: &Emoji, me: bool) {
        if let Some(pos) = self.reactions.iter().position(|r| r.emoji.same_as(emoji)) {
            let reaction = &mut self.reactions[pos];
            if reaction.count <= 1 {
                self.reactions.remove(pos);
            } else {
                reaction.count -= 1;
                if me {
                    reaction.me = false;
                }
            }
        }
    }

    /// Drop every reaction
    pub fn clear_reactions(&mut self) {
        self.reactions.clear();
    }

    /// Merge a partial MESSAGE_UPDATE body into this message.
    ///
    /// Only fields present in the document are touched. Every field is parsed
    /// before any is written, so a bad field leaves the message unchanged.
    pub fn merge_document(&mut self, doc: &Document) -> Result<(), DomainError> {
        let content: Option<String> = doc.opt_field("content")?;
        let edited_timestamp: Option<Option<String>> = if doc.has_field("edited_timestamp") {
            Some(doc.opt_field("edited_timestamp")?)
        } else {
            None
        };
        let tts: Option<bool> = doc.opt_field("tts")?;
        let pinned: Option<bool> = doc.opt_field("pinned")?;
        let mention_everyone: Option<bool> = doc.opt_field("mention_everyone")?;
        let mentions: Option<Vec<User>> = doc.opt_field("mentions")?;
        let mention_roles: Option<Vec<Snowflake>> = doc.opt_field("mention_roles")?;

        if let Some(content) = content {
            self.content = content;
        }
        if let Some(edited_timestamp) = edited_timestamp {
            self.edited_timestamp = edited_timestamp;
        }
        if let Some(tts) = tts {
            self.tts = tts;
        }
        if let Some(pinned) = pinned {
            self.pinned = pinned;
        }
        if let Some(mention_everyone) = mention_everyone {
            self.mention_everyone = mention_everyone;
        }
        if let Some(mentions) = mentions {
            self.mentions = mentions;
        }
        if let Some(mention_roles) = mention_roles {
            self.mention_roles = mention_roles;
        }
        Ok(())
    }
}

impl Keyed for Message {
    fn key(&self) -> Snowflake {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> Message {
        Message::new(
            Snowflake::new(3),
            Snowflake::new(2),
            User::new(Snowflake::new(1), "author"),
            "hello",
        )
    }

    #[test]
    fn test_reaction_counting() {
        let mut msg = message();
        let fire = Emoji::unicode("🔥");

        msg.add_reaction(fire.clone(), false);
        msg.add_reaction(fire.clone(), true);
        msg.add_reaction(Emoji::unicode("👍"), false);
        assert_eq!(msg.reactions.len(), 2);
        assert_eq!(msg.reactions[0].count, 2);
        assert!(msg.reactions[0].me);

        msg.remove_reaction(&fire, true);
        assert_eq!(msg.reactions[0].count, 1);
        assert!(!msg.reactions[0].me);

        msg.remove_reaction(&fire, false);
        assert_eq!(msg.reactions.len(), 1);
        assert_eq!(msg.reactions[0].emoji.name.as_deref(), Some("👍"));

        msg.clear_reactions();
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn test_merge_partial_update() {
        let mut msg = message();
        msg.pinned = true;

        msg.merge_document(&json!({
            "id": "3",
            "channel_id": "2",
            "content": "edited",
            "edited_timestamp": "2024-01-01T00:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(msg.content, "edited");
        assert!(msg.is_edited());
        assert!(msg.pinned);
        assert_eq!(msg.author.username, "author");
    }

    #[test]
    fn test_merge_rejects_bad_types() {
        let mut msg = message();
        assert!(msg.merge_document(&json!({"content": 5})).is_err());
    }

    #[test]
    fn test_failed_merge_leaves_message_untouched() {
        let mut msg = message();
        let before = msg.clone();

        // content parses, mention_roles does not
        let result = msg.merge_document(&json!({
            "content": "edited",
            "pinned": true,
            "mention_roles": "not-a-list"
        }));
        assert!(result.is_err());
        assert_eq!(msg, before);
    }
}
