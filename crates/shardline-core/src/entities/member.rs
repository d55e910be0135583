//! Member entity - represents a user's membership in a guild

use serde::{Deserialize, Serialize};

use super::keyed::Keyed;
use super::user::User;
use crate::value_objects::Snowflake;

/// Activity shown in a presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub url: Option<String>,
}

/// Last known presence of a member
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Presence {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// Guild member entity (junction between User and Guild)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
}

impl Member {
    /// Create a new Member
    pub fn new(guild_id: Snowflake, user: User) -> Self {
        Self {
            user,
            guild_id: Some(guild_id),
            ..Self::default()
        }
    }

    /// The member's user id
    #[inline]
    pub fn id(&self) -> Snowflake {
        self.user.id
    }

    /// Get display name (nickname if set, otherwise the user's name)
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or_else(|| self.user.display_name())
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }

    /// Add a role to the member
    pub fn add_role(&mut self, role_id: Snowflake) {
        if !self.has_role(role_id) {
            self.roles.push(role_id);
        }
    }

    /// Remove a role from the member
    pub fn remove_role(&mut self, role_id: Snowflake) {
        self.roles.retain(|&id| id != role_id);
    }

    /// Replace the fields a member update carries, keeping cached presence.
    pub fn apply_update(&mut self, update: Member) {
        let presence = self.presence.take();
        let guild_id = self.guild_id;
        *self = update;
        self.guild_id = self.guild_id.or(guild_id);
        if self.presence.is_none() {
            self.presence = presence;
        }
    }
}

impl Keyed for Member {
    fn key(&self) -> Snowflake {
        self.user.id
    }
}
