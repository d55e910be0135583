//! Guild entity - a server with its channels, roles, and members

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::channel::Channel;
use super::emoji::Emoji;
use super::keyed::{self, Keyed};
use super::member::Member;
use super::role::Role;
use crate::value_objects::{Permissions, Snowflake};

/// Guild (server) entity
///
/// Channels, roles, and members arrive as arrays and are kept keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default, with = "keyed")]
    pub roles: HashMap<Snowflake, Role>,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
    #[serde(default, with = "keyed")]
    pub channels: HashMap<Snowflake, Channel>,
    #[serde(default, with = "keyed")]
    pub members: HashMap<Snowflake, Member>,
}

impl Guild {
    /// Create a new, empty Guild
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Stamp the guild id onto nested channels and members.
    ///
    /// Nested objects in a guild payload omit their parent id.
    pub fn normalize(&mut self) {
        let id = self.id;
        for channel in self.channels.values_mut() {
            channel.guild_id = Some(id);
        }
        for member in self.members.values_mut() {
            member.guild_id = Some(id);
        }
    }

    /// Check if a user is the guild owner
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    pub fn member(&self, user_id: Snowflake) -> Option<&Member> {
        self.members.get(&user_id)
    }

    pub fn channel(&self, channel_id: Snowflake) -> Option<&Channel> {
        self.channels.get(&channel_id)
    }

    pub fn role(&self, role_id: Snowflake) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Insert or replace a member
    pub fn insert_member(&mut self, mut member: Member) {
        member.guild_id = Some(self.id);
        self.members.insert(member.id(), member);
    }

    /// Insert or replace a channel
    pub fn insert_channel(&mut self, mut channel: Channel) {
        channel.guild_id = Some(self.id);
        self.channels.insert(channel.id, channel);
    }

    /// Remove a role and strip it from every member
    pub fn remove_role(&mut self, role_id: Snowflake) -> Option<Role> {
        let removed = self.roles.remove(&role_id);
        if removed.is_some() {
            for member in self.members.values_mut() {
                member.remove_role(role_id);
            }
        }
        removed
    }

    /// Apply a GUILD_UPDATE body, which carries no channels or members.
    pub fn apply_update(&mut self, update: Guild) {
        let channels = std::mem::take(&mut self.channels);
        let members = std::mem::take(&mut self.members);
        let member_count = self.member_count;
        *self = update;
        self.channels = channels;
        self.members = members;
        self.member_count = self.member_count.or(member_count);
    }

    /// Guild-level permissions of a member.
    ///
    /// The owner and administrators hold every permission. Channel overwrites are
    /// not considered.
    pub fn member_permissions(&self, user_id: Snowflake) -> Permissions {
        if self.is_owner(user_id) {
            return Permissions::all();
        }

        // The @everyone role shares the guild's id
        let everyone = self.roles.get(&self.id).map(|r| r.permissions).unwrap_or_default();
        let granted = self.member(user_id).map_or(everyone, |member| {
            everyone
                | Permissions::combine(
                    member
                        .roles
                        .iter()
                        .filter_map(|id| self.roles.get(id))
                        .map(|role| role.permissions),
                )
        });

        if granted.contains(Permissions::ADMINISTRATOR) {
            Permissions::all()
        } else {
            granted
        }
    }
}

impl Keyed for Guild {
    fn key(&self) -> Snowflake {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::User;
    use serde_json::json;

    fn sample() -> Guild {
        let mut guild: Guild = serde_json::from_value(json!({
            "id": "1",
            "name": "Test Guild",
            "owner_id": "99",
            "roles": [
                {"id": "1", "name": "@everyone", "permissions": "3072"},
                {"id": "10", "name": "mod", "permissions": "2"},
                {"id": "11", "name": "admin", "permissions": "8"}
            ],
            "channels": [{"id": "5", "type": 0, "name": "general"}],
            "members": [
                {"user": {"id": "20", "username": "a"}, "roles": ["10"]},
                {"user": {"id": "21", "username": "b"}, "roles": ["11"]}
            ]
        }))
        .unwrap();
        guild.normalize();
        guild
    }

    #[test]
    fn test_deserialize_keyed_collections() {
        let guild = sample();
        assert_eq!(guild.roles.len(), 3);
        assert_eq!(guild.member(Snowflake::new(20)).unwrap().user.username, "a");
        assert_eq!(guild.channel(Snowflake::new(5)).unwrap().guild_id, Some(Snowflake::new(1)));
        assert_eq!(guild.member(Snowflake::new(21)).unwrap().guild_id, Some(Snowflake::new(1)));
    }

    #[test]
    fn test_member_permissions() {
        let guild = sample();

        let moderator = guild.member_permissions(Snowflake::new(20));
        assert!(moderator.contains(Permissions::KICK_MEMBERS));
        assert!(moderator.contains(Permissions::SEND_MESSAGES));
        assert!(!moderator.contains(Permissions::BAN_MEMBERS));

        assert_eq!(guild.member_permissions(Snowflake::new(21)), Permissions::all());
        assert_eq!(guild.member_permissions(Snowflake::new(99)), Permissions::all());

        let stranger = guild.member_permissions(Snowflake::new(500));
        assert_eq!(stranger, Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES);
    }

    #[test]
    fn test_remove_role_strips_members() {
        let mut guild = sample();
        assert!(guild.remove_role(Snowflake::new(10)).is_some());
        assert!(!guild.member(Snowflake::new(20)).unwrap().has_role(Snowflake::new(10)));
        assert!(guild.remove_role(Snowflake::new(10)).is_none());
    }

    #[test]
    fn test_apply_update_keeps_collections() {
        let mut guild = sample();
        guild.insert_member(Member::new(Snowflake::new(1), User::new(Snowflake::new(22), "c")));

        let update: Guild = serde_json::from_value(json!({"id": "1", "name": "Renamed"})).unwrap();
        guild.apply_update(update);

        assert_eq!(guild.name, "Renamed");
        assert_eq!(guild.members.len(), 3);
        assert_eq!(guild.channels.len(), 1);
    }
}
