//! Entity cache
//!
//! Every collection sits behind its own lock. Guild channels, roles, and members
//! live inside their guild and share the guild collection's lock; the global
//! member collection mirrors every cached member keyed by user id.
//!
//! Lock order is guilds, then private channels, then members, then messages.
//! No lock is held across an `.await`: fetches run with every lock released and
//! the result is inserted afterwards.

use parking_lot::{Mutex, RwLock};
use shardline_common::{ClientError, ClientResult};
use shardline_core::{Channel, FromDocument, Guild, Member, Message, Presence, Role, Snowflake, User};
use std::collections::HashMap;
use std::sync::Arc;

use super::messages::MessageStore;
use crate::fetch::EntityFetcher;

/// Outcome of removing a member from a guild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberRemoval {
    /// The member as it was cached in the guild
    pub member: Option<Member>,
    /// Whether the user was also dropped from the global member collection
    pub pruned: bool,
}

/// In-memory mirror of remote state
pub struct Cache {
    guilds: RwLock<HashMap<Snowflake, Guild>>,
    private_channels: RwLock<HashMap<Snowflake, Channel>>,
    members: RwLock<HashMap<Snowflake, Member>>,
    messages: Mutex<MessageStore>,
    current_user: RwLock<Option<User>>,
    fetcher: Arc<dyn EntityFetcher>,
}

impl Cache {
    /// Create an empty cache holding at most `message_cache_size` messages
    pub fn new(message_cache_size: usize, fetcher: Arc<dyn EntityFetcher>) -> Self {
        Self {
            guilds: RwLock::new(HashMap::new()),
            private_channels: RwLock::new(HashMap::new()),
            members: RwLock::new(HashMap::new()),
            messages: Mutex::new(MessageStore::new(message_cache_size)),
            current_user: RwLock::new(None),
            fetcher,
        }
    }

    // ========================================================================
    // Guilds
    // ========================================================================

    /// Get a guild, fetching it on a miss when `allow_fetch` is set
    pub async fn guild(&self, guild_id: Snowflake, allow_fetch: bool) -> ClientResult<Guild> {
        if let Some(guild) = self.cached_guild(guild_id) {
            return Ok(guild);
        }
        if !allow_fetch {
            return Err(ClientError::not_found("guild", guild_id));
        }

        tracing::debug!(guild_id = %guild_id, "Guild cache miss, fetching");
        let document = self.fetcher.fetch_guild(guild_id).await?;
        let guild = Guild::from_document(&document)?;
        self.insert_guild(guild.clone());
        Ok(self.cached_guild(guild_id).unwrap_or(guild))
    }

    pub fn cached_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        self.guilds.read().get(&guild_id).cloned()
    }

    /// Read a cached guild in place under the collection lock
    pub fn with_guild<R>(&self, guild_id: Snowflake, f: impl FnOnce(&Guild) -> R) -> Option<R> {
        self.guilds.read().get(&guild_id).map(f)
    }

    /// Mutate a cached guild in place under the collection lock
    pub fn update_guild<R>(&self, guild_id: Snowflake, f: impl FnOnce(&mut Guild) -> R) -> Option<R> {
        self.guilds.write().get_mut(&guild_id).map(f)
    }

    /// Insert or replace a guild, mirroring its members into the global collection.
    ///
    /// Returns the guild previously cached under the same id.
    pub fn insert_guild(&self, mut guild: Guild) -> Option<Guild> {
        guild.normalize();
        let mut guilds = self.guilds.write();
        let mut members = self.members.write();
        for member in guild.members.values() {
            members.insert(member.id(), member.clone());
        }
        guilds.insert(guild.id, guild)
    }

    /// Remove a guild, pruning members that no other cached guild holds
    pub fn remove_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        let mut guilds = self.guilds.write();
        let removed = guilds.remove(&guild_id)?;

        let mut members = self.members.write();
        for user_id in removed.members.keys() {
            if !guilds.values().any(|g| g.members.contains_key(user_id)) {
                members.remove(user_id);
            }
        }
        Some(removed)
    }

    pub fn guild_ids(&self) -> Vec<Snowflake> {
        self.guilds.read().keys().copied().collect()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.read().len()
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Get a channel: direct messages first, then every cached guild, then the network
    pub async fn channel(&self, channel_id: Snowflake, allow_fetch: bool) -> ClientResult<Channel> {
        if let Some(channel) = self.cached_channel(channel_id) {
            return Ok(channel);
        }
        if !allow_fetch {
            return Err(ClientError::not_found("channel", channel_id));
        }

        tracing::debug!(channel_id = %channel_id, "Channel cache miss, fetching");
        let document = self.fetcher.fetch_channel(channel_id).await?;
        let channel = Channel::from_document(&document)?;
        self.insert_channel(channel.clone());
        Ok(channel)
    }

    pub fn cached_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if let Some(channel) = self.private_channels.read().get(&channel_id) {
            return Some(channel.clone());
        }
        self.guilds
            .read()
            .values()
            .find_map(|guild| guild.channel(channel_id).cloned())
    }

    /// Insert or replace a channel in its guild, or in the direct-message
    /// collection when it has no guild.
    ///
    /// A guild channel whose guild is not cached is dropped; returns whether the
    /// channel was stored.
    pub fn insert_channel(&self, channel: Channel) -> bool {
        match channel.guild_id {
            Some(guild_id) => {
                let stored = self
                    .update_guild(guild_id, |guild| guild.insert_channel(channel))
                    .is_some();
                if !stored {
                    tracing::debug!(guild_id = %guild_id, "Channel for uncached guild not stored");
                }
                stored
            }
            None => {
                self.private_channels.write().insert(channel.id, channel);
                true
            }
        }
    }

    /// Remove a channel from wherever it is cached
    pub fn remove_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if let Some(channel) = self.private_channels.write().remove(&channel_id) {
            return Some(channel);
        }
        self.guilds
            .write()
            .values_mut()
            .find_map(|guild| guild.channels.remove(&channel_id))
    }

    pub fn private_channel_count(&self) -> usize {
        self.private_channels.read().len()
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Get a guild member, fetching it on a miss when `allow_fetch` is set
    pub async fn member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        allow_fetch: bool,
    ) -> ClientResult<Member> {
        if let Some(member) = self.cached_member(guild_id, user_id) {
            return Ok(member);
        }
        if !allow_fetch {
            return Err(ClientError::not_found("member", user_id));
        }

        tracing::debug!(guild_id = %guild_id, user_id = %user_id, "Member cache miss, fetching");
        let document = self.fetcher.fetch_member(guild_id, user_id).await?;
        let mut member = Member::from_document(&document)?;
        member.guild_id = Some(guild_id);
        self.insert_member(guild_id, member.clone());
        Ok(member)
    }

    pub fn cached_member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.guilds
            .read()
            .get(&guild_id)
            .and_then(|guild| guild.member(user_id).cloned())
    }

    /// Member from the global collection, regardless of guild
    pub fn global_member(&self, user_id: Snowflake) -> Option<Member> {
        self.members.read().get(&user_id).cloned()
    }

    pub fn global_member_count(&self) -> usize {
        self.members.read().len()
    }

    /// Insert or replace a member in its guild and in the global collection.
    ///
    /// The global entry is written even when the guild itself is not cached.
    pub fn insert_member(&self, guild_id: Snowflake, mut member: Member) {
        member.guild_id = Some(guild_id);
        let mut guilds = self.guilds.write();
        if let Some(guild) = guilds.get_mut(&guild_id) {
            guild.insert_member(member.clone());
        }
        self.members.write().insert(member.id(), member);
    }

    /// Record a member joining a guild.
    ///
    /// The guild's member count goes up only when the member was not already
    /// cached there. Returns whether the member is new to the guild.
    pub fn add_member(&self, guild_id: Snowflake, mut member: Member) -> bool {
        member.guild_id = Some(guild_id);
        let user_id = member.id();
        let mut guilds = self.guilds.write();
        let added = match guilds.get_mut(&guild_id) {
            Some(guild) => {
                let added = !guild.members.contains_key(&user_id);
                guild.insert_member(member.clone());
                if added {
                    guild.member_count = guild.member_count.map(|count| count + 1);
                }
                added
            }
            None => false,
        };
        self.members.write().insert(user_id, member);
        added
    }

    /// Apply a member update, returning the previous and the resulting member.
    ///
    /// A member that was not cached is inserted as given.
    pub fn apply_member_update(&self, guild_id: Snowflake, update: Member) -> (Option<Member>, Member) {
        let user_id = update.id();
        let mut guilds = self.guilds.write();
        let previous = guilds
            .get(&guild_id)
            .and_then(|guild| guild.member(user_id).cloned());

        let mut updated = previous.clone().unwrap_or_default();
        updated.apply_update(update);
        updated.guild_id = Some(guild_id);

        if let Some(guild) = guilds.get_mut(&guild_id) {
            guild.insert_member(updated.clone());
        }
        self.members.write().insert(user_id, updated.clone());
        (previous, updated)
    }

    /// Remove a member from a guild.
    ///
    /// The user leaves the global collection too when no other cached guild
    /// still holds them.
    pub fn remove_member(&self, guild_id: Snowflake, user_id: Snowflake) -> MemberRemoval {
        let mut guilds = self.guilds.write();
        let member = guilds
            .get_mut(&guild_id)
            .and_then(|guild| guild.members.remove(&user_id));

        let still_shared = guilds.values().any(|guild| guild.members.contains_key(&user_id));
        let pruned = if still_shared {
            false
        } else {
            self.members.write().remove(&user_id).is_some()
        };

        MemberRemoval { member, pruned }
    }

    /// Store the latest presence on a cached member.
    ///
    /// Returns false when the member is not cached in that guild.
    pub fn set_presence(&self, guild_id: Snowflake, user_id: Snowflake, presence: Presence) -> bool {
        let mut guilds = self.guilds.write();
        let Some(member) = guilds
            .get_mut(&guild_id)
            .and_then(|guild| guild.members.get_mut(&user_id))
        else {
            return false;
        };
        member.presence = Some(presence.clone());
        if let Some(global) = self.members.write().get_mut(&user_id) {
            global.presence = Some(presence);
        }
        true
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Insert or replace a role, returning the previous version
    pub fn upsert_role(&self, guild_id: Snowflake, role: Role) -> Option<Role> {
        self.update_guild(guild_id, |guild| guild.roles.insert(role.id, role))
            .flatten()
    }

    /// Remove a role from a guild and from every member holding it
    pub fn remove_role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        let mut guilds = self.guilds.write();
        let guild = guilds.get_mut(&guild_id)?;
        let removed = guild.remove_role(role_id)?;

        let mut members = self.members.write();
        for user_id in guild.members.keys() {
            if let Some(member) = members.get_mut(user_id) {
                member.remove_role(role_id);
            }
        }
        Some(removed)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Get a message, fetching it on a miss when `allow_fetch` is set
    pub async fn message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        allow_fetch: bool,
    ) -> ClientResult<Message> {
        if let Some(message) = self.cached_message(message_id) {
            return Ok(message);
        }
        if !allow_fetch {
            return Err(ClientError::not_found("message", message_id));
        }

        tracing::debug!(channel_id = %channel_id, message_id = %message_id, "Message cache miss, fetching");
        let document = self.fetcher.fetch_message(channel_id, message_id).await?;
        let message = Message::from_document(&document)?;
        self.insert_message(message.clone());
        Ok(message)
    }

    pub fn cached_message(&self, message_id: Snowflake) -> Option<Message> {
        self.messages.lock().get(message_id).cloned()
    }

    /// Insert or replace a message, returning the message evicted to make room
    pub fn insert_message(&self, message: Message) -> Option<Message> {
        let evicted = self.messages.lock().insert(message);
        if let Some(evicted) = &evicted {
            tracing::trace!(message_id = %evicted.id, "Evicted oldest cached message");
        }
        evicted
    }

    /// Mutate a cached message in place under the collection lock
    pub fn update_message<R>(&self, message_id: Snowflake, f: impl FnOnce(&mut Message) -> R) -> Option<R> {
        self.messages.lock().get_mut(message_id).map(f)
    }

    pub fn remove_message(&self, message_id: Snowflake) -> Option<Message> {
        self.messages.lock().remove(message_id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Cached message ids, oldest first
    pub fn message_ids(&self) -> Vec<Snowflake> {
        self.messages.lock().ids().collect()
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// The account the client is logged in as
    pub async fn current_user(&self, allow_fetch: bool) -> ClientResult<User> {
        if let Some(user) = self.cached_current_user() {
            return Ok(user);
        }
        if !allow_fetch {
            return Err(ClientError::not_found("current user", Snowflake::default()));
        }

        tracing::debug!("Current user not cached, fetching");
        let document = self.fetcher.fetch_current_user().await?;
        let user = User::from_document(&document)?;
        self.set_current_user(user.clone());
        Ok(user)
    }

    pub fn cached_current_user(&self) -> Option<User> {
        self.current_user.read().clone()
    }

    pub fn set_current_user(&self, user: User) {
        *self.current_user.write() = Some(user);
    }

    /// Look a user up through the current user and the member collections.
    ///
    /// Users are only cached as part of a membership, so a fetched user is
    /// returned without being stored.
    pub async fn user(&self, user_id: Snowflake, allow_fetch: bool) -> ClientResult<User> {
        if let Some(user) = self.cached_current_user().filter(|u| u.id == user_id) {
            return Ok(user);
        }
        if let Some(member) = self.global_member(user_id) {
            return Ok(member.user);
        }
        if !allow_fetch {
            return Err(ClientError::not_found("user", user_id));
        }

        let document = self.fetcher.fetch_user(user_id).await?;
        Ok(User::from_document(&document)?)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("guilds", &self.guild_count())
            .field("private_channels", &self.private_channel_count())
            .field("members", &self.global_member_count())
            .field("messages", &self.message_count())
            .finish()
    }
}
