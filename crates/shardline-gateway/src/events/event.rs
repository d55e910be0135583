//! Typed events
//!
//! One variant per event kind. Listeners receive an `Arc<Event>` and match on
//! the variant they registered for.

use shardline_core::{
    Channel, Document, Emoji, Guild, Member, Message, Presence, Role, Snowflake, User,
};

use super::event_types::EventType;

/// An event delivered to listeners
#[derive(Debug, Clone)]
pub enum Event {
    Ready {
        session_id: String,
        user: User,
        /// Guilds the session will receive, still unavailable at this point
        guilds: Vec<Snowflake>,
    },
    Resumed,

    ChannelCreate {
        channel: Channel,
    },
    ChannelUpdate {
        old: Option<Channel>,
        channel: Channel,
    },
    ChannelDelete {
        channel: Channel,
    },
    ChannelPinsUpdate {
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        last_pin_timestamp: Option<String>,
    },

    GuildCreate {
        guild: Box<Guild>,
    },
    GuildUpdate {
        old: Option<Box<Guild>>,
        guild: Box<Guild>,
    },
    GuildDelete {
        guild_id: Snowflake,
        /// True for an outage, false when the client left or was removed
        unavailable: bool,
        guild: Option<Box<Guild>>,
    },
    GuildBanAdd {
        guild_id: Snowflake,
        user: User,
    },
    GuildBanRemove {
        guild_id: Snowflake,
        user: User,
    },
    GuildEmojisUpdate {
        guild_id: Snowflake,
        emojis: Vec<Emoji>,
    },
    GuildIntegrationsUpdate {
        guild_id: Snowflake,
    },

    GuildMemberAdd {
        guild_id: Snowflake,
        member: Member,
    },
    GuildMemberRemove {
        guild_id: Snowflake,
        user: User,
        /// The cached member, if there was one
        member: Option<Member>,
    },
    GuildMemberUpdate {
        guild_id: Snowflake,
        old: Option<Member>,
        member: Member,
    },
    GuildMembersChunk {
        guild_id: Snowflake,
        members: Vec<Member>,
        chunk_index: u32,
        chunk_count: u32,
    },

    GuildRoleCreate {
        guild_id: Snowflake,
        role: Role,
    },
    GuildRoleUpdate {
        guild_id: Snowflake,
        old: Option<Role>,
        role: Role,
    },
    GuildRoleDelete {
        guild_id: Snowflake,
        role_id: Snowflake,
        role: Option<Role>,
    },

    MessageCreate {
        message: Message,
    },
    MessageUpdate {
        /// `None` when the message was not cached
        old: Option<Message>,
        message: Message,
        is_edited: bool,
    },
    MessageDelete {
        message_id: Snowflake,
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        message: Option<Message>,
    },
    MessageDeleteBulk {
        message_ids: Vec<Snowflake>,
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        /// The subset of deleted messages that was cached
        messages: Vec<Message>,
    },

    MessageReactionAdd {
        user_id: Snowflake,
        channel_id: Snowflake,
        message_id: Snowflake,
        guild_id: Option<Snowflake>,
        emoji: Emoji,
        message: Option<Message>,
    },
    MessageReactionRemove {
        user_id: Snowflake,
        channel_id: Snowflake,
        message_id: Snowflake,
        guild_id: Option<Snowflake>,
        emoji: Emoji,
        message: Option<Message>,
    },
    MessageReactionRemoveAll {
        channel_id: Snowflake,
        message_id: Snowflake,
        guild_id: Option<Snowflake>,
        message: Option<Message>,
    },

    PresenceUpdate {
        guild_id: Snowflake,
        user_id: Snowflake,
        presence: Presence,
    },
    TypingStart {
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        user_id: Snowflake,
        /// Unix time in seconds
        timestamp: u64,
    },
    UserUpdate {
        old: Option<User>,
        user: User,
    },

    VoiceStateUpdate {
        guild_id: Option<Snowflake>,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
        session_id: String,
        /// The full voice state
        data: Document,
    },
    VoiceServerUpdate {
        guild_id: Snowflake,
        token: String,
        endpoint: Option<String>,
    },
    WebhooksUpdate {
        guild_id: Snowflake,
        channel_id: Snowflake,
    },

    Disconnected {
        code: u16,
        reason: String,
    },
    Reconnected,
    InvalidSession {
        resumable: bool,
    },
}

impl Event {
    /// The kind listeners registered for
    pub fn kind(&self) -> EventType {
        match self {
            Self::Ready { .. } => EventType::Ready,
            Self::Resumed => EventType::Resumed,
            Self::ChannelCreate { .. } => EventType::ChannelCreate,
            Self::ChannelUpdate { .. } => EventType::ChannelUpdate,
            Self::ChannelDelete { .. } => EventType::ChannelDelete,
            Self::ChannelPinsUpdate { .. } => EventType::ChannelPinsUpdate,
            Self::GuildCreate { .. } => EventType::GuildCreate,
            Self::GuildUpdate { .. } => EventType::GuildUpdate,
            Self::GuildDelete { .. } => EventType::GuildDelete,
            Self::GuildBanAdd { .. } => EventType::GuildBanAdd,
            Self::GuildBanRemove { .. } => EventType::GuildBanRemove,
            Self::GuildEmojisUpdate { .. } => EventType::GuildEmojisUpdate,
            Self::GuildIntegrationsUpdate { .. } => EventType::GuildIntegrationsUpdate,
            Self::GuildMemberAdd { .. } => EventType::GuildMemberAdd,
            Self::GuildMemberRemove { .. } => EventType::GuildMemberRemove,
            Self::GuildMemberUpdate { .. } => EventType::GuildMemberUpdate,
            Self::GuildMembersChunk { .. } => EventType::GuildMembersChunk,
            Self::GuildRoleCreate { .. } => EventType::GuildRoleCreate,
            Self::GuildRoleUpdate { .. } => EventType::GuildRoleUpdate,
            Self::GuildRoleDelete { .. } => EventType::GuildRoleDelete,
            Self::MessageCreate { .. } => EventType::MessageCreate,
            Self::MessageUpdate { .. } => EventType::MessageUpdate,
            Self::MessageDelete { .. } => EventType::MessageDelete,
            Self::MessageDeleteBulk { .. } => EventType::MessageDeleteBulk,
            Self::MessageReactionAdd { .. } => EventType::MessageReactionAdd,
            Self::MessageReactionRemove { .. } => EventType::MessageReactionRemove,
            Self::MessageReactionRemoveAll { .. } => EventType::MessageReactionRemoveAll,
            Self::PresenceUpdate { .. } => EventType::PresenceUpdate,
            Self::TypingStart { .. } => EventType::TypingStart,
            Self::UserUpdate { .. } => EventType::UserUpdate,
            Self::VoiceStateUpdate { .. } => EventType::VoiceStateUpdate,
            Self::VoiceServerUpdate { .. } => EventType::VoiceServerUpdate,
            Self::WebhooksUpdate { .. } => EventType::WebhooksUpdate,
            Self::Disconnected { .. } => EventType::Disconnected,
            Self::Reconnected => EventType::Reconnected,
            Self::InvalidSession { .. } => EventType::InvalidSession,
        }
    }

    /// Guild the event belongs to, when it belongs to one
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::GuildCreate { guild } | Self::GuildUpdate { guild, .. } => Some(guild.id),
            Self::GuildDelete { guild_id, .. }
            | Self::GuildBanAdd { guild_id, .. }
            | Self::GuildBanRemove { guild_id, .. }
            | Self::GuildEmojisUpdate { guild_id, .. }
            | Self::GuildIntegrationsUpdate { guild_id }
            | Self::GuildMemberAdd { guild_id, .. }
            | Self::GuildMemberRemove { guild_id, .. }
            | Self::GuildMemberUpdate { guild_id, .. }
            | Self::GuildMembersChunk { guild_id, .. }
            | Self::GuildRoleCreate { guild_id, .. }
            | Self::GuildRoleUpdate { guild_id, .. }
            | Self::GuildRoleDelete { guild_id, .. }
            | Self::PresenceUpdate { guild_id, .. }
            | Self::VoiceServerUpdate { guild_id, .. }
            | Self::WebhooksUpdate { guild_id, .. } => Some(*guild_id),
            Self::ChannelCreate { channel }
            | Self::ChannelUpdate { channel, .. }
            | Self::ChannelDelete { channel } => channel.guild_id,
            Self::MessageCreate { message } | Self::MessageUpdate { message, .. } => {
                message.guild_id
            }
            Self::ChannelPinsUpdate { guild_id, .. }
            | Self::MessageDelete { guild_id, .. }
            | Self::MessageDeleteBulk { guild_id, .. }
            | Self::MessageReactionAdd { guild_id, .. }
            | Self::MessageReactionRemove { guild_id, .. }
            | Self::MessageReactionRemoveAll { guild_id, .. }
            | Self::TypingStart { guild_id, .. }
            | Self::VoiceStateUpdate { guild_id, .. } => *guild_id,
            Self::Ready { .. }
            | Self::Resumed
            | Self::UserUpdate { .. }
            | Self::Disconnected { .. }
            | Self::Reconnected
            | Self::InvalidSession { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_guild() {
        let event = Event::GuildMemberRemove {
            guild_id: Snowflake::new(1),
            user: User::new(Snowflake::new(2), "ghost"),
            member: None,
        };
        assert_eq!(event.kind(), EventType::GuildMemberRemove);
        assert_eq!(event.guild_id(), Some(Snowflake::new(1)));

        let event = Event::Disconnected {
            code: 4000,
            reason: String::new(),
        };
        assert_eq!(event.kind(), EventType::Disconnected);
        assert_eq!(event.guild_id(), None);
    }
}
