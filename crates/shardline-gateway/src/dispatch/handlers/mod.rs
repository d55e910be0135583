//! Dispatch handlers
//!
//! One handler per dispatch kind. Each parses the payload, applies its cache
//! effect, and returns the typed event.

mod channel;
mod connection;
mod guild;
mod member;
mod message;
mod misc;
mod reaction;
mod role;

use futures::future::BoxFuture;
use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::Document;
use std::sync::Arc;

use crate::events::{Event, EventType};
use crate::shard::Shard;

/// What a handler produced once its cache effect is applied
pub(crate) enum Handled {
    /// Ready for delivery
    Event(Event),
    /// Needs a REST call before the event exists; runs off the lane
    Deferred(BoxFuture<'static, ClientResult<Event>>),
}

/// Run the handler for `kind`.
///
/// Never waits on the network. `Ok(None)` means the frame produces no
/// listener event of its own.
pub(crate) fn handle(
    kind: EventType,
    shard: &Arc<Shard>,
    cache: &Arc<Cache>,
    data: &Document,
) -> ClientResult<Option<Handled>> {
    use EventType as T;

    let event = match kind {
        T::Ready => return connection::ready(shard, cache, data).map(Some),
        // The shard raises Resumed itself when it sees the frame
        T::Resumed => return Ok(None),

        T::ChannelCreate => channel::create(cache, data)?,
        T::ChannelUpdate => channel::update(cache, data)?,
        T::ChannelDelete => channel::delete(cache, data)?,
        T::ChannelPinsUpdate => channel::pins_update(cache, data)?,

        T::GuildCreate => guild::create(cache, data)?,
        T::GuildUpdate => guild::update(cache, data)?,
        T::GuildDelete => guild::delete(cache, data)?,
        T::GuildBanAdd => guild::ban_add(cache, data)?,
        T::GuildBanRemove => guild::ban_remove(data)?,
        T::GuildEmojisUpdate => guild::emojis_update(cache, data)?,
        T::GuildIntegrationsUpdate => guild::integrations_update(data)?,

        T::GuildMemberAdd => member::add(cache, data)?,
        T::GuildMemberRemove => member::remove(cache, data)?,
        T::GuildMemberUpdate => member::update(cache, data)?,
        T::GuildMembersChunk => member::chunk(cache, data)?,

        T::GuildRoleCreate => role::create(cache, data)?,
        T::GuildRoleUpdate => role::update(cache, data)?,
        T::GuildRoleDelete => role::delete(cache, data)?,

        T::MessageCreate => message::create(cache, data)?,
        T::MessageUpdate => message::update(cache, data)?,
        T::MessageDelete => message::delete(cache, data)?,
        T::MessageDeleteBulk => message::delete_bulk(cache, data)?,

        T::MessageReactionAdd => return reaction::add(cache, data).map(Some),
        T::MessageReactionRemove => reaction::remove(cache, data)?,
        T::MessageReactionRemoveAll => reaction::remove_all(cache, data)?,

        T::PresenceUpdate => misc::presence_update(cache, data)?,
        T::TypingStart => misc::typing_start(data)?,
        T::UserUpdate => misc::user_update(cache, data)?,
        T::VoiceStateUpdate => misc::voice_state_update(data)?,
        T::VoiceServerUpdate => misc::voice_server_update(data)?,
        T::WebhooksUpdate => misc::webhooks_update(data)?,

        T::Disconnected | T::Reconnected | T::InvalidSession => return Ok(None),
    };
    Ok(Some(Handled::Event(event)))
}
