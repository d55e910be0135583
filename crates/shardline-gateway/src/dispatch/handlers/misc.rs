//! Presence, typing, user, voice, and webhook events

use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Document, DocumentExt, FromDocument, Presence, User};

use crate::events::Event;

pub fn presence_update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let user: Document = data.field("user")?;
    let user_id = user.snowflake("id")?;
    let presence = Presence::from_document(data)?;

    if !cache.set_presence(guild_id, user_id, presence.clone()) {
        tracing::trace!(guild_id = %guild_id, user_id = %user_id, "Presence for uncached member");
    }
    Ok(Event::PresenceUpdate {
        guild_id,
        user_id,
        presence,
    })
}

pub fn typing_start(data: &Document) -> ClientResult<Event> {
    Ok(Event::TypingStart {
        channel_id: data.snowflake("channel_id")?,
        guild_id: data.opt_field("guild_id")?,
        user_id: data.snowflake("user_id")?,
        timestamp: data.opt_field("timestamp")?.unwrap_or(0),
    })
}

pub fn user_update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let user = User::from_document(data)?;
    let old = cache.cached_current_user();
    cache.set_current_user(user.clone());
    Ok(Event::UserUpdate { old, user })
}

pub fn voice_state_update(data: &Document) -> ClientResult<Event> {
    Ok(Event::VoiceStateUpdate {
        guild_id: data.opt_field("guild_id")?,
        channel_id: data.opt_field("channel_id")?,
        user_id: data.snowflake("user_id")?,
        session_id: data.opt_field("session_id")?.unwrap_or_default(),
        data: data.clone(),
    })
}

pub fn voice_server_update(data: &Document) -> ClientResult<Event> {
    Ok(Event::VoiceServerUpdate {
        guild_id: data.snowflake("guild_id")?,
        token: data.field("token")?,
        endpoint: data.opt_field("endpoint")?,
    })
}

pub fn webhooks_update(data: &Document) -> ClientResult<Event> {
    Ok(Event::WebhooksUpdate {
        guild_id: data.snowflake("guild_id")?,
        channel_id: data.snowflake("channel_id")?,
    })
}
