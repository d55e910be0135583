//! Guild events

use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Document, DocumentExt, Emoji, FromDocument, Guild, User};

use crate::events::Event;

pub fn create(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild = Guild::from_document(data)?;
    let guild_id = guild.id;
    cache.insert_guild(guild.clone());

    tracing::debug!(guild_id = %guild_id, members = guild.members.len(), "Guild available");
    let guild = cache.cached_guild(guild_id).unwrap_or(guild);
    Ok(Event::GuildCreate {
        guild: Box::new(guild),
    })
}

pub fn update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let update = Guild::from_document(data)?;
    let guild_id = update.id;
    let old = cache.cached_guild(guild_id);

    let guild = match cache.update_guild(guild_id, |guild| {
        guild.apply_update(update.clone());
        guild.clone()
    }) {
        Some(guild) => guild,
        None => {
            cache.insert_guild(update.clone());
            update
        }
    };
    Ok(Event::GuildUpdate {
        old: old.map(Box::new),
        guild: Box::new(guild),
    })
}

/// An outage only marks the guild unavailable; leaving it drops it
pub fn delete(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("id")?;
    let unavailable = data.opt_field("unavailable")?.unwrap_or(false);

    let guild = if unavailable {
        cache.update_guild(guild_id, |guild| {
            guild.unavailable = true;
            guild.clone()
        })
    } else {
        cache.remove_guild(guild_id)
    };
    tracing::debug!(guild_id = %guild_id, unavailable, "Guild deleted");
    Ok(Event::GuildDelete {
        guild_id,
        unavailable,
        guild: guild.map(Box::new),
    })
}

pub fn ban_add(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let user: User = data.field("user")?;
    cache.remove_member(guild_id, user.id);
    Ok(Event::GuildBanAdd { guild_id, user })
}

pub fn ban_remove(data: &Document) -> ClientResult<Event> {
    Ok(Event::GuildBanRemove {
        guild_id: data.snowflake("guild_id")?,
        user: data.field("user")?,
    })
}

pub fn emojis_update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let emojis: Vec<Emoji> = data.field("emojis")?;
    cache.update_guild(guild_id, |guild| guild.emojis.clone_from(&emojis));
    Ok(Event::GuildEmojisUpdate { guild_id, emojis })
}

pub fn integrations_update(data: &Document) -> ClientResult<Event> {
    Ok(Event::GuildIntegrationsUpdate {
        guild_id: data.snowflake("guild_id")?,
    })
}
