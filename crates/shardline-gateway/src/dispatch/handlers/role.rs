//! Role events

use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Document, DocumentExt, Role};

use crate::events::Event;

pub fn create(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let role: Role = data.field("role")?;
    cache.upsert_role(guild_id, role.clone());
    Ok(Event::GuildRoleCreate { guild_id, role })
}

pub fn update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let role: Role = data.field("role")?;
    let old = cache.upsert_role(guild_id, role.clone());
    Ok(Event::GuildRoleUpdate { guild_id, old, role })
}

/// Drops the role from the guild and from every member holding it
pub fn delete(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let role_id = data.snowflake("role_id")?;
    let role = cache.remove_role(guild_id, role_id);
    Ok(Event::GuildRoleDelete {
        guild_id,
        role_id,
        role,
    })
}
