//! Member events

use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Document, DocumentExt, FromDocument, Member, User};

use crate::events::Event;

pub fn add(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let mut member = Member::from_document(data)?;
    member.guild_id = Some(guild_id);

    if !cache.add_member(guild_id, member.clone()) {
        tracing::debug!(guild_id = %guild_id, user_id = %member.id(), "Member count unchanged");
    }
    Ok(Event::GuildMemberAdd { guild_id, member })
}

pub fn remove(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let user: User = data.field("user")?;

    let removal = cache.remove_member(guild_id, user.id);
    cache.update_guild(guild_id, |guild| {
        guild.member_count = guild.member_count.map(|count| count.saturating_sub(1));
    });
    tracing::debug!(
        guild_id = %guild_id,
        user_id = %user.id,
        cached = removal.member.is_some(),
        pruned = removal.pruned,
        "Member removed"
    );
    Ok(Event::GuildMemberRemove {
        guild_id,
        user,
        member: removal.member,
    })
}

pub fn update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let update = Member::from_document(data)?;
    let (old, member) = cache.apply_member_update(guild_id, update);
    Ok(Event::GuildMemberUpdate {
        guild_id,
        old,
        member,
    })
}

pub fn chunk(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let guild_id = data.snowflake("guild_id")?;
    let members: Vec<Member> = data.field("members")?;
    let chunk_index: u32 = data.opt_field("chunk_index")?.unwrap_or(0);
    let chunk_count: u32 = data.opt_field("chunk_count")?.unwrap_or(1);

    for member in &members {
        cache.insert_member(guild_id, member.clone());
    }
    tracing::debug!(guild_id = %guild_id, chunk_index, chunk_count, members = members.len(), "Member chunk");
    Ok(Event::GuildMembersChunk {
        guild_id,
        members,
        chunk_index,
        chunk_count,
    })
}
