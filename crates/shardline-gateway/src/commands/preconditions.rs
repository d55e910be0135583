//! Built-in preconditions

use shardline_core::{Permissions, Snowflake};
use std::collections::HashSet;
use std::sync::Arc;

use super::command::Precondition;

/// Only in guild channels
pub fn guild_only() -> Precondition {
    Arc::new(|ctx| ctx.message.guild_id.is_some())
}

/// Only for the given user ids
pub fn owner_only<I>(owners: I) -> Precondition
where
    I: IntoIterator<Item = Snowflake>,
{
    let owners: HashSet<Snowflake> = owners.into_iter().collect();
    Arc::new(move |ctx| owners.contains(&ctx.message.author.id))
}

/// Only for authors holding every permission in `required`.
///
/// Resolved from the cached guild; fails outside guilds and for uncached guilds.
pub fn require_permissions(required: Permissions) -> Precondition {
    Arc::new(move |ctx| {
        let Some(guild_id) = ctx.message.guild_id else {
            return false;
        };
        let author = ctx.message.author.id;
        ctx.ctx
            .cache
            .with_guild(guild_id, |guild| guild.member_permissions(author).has(required))
            .unwrap_or(false)
    })
}
