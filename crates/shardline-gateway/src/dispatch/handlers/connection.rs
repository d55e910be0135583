//! READY and RESUMED

use futures::FutureExt;
use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Document, DocumentExt, Snowflake, User};
use std::sync::Arc;

use super::Handled;
use crate::events::Event;
use crate::protocol::UnavailableGuild;
use crate::shard::{Shard, ShardInfo};

/// Record the logged-in user and make sure the shard is beating.
///
/// A READY without a user object fetches it off the lane.
pub fn ready(shard: &Arc<Shard>, cache: &Arc<Cache>, data: &Document) -> ClientResult<Handled> {
    let session_id: String = data.field("session_id")?;
    let guilds: Vec<UnavailableGuild> = data.opt_field("guilds")?.unwrap_or_default();
    let guilds: Vec<Snowflake> = guilds.into_iter().map(|g| g.id).collect();
    let user = data.opt_field::<User>("user")?;
    shard.ensure_heartbeat();

    let info = shard.info();
    match user {
        Some(user) => {
            cache.set_current_user(user.clone());
            Ok(Handled::Event(logged_in(info, session_id, user, guilds)))
        }
        None => {
            let cache = Arc::clone(cache);
            Ok(Handled::Deferred(
                async move {
                    let user = cache.current_user(true).await?;
                    Ok(logged_in(info, session_id, user, guilds))
                }
                .boxed(),
            ))
        }
    }
}

fn logged_in(shard: ShardInfo, session_id: String, user: User, guilds: Vec<Snowflake>) -> Event {
    tracing::info!(
        shard = %shard,
        user = %user.tag(),
        guilds = guilds.len(),
        "Logged in"
    );
    Event::Ready {
        session_id,
        user,
        guilds,
    }
}
