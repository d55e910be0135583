//! Reaction events
//!
//! Reactions are counted on the cached message. An added reaction on an
//! uncached message fetches it off the lane; the fetched copy already includes
//! the reaction.

use futures::FutureExt;
use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Document, DocumentExt, Emoji, Message, Snowflake};
use std::sync::Arc;

use super::Handled;
use crate::events::Event;

struct ReactionTarget {
    user_id: Snowflake,
    channel_id: Snowflake,
    message_id: Snowflake,
    guild_id: Option<Snowflake>,
    emoji: Emoji,
}

impl ReactionTarget {
    fn parse(data: &Document) -> ClientResult<Self> {
        Ok(Self {
            user_id: data.snowflake("user_id")?,
            channel_id: data.snowflake("channel_id")?,
            message_id: data.snowflake("message_id")?,
            guild_id: data.opt_field("guild_id")?,
            emoji: data.field("emoji")?,
        })
    }

    fn into_event(self, message: Option<Message>) -> Event {
        Event::MessageReactionAdd {
            user_id: self.user_id,
            channel_id: self.channel_id,
            message_id: self.message_id,
            guild_id: self.guild_id,
            emoji: self.emoji,
            message,
        }
    }
}

fn is_me(cache: &Cache, user_id: Snowflake) -> bool {
    cache.cached_current_user().is_some_and(|user| user.id == user_id)
}

/// Count the reaction on the cached message, or fetch the message off the lane
pub fn add(cache: &Arc<Cache>, data: &Document) -> ClientResult<Handled> {
    let target = ReactionTarget::parse(data)?;
    let me = is_me(cache, target.user_id);

    let counted = cache.update_message(target.message_id, |message| {
        message.add_reaction(target.emoji.clone(), me);
        message.clone()
    });
    if counted.is_some() {
        return Ok(Handled::Event(target.into_event(counted)));
    }

    let cache = Arc::clone(cache);
    Ok(Handled::Deferred(
        async move {
            let message = match cache.message(target.channel_id, target.message_id, true).await {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!(
                        message_id = %target.message_id,
                        error = %e,
                        "Failed to fetch reacted message"
                    );
                    None
                }
            };
            Ok(target.into_event(message))
        }
        .boxed(),
    ))
}

pub fn remove(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let target = ReactionTarget::parse(data)?;
    let me = is_me(cache, target.user_id);

    let message = cache.update_message(target.message_id, |message| {
        message.remove_reaction(&target.emoji, me);
        message.clone()
    });
    Ok(Event::MessageReactionRemove {
        user_id: target.user_id,
        channel_id: target.channel_id,
        message_id: target.message_id,
        guild_id: target.guild_id,
        emoji: target.emoji,
        message,
    })
}

pub fn remove_all(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let message_id = data.snowflake("message_id")?;
    let message = cache.update_message(message_id, |message| {
        message.clear_reactions();
        message.clone()
    });
    Ok(Event::MessageReactionRemoveAll {
        channel_id: data.snowflake("channel_id")?,
        message_id,
        guild_id: data.opt_field("guild_id")?,
        message,
    })
}
