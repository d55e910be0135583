//! Message events

use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Document, DocumentExt, FromDocument, Message, Snowflake};

use crate::events::Event;

pub fn create(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let message = Message::from_document(data)?;
    cache.insert_message(message.clone());
    Ok(Event::MessageCreate { message })
}

/// Merge into the cached copy. On a miss `old` is `None` and the event carries
/// the partial payload as given; nothing is cached.
pub fn update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let message_id = data.snowflake("id")?;
    let old = cache.cached_message(message_id);

    let merged = cache
        .update_message(message_id, |cached| {
            cached.merge_document(data).map(|()| cached.clone())
        })
        .transpose()?;
    let message = match merged {
        Some(message) => message,
        None => Message::from_document(data)?,
    };

    Ok(Event::MessageUpdate {
        old,
        message,
        is_edited: data.has_field("edited_timestamp"),
    })
}

pub fn delete(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let message_id = data.snowflake("id")?;
    Ok(Event::MessageDelete {
        message_id,
        channel_id: data.snowflake("channel_id")?,
        guild_id: data.opt_field("guild_id")?,
        message: cache.remove_message(message_id),
    })
}

pub fn delete_bulk(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let message_ids: Vec<Snowflake> = data.field("ids")?;
    let messages = message_ids
        .iter()
        .filter_map(|id| cache.remove_message(*id))
        .collect();
    Ok(Event::MessageDeleteBulk {
        message_ids,
        channel_id: data.snowflake("channel_id")?,
        guild_id: data.opt_field("guild_id")?,
        messages,
    })
}
