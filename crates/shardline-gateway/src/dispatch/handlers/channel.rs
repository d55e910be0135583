//! Channel events

use shardline_cache::Cache;
use shardline_common::ClientResult;
use shardline_core::{Channel, Document, DocumentExt, FromDocument};

use crate::events::Event;

pub fn create(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let channel = Channel::from_document(data)?;
    cache.insert_channel(channel.clone());
    Ok(Event::ChannelCreate { channel })
}

pub fn update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let channel = Channel::from_document(data)?;
    let old = cache.cached_channel(channel.id);
    cache.insert_channel(channel.clone());
    Ok(Event::ChannelUpdate { old, channel })
}

pub fn delete(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let channel = Channel::from_document(data)?;
    cache.remove_channel(channel.id);
    Ok(Event::ChannelDelete { channel })
}

pub fn pins_update(cache: &Cache, data: &Document) -> ClientResult<Event> {
    let channel_id = data.snowflake("channel_id")?;
    let guild_id = data.opt_field("guild_id")?;
    let last_pin_timestamp: Option<String> = data.opt_field("last_pin_timestamp")?;

    if let Some(mut channel) = cache.cached_channel(channel_id) {
        channel.last_pin_timestamp.clone_from(&last_pin_timestamp);
        cache.insert_channel(channel);
    }
    Ok(Event::ChannelPinsUpdate {
        channel_id,
        guild_id,
        last_pin_timestamp,
    })
}
