//! Test fixtures
//!
//! Gateway frames shaped like the ones the remote service sends.

use serde_json::{json, Value};
use shardline_gateway::protocol::GatewayMessage;

pub const BOT_ID: u64 = 1;

pub fn user(id: u64, username: &str) -> Value {
    json!({"id": id.to_string(), "username": username})
}

pub fn member(user_id: u64, username: &str) -> Value {
    json!({
        "user": user(user_id, username),
        "roles": [],
        "joined_at": "2024-01-01T00:00:00Z"
    })
}

pub fn ready(session_id: &str, seq: u64, guild_ids: &[u64]) -> GatewayMessage {
    let guilds: Vec<Value> = guild_ids
        .iter()
        .map(|id| json!({"id": id.to_string(), "unavailable": true}))
        .collect();
    GatewayMessage::dispatch(
        "READY",
        seq,
        json!({
            "v": 10,
            "user": {"id": BOT_ID.to_string(), "username": "shardline", "bot": true},
            "session_id": session_id,
            "guilds": guilds
        }),
    )
}

pub fn guild_create(seq: u64, guild_id: u64, name: &str, members: Vec<Value>) -> GatewayMessage {
    GatewayMessage::dispatch(
        "GUILD_CREATE",
        seq,
        json!({
            "id": guild_id.to_string(),
            "name": name,
            "owner_id": "2",
            "member_count": members.len(),
            "roles": [{"id": guild_id.to_string(), "name": "@everyone", "permissions": "0"}],
            "channels": [{"id": (guild_id * 10).to_string(), "type": 0, "name": "general"}],
            "members": members
        }),
    )
}

pub fn member_remove(seq: u64, guild_id: u64, user_id: u64, username: &str) -> GatewayMessage {
    GatewayMessage::dispatch(
        "GUILD_MEMBER_REMOVE",
        seq,
        json!({
            "guild_id": guild_id.to_string(),
            "user": user(user_id, username)
        }),
    )
}

pub fn message_create(seq: u64, message_id: u64, channel_id: u64, author: Value, content: &str) -> GatewayMessage {
    GatewayMessage::dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": message_id.to_string(),
            "channel_id": channel_id.to_string(),
            "author": author,
            "content": content,
            "timestamp": "2024-01-01T00:00:00Z"
        }),
    )
}

pub fn reaction_add(seq: u64, message_id: u64, channel_id: u64, user_id: u64, emoji: &str) -> GatewayMessage {
    GatewayMessage::dispatch(
        "MESSAGE_REACTION_ADD",
        seq,
        json!({
            "user_id": user_id.to_string(),
            "channel_id": channel_id.to_string(),
            "message_id": message_id.to_string(),
            "emoji": {"id": null, "name": emoji}
        }),
    )
}
