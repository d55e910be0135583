//! Frame payload definitions
//!
//! Payloads the client sends (identify, resume, heartbeat, presence) and the
//! connection-level payloads it receives (hello, ready).

use serde::{Deserialize, Serialize};
use shardline_core::{Activity, Snowflake, User};
use std::fmt;

use super::intents::GatewayIntents;

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

/// Payload for op 2 (Identify)
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    #[serde(default)]
    pub compress: bool,
    /// Member count above which a guild is sent without offline members
    pub large_threshold: u16,
    /// `[shard_id, shard_count]`
    pub shard: [u64; 2],
    pub intents: GatewayIntents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdatePayload>,
}

impl fmt::Debug for IdentifyPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifyPayload")
            .field("token", &"[REDACTED]")
            .field("properties", &self.properties)
            .field("large_threshold", &self.large_threshold)
            .field("shard", &self.shard)
            .field("intents", &self.intents)
            .finish()
    }
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    /// Properties describing this library on the running platform
    #[must_use]
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "shardline".to_string(),
            device: "shardline".to_string(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::current()
    }
}

/// Payload for op 6 (Resume)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last sequence number received, `null` if none
    pub seq: Option<u64>,
}

impl fmt::Debug for ResumePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumePayload")
            .field("token", &"[REDACTED]")
            .field("session_id", &self.session_id)
            .field("seq", &self.seq)
            .finish()
    }
}

/// Payload for op 3 (Presence Update)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    /// Unix time in milliseconds the client went idle
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: String,
    pub afk: bool,
}

impl PresenceUpdatePayload {
    /// Valid status values
    pub const VALID_STATUSES: &'static [&'static str] = &["online", "idle", "dnd", "invisible", "offline"];

    #[must_use]
    pub fn new(status: impl Into<String>, activity: Option<Activity>) -> Self {
        Self {
            since: None,
            activities: activity.into_iter().collect(),
            status: status.into(),
            afk: false,
        }
    }

    /// Check if the status is valid
    #[must_use]
    pub fn is_valid_status(&self) -> bool {
        Self::VALID_STATUSES.contains(&self.status.as_str())
    }
}

/// Guild listed in READY before its GUILD_CREATE arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// Body of the READY dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    #[serde(rename = "v", default)]
    pub version: u8,
    pub user: User,
    pub session_id: String,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    #[serde(default)]
    pub shard: Option<[u64; 2]>,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identify_serialization() {
        let payload = IdentifyPayload {
            token: "secret-token".to_string(),
            properties: IdentifyProperties::current(),
            compress: false,
            large_threshold: 250,
            shard: [1, 4],
            intents: GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES,
            presence: None,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["shard"], json!([1, 4]));
        assert_eq!(value["intents"], json!(513));
        assert_eq!(value["properties"]["browser"], "shardline");
        assert!(value.get("presence").is_none());

        assert!(!format!("{payload:?}").contains("secret-token"));
    }

    #[test]
    fn test_resume_null_sequence() {
        let payload = ResumePayload {
            token: "t".to_string(),
            session_id: "abc".to_string(),
            seq: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value["seq"].is_null());
        assert_eq!(value["session_id"], "abc");
    }

    #[test]
    fn test_presence_validation() {
        let valid = PresenceUpdatePayload::new("idle", None);
        assert!(valid.is_valid_status());
        assert!(valid.activities.is_empty());

        assert!(!PresenceUpdatePayload::new("busy", None).is_valid_status());
    }

    #[test]
    fn test_ready_payload() {
        let ready: ReadyPayload = serde_json::from_value(json!({
            "v": 10,
            "user": {"id": "99", "username": "bot", "bot": true},
            "session_id": "sess",
            "guilds": [{"id": "1", "unavailable": true}],
            "shard": [0, 1]
        }))
        .unwrap();
        assert_eq!(ready.session_id, "sess");
        assert_eq!(ready.guilds[0].id, Snowflake::new(1));
        assert!(ready.user.bot);
    }
}
