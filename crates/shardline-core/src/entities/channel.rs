//! Channel entity - represents a guild channel, DM, or category

use serde::{Deserialize, Serialize};

use super::keyed::Keyed;
use super::user::User;
use crate::value_objects::Snowflake;

/// Channel type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelType {
    #[default]
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildAnnouncement,
    /// A type this client does not model yet
    Unknown(u8),
}

impl ChannelType {
    /// Direct message or group DM
    #[inline]
    pub fn is_private(self) -> bool {
        matches!(self, Self::Dm | Self::GroupDm)
    }
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildAnnouncement,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(ct: ChannelType) -> Self {
        match ct {
            ChannelType::GuildText => 0,
            ChannelType::Dm => 1,
            ChannelType::GuildVoice => 2,
            ChannelType::GroupDm => 3,
            ChannelType::GuildCategory => 4,
            ChannelType::GuildAnnouncement => 5,
            ChannelType::Unknown(other) => other,
        }
    }
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type", default)]
    pub kind: ChannelType,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
    #[serde(default)]
    pub last_pin_timestamp: Option<String>,
    #[serde(default)]
    pub recipients: Vec<User>,
}

impl Channel {
    /// Create a guild text channel
    pub fn new(id: Snowflake, guild_id: Option<Snowflake>, name: impl Into<String>) -> Self {
        Self {
            id,
            guild_id,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Whether this channel lives outside any guild
    #[inline]
    pub fn is_private(&self) -> bool {
        self.guild_id.is_none() && self.kind.is_private()
    }

    /// Mention markup for this channel
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

impl Keyed for Channel {
    fn key(&self) -> Snowflake {
        self.id
    }
}
