//! Gateway intents

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Event groups a shard subscribes to on identify
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GatewayIntents: u64 {
        const GUILDS                   = 1 << 0;
        /// Privileged
        const GUILD_MEMBERS            = 1 << 1;
        const GUILD_MODERATION         = 1 << 2;
        const GUILD_EMOJIS             = 1 << 3;
        const GUILD_INTEGRATIONS       = 1 << 4;
        const GUILD_WEBHOOKS           = 1 << 5;
        const GUILD_INVITES            = 1 << 6;
        const GUILD_VOICE_STATES       = 1 << 7;
        /// Privileged
        const GUILD_PRESENCES          = 1 << 8;
        const GUILD_MESSAGES           = 1 << 9;
        const GUILD_MESSAGE_REACTIONS  = 1 << 10;
        const GUILD_MESSAGE_TYPING     = 1 << 11;
        const DIRECT_MESSAGES          = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING    = 1 << 14;
        /// Privileged
        const MESSAGE_CONTENT          = 1 << 15;
    }
}

impl GatewayIntents {
    /// Intents that need approval in the application settings
    pub const PRIVILEGED: Self = Self::GUILD_MEMBERS
        .union(Self::GUILD_PRESENCES)
        .union(Self::MESSAGE_CONTENT);

    /// Every intent that needs no approval
    #[must_use]
    pub fn non_privileged() -> Self {
        Self::all().difference(Self::PRIVILEGED)
    }

    /// Intents from raw configuration bits, unknown bits dropped
    #[must_use]
    pub fn from_config(bits: Option<u64>) -> Self {
        bits.map_or_else(Self::non_privileged, Self::from_bits_truncate)
    }

    #[inline]
    pub fn is_privileged(&self) -> bool {
        self.intersects(Self::PRIVILEGED)
    }
}

impl Default for GatewayIntents {
    fn default() -> Self {
        Self::non_privileged()
    }
}

impl Serialize for GatewayIntents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for GatewayIntents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_privileged_default() {
        let intents = GatewayIntents::default();
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(!intents.is_privileged());
        assert_eq!(intents.bits(), 32_509);
    }

    #[test]
    fn test_from_config() {
        assert_eq!(GatewayIntents::from_config(Some(513)).bits(), 513);
        assert_eq!(GatewayIntents::from_config(Some(1 << 40)), GatewayIntents::empty());
        assert_eq!(GatewayIntents::from_config(None), GatewayIntents::non_privileged());
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&GatewayIntents::GUILDS).unwrap();
        assert_eq!(json, "1");
    }
}
