//! Client configuration
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::time::Duration;

/// Minimum spacing between two shard starts imposed by the session-start limit
pub const MIN_SHARD_START_DELAY: Duration = Duration::from_secs(5);

/// Kind of credential carried in the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    #[default]
    Bot,
    Bearer,
}

impl TokenType {
    /// Value for the `Authorization` header
    pub fn authorization(self, token: &str) -> String {
        match self {
            Self::Bot => format!("Bot {token}"),
            Self::Bearer => format!("Bearer {token}"),
        }
    }
}

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    pub token: String,
    pub token_type: TokenType,
    pub shard_count: u64,
    pub message_cache_size: usize,
    pub max_ratelimit_wait: Duration,
    pub command_prefixes: Vec<String>,
    pub api_base_url: String,
    pub gateway_version: u8,
    pub task_queue_capacity: usize,
    pub shard_start_delay: Duration,
    pub reconnect_delay: Duration,
    pub large_threshold: u16,
    /// Raw gateway intent bits; `None` selects the non-privileged set
    pub intents: Option<u64>,
}

// Keep the token out of logs
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("shard_count", &self.shard_count)
            .field("message_cache_size", &self.message_cache_size)
            .field("max_ratelimit_wait", &self.max_ratelimit_wait)
            .field("command_prefixes", &self.command_prefixes)
            .field("api_base_url", &self.api_base_url)
            .field("gateway_version", &self.gateway_version)
            .finish()
    }
}

// Default value functions
fn default_shard_count() -> u64 {
    1
}

fn default_message_cache_size() -> usize {
    5000
}

fn default_max_ratelimit_wait() -> Duration {
    Duration::from_secs(60)
}

fn default_command_prefixes() -> Vec<String> {
    vec!["!".to_string()]
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_version() -> u8 {
    10
}

fn default_task_queue_capacity() -> usize {
    64
}

fn default_reconnect_delay() -> Duration {
    Duration::from_millis(1100)
}

fn default_large_threshold() -> u16 {
    250
}

impl ClientConfig {
    /// Configuration with defaults for everything but the token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: TokenType::default(),
            shard_count: default_shard_count(),
            message_cache_size: default_message_cache_size(),
            max_ratelimit_wait: default_max_ratelimit_wait(),
            command_prefixes: default_command_prefixes(),
            api_base_url: default_api_base_url(),
            gateway_version: default_gateway_version(),
            task_queue_capacity: default_task_queue_capacity(),
            shard_start_delay: MIN_SHARD_START_DELAY,
            reconnect_delay: default_reconnect_delay(),
            large_threshold: default_large_threshold(),
            intents: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DISCORD_TOKEN` is missing or a variable fails to parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN").ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;
        let mut config = Self::new(token.trim());

        if let Some(raw) = lookup("DISCORD_TOKEN_TYPE") {
            config.token_type = match raw.to_lowercase().as_str() {
                "bot" => TokenType::Bot,
                "bearer" => TokenType::Bearer,
                _ => return Err(ConfigError::InvalidValue("DISCORD_TOKEN_TYPE", raw)),
            };
        }
        if let Some(count) = parse_var(&lookup, "SHARD_COUNT")? {
            config.shard_count = count;
        }
        if let Some(size) = parse_var(&lookup, "MESSAGE_CACHE_SIZE")? {
            config.message_cache_size = size;
        }
        if let Some(ms) = parse_var(&lookup, "MAX_RATELIMIT_WAIT_MS")? {
            config.max_ratelimit_wait = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("COMMAND_PREFIXES") {
            config.command_prefixes = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = lookup("API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(version) = parse_var(&lookup, "GATEWAY_VERSION")? {
            config.gateway_version = version;
        }
        if let Some(capacity) = parse_var(&lookup, "TASK_QUEUE_CAPACITY")? {
            config.task_queue_capacity = capacity;
        }
        if let Some(ms) = parse_var(&lookup, "SHARD_START_DELAY_MS")? {
            config.shard_start_delay = Duration::from_millis(ms).max(MIN_SHARD_START_DELAY);
        }
        if let Some(ms) = parse_var(&lookup, "RECONNECT_DELAY_MS")? {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(threshold) = parse_var(&lookup, "LARGE_THRESHOLD")? {
            config.large_threshold = threshold;
        }
        config.intents = parse_var(&lookup, "GATEWAY_INTENTS")?;

        Ok(config)
    }

    /// Reject configurations that can never connect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() || self.token.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(
                "DISCORD_TOKEN",
                "token is empty or contains whitespace".to_string(),
            ));
        }
        if self.token_type == TokenType::Bot {
            let segments: Vec<&str> = self.token.split('.').collect();
            if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
                return Err(ConfigError::InvalidValue(
                    "DISCORD_TOKEN",
                    "bot token must have three dot-separated segments".to_string(),
                ));
            }
        }
        if self.shard_count == 0 {
            return Err(ConfigError::InvalidValue(
                "SHARD_COUNT",
                "at least one shard is required".to_string(),
            ));
        }
        if self.shard_start_delay < MIN_SHARD_START_DELAY {
            return Err(ConfigError::InvalidValue(
                "SHARD_START_DELAY_MS",
                format!(
                    "shards must start at least {}ms apart",
                    MIN_SHARD_START_DELAY.as_millis()
                ),
            ));
        }
        if self.task_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "TASK_QUEUE_CAPACITY",
                "capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Gateway query string appended to the endpoint URL
    pub fn gateway_query(&self) -> String {
        format!("?v={}&encoding=json", self.gateway_version)
    }

    pub fn with_shard_count(mut self, shard_count: u64) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_message_cache_size(mut self, size: usize) -> Self {
        self.message_cache_size = size;
        self
    }

    pub fn with_max_ratelimit_wait(mut self, wait: Duration) -> Self {
        self.max_ratelimit_wait = wait;
        self
    }

    pub fn with_command_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Override the start stagger, floored at [`MIN_SHARD_START_DELAY`]
    pub fn with_shard_start_delay(mut self, delay: Duration) -> Self {
        self.shard_start_delay = delay.max(MIN_SHARD_START_DELAY);
        self
    }

    pub fn with_intents(mut self, bits: u64) -> Self {
        self.intents = Some(bits);
        self
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Session start limit exhausted, resets in {reset_after:?}")]
    SessionLimitExhausted { reset_after: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOKEN: &str = "MTA1.Gx9k2a.abcdefghijklmnop";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[("DISCORD_TOKEN", TOKEN)])).unwrap();
        assert_eq!(config.shard_count, 1);
        assert_eq!(config.message_cache_size, 5000);
        assert_eq!(config.max_ratelimit_wait, Duration::from_secs(60));
        assert_eq!(config.command_prefixes, vec!["!".to_string()]);
        assert_eq!(config.shard_start_delay, MIN_SHARD_START_DELAY);
        assert_eq!(config.gateway_query(), "?v=10&encoding=json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_token() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("DISCORD_TOKEN")));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DISCORD_TOKEN", TOKEN),
            ("SHARD_COUNT", "4"),
            ("MESSAGE_CACHE_SIZE", "100"),
            ("MAX_RATELIMIT_WAIT_MS", "1500"),
            ("COMMAND_PREFIXES", "!, ?,"),
            ("API_BASE_URL", "http://localhost:8080/api/"),
            ("SHARD_START_DELAY_MS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.shard_count, 4);
        assert_eq!(config.message_cache_size, 100);
        assert_eq!(config.max_ratelimit_wait, Duration::from_millis(1500));
        assert_eq!(config.command_prefixes, vec!["!".to_string(), "?".to_string()]);
        assert_eq!(config.api_base_url, "http://localhost:8080/api");
        // Floored at the service minimum
        assert_eq!(config.shard_start_delay, MIN_SHARD_START_DELAY);
    }

    #[test]
    fn test_invalid_number() {
        let err = ClientConfig::from_lookup(lookup(&[("DISCORD_TOKEN", TOKEN), ("SHARD_COUNT", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("SHARD_COUNT", _)));
    }

    #[test]
    fn test_validate_rejects_bad_tokens() {
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("has space.a.b").validate().is_err());
        assert!(ClientConfig::new("onlyonesegment").validate().is_err());
        assert!(ClientConfig::new("a..b").validate().is_err());

        let mut bearer = ClientConfig::new("opaque-oauth-token");
        bearer.token_type = TokenType::Bearer;
        assert!(bearer.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_shards() {
        let err = ClientConfig::new(TOKEN).with_shard_count(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("SHARD_COUNT", _)));
    }

    #[test]
    fn test_start_delay_has_a_floor() {
        let config = ClientConfig::new(TOKEN).with_shard_start_delay(Duration::from_millis(10));
        assert_eq!(config.shard_start_delay, MIN_SHARD_START_DELAY);
        assert!(config.validate().is_ok());

        let config = ClientConfig::new(TOKEN).with_shard_start_delay(Duration::from_secs(7));
        assert_eq!(config.shard_start_delay, Duration::from_secs(7));

        let mut config = ClientConfig::new(TOKEN);
        config.shard_start_delay = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("SHARD_START_DELAY_MS", _)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", ClientConfig::new(TOKEN));
        assert!(!rendered.contains(TOKEN));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(TokenType::Bot.authorization("t"), "Bot t");
        assert_eq!(TokenType::Bearer.authorization("t"), "Bearer t");
    }
}
