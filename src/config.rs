use dotenvy::dotenv;
use humantime::parse_duration;
use serde::de::{value::Error as ValueError, IntoDeserializer};
use serde::Deserialize;
use std::env;
use std::num::NonZeroU64;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub guild_id: u64,
    /// The single identity allowed to manage the red list
    pub owner_id: u64,

    // Role ping notifier
    pub ping_channel_ids: Vec<u64>,
    pub ping_role_id: Option<u64>,
    pub ignored_bot_id: Option<u64>,
    pub ping_message: String,

    // Reminder sweeper
    pub reminder_channel_id: Option<u64>,
    pub sweep_interval_secs: u64,
    pub staleness_threshold_secs: i64,

    // Storage
    pub store_backend: StoreBackend,
    pub data_dir: String,
    pub database_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Json,
    Sqlite,
}

const DEFAULT_PING_MESSAGE: &str = "in discord, share todo list";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            guild_id: required_id("GUILD_ID")?,
            owner_id: required_id("OWNER_ID")?,
            ping_channel_ids: id_list("PING_CHANNEL_IDS")?,
            ping_role_id: optional_id("PING_ROLE_ID")?,
            ignored_bot_id: optional_id("IGNORED_BOT_ID")?,
            ping_message: env::var("PING_MESSAGE")
                .unwrap_or_else(|_| DEFAULT_PING_MESSAGE.to_string()),
            reminder_channel_id: optional_id("REMINDER_CHANNEL_ID")?,
            sweep_interval_secs: duration_secs("SWEEP_INTERVAL", "1h")?,
            staleness_threshold_secs: i64::try_from(duration_secs("STALENESS_THRESHOLD", "24h")?)
                .map_err(|_| anyhow::anyhow!("STALENESS_THRESHOLD is too large"))?,
            store_backend: store_backend("STORE_BACKEND")?,
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| ".".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/redban.db".to_string()),
        })
    }

    /// Path of a JSON document inside the data directory
    pub fn document_path(&self, file_name: &str) -> PathBuf {
        PathBuf::from(&self.data_dir).join(file_name)
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        user_id == self.owner_id
    }
}

/// Discord snowflakes are never zero
fn parse_id(name: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse::<NonZeroU64>()
        .map(NonZeroU64::get)
        .map_err(|_| anyhow::anyhow!("{} must be a valid non-zero u64", name))
}

fn required_id(name: &str) -> anyhow::Result<u64> {
    let raw = env::var(name).map_err(|_| anyhow::anyhow!("{} must be set", name))?;
    parse_id(name, &raw)
}

fn optional_id(name: &str) -> anyhow::Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_id(name, &raw).map(Some),
        _ => Ok(None),
    }
}

fn id_list(name: &str) -> anyhow::Result<Vec<u64>> {
    let raw = env::var(name).unwrap_or_default();
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_id(name, part))
        .collect()
}

fn duration_secs(name: &str, default: &str) -> anyhow::Result<u64> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let duration = parse_duration(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid duration ('{}'): {}", name, raw, e))?;
    if duration.as_secs() == 0 {
        anyhow::bail!("{} must be at least one second", name);
    }
    Ok(duration.as_secs())
}

fn store_backend(name: &str) -> anyhow::Result<StoreBackend> {
    let raw = env::var(name).unwrap_or_else(|_| "json".to_string());
    let normalized = raw.trim().to_lowercase();
    StoreBackend::deserialize(normalized.as_str().into_deserializer()).map_err(|e: ValueError| {
        anyhow::anyhow!("{} must be 'json' or 'sqlite', got '{}': {}", name, raw, e)
    })
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("guild_id", &self.guild_id)
            .field("owner_id", &self.owner_id)
            .field("ping_channel_ids", &self.ping_channel_ids)
            .field("ping_role_id", &self.ping_role_id)
            .field("ignored_bot_id", &self.ignored_bot_id)
            .field("ping_message", &self.ping_message)
            .field("reminder_channel_id", &self.reminder_channel_id)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("staleness_threshold_secs", &self.staleness_threshold_secs)
            .field("store_backend", &self.store_backend)
            .field("data_dir", &self.data_dir)
            .field("database_url", &self.database_url)
            .finish()
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Config {
            discord_token: "test".to_string(),
            guild_id: 1,
            owner_id: 1406313503278764174,
            ping_channel_ids: vec![100],
            ping_role_id: Some(200),
            ignored_bot_id: Some(300),
            ping_message: DEFAULT_PING_MESSAGE.to_string(),
            reminder_channel_id: Some(400),
            sweep_interval_secs: 3600,
            staleness_threshold_secs: 86400,
            store_backend: StoreBackend::Json,
            data_dir: ".".to_string(),
            database_url: ":memory:".to_string(),
        }
    }
}

/// Discord message limit is 2000 characters, keep some headroom for formatting
pub const DISCORD_MESSAGE_SOFT_LIMIT: usize = 1900;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_logic() {
        // 1. Test missing vars
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("GUILD_ID");
        env::remove_var("OWNER_ID");
        let result = Config::build();
        assert!(
            result.is_err(),
            "Should fail when required vars are missing"
        );

        // 2. Test defaults
        env::set_var("DISCORD_TOKEN", "test_token");
        env::set_var("GUILD_ID", "12345");
        env::set_var("OWNER_ID", "1406313503278764174");
        let config = Config::build().unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.guild_id, 12345);
        assert!(config.is_owner(1406313503278764174));
        assert!(!config.is_owner(1));
        assert_eq!(config.sweep_interval_secs, 3600);
        assert_eq!(config.staleness_threshold_secs, 86400);
        assert_eq!(config.store_backend, StoreBackend::Json);
        assert!(config.ping_channel_ids.is_empty());
        assert_eq!(config.ping_message, DEFAULT_PING_MESSAGE);

        // 3. Test overrides
        env::set_var("SWEEP_INTERVAL", "30m");
        env::set_var("STORE_BACKEND", "SQLite");
        env::set_var("PING_CHANNEL_IDS", "1458400694682783775, 1458400694682783776");
        let config = Config::build().unwrap();
        assert_eq!(config.sweep_interval_secs, 1800);
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(
            config.ping_channel_ids,
            vec![1458400694682783775, 1458400694682783776]
        );

        // 4. Test invalid values
        env::set_var("PING_CHANNEL_IDS", "1458400694682783775,abc");
        assert!(Config::build().is_err());
        env::set_var("PING_CHANNEL_IDS", "0");
        assert!(Config::build().is_err());
        env::remove_var("PING_CHANNEL_IDS");
        env::set_var("SWEEP_INTERVAL", "0s");
        assert!(Config::build().is_err());
        env::remove_var("SWEEP_INTERVAL");
        env::set_var("STORE_BACKEND", "redis");
        assert!(Config::build().is_err());
        env::remove_var("STORE_BACKEND");
        env::set_var("STALENESS_THRESHOLD", "300000000000y");
        assert!(Config::build().is_err());
        env::set_var("STALENESS_THRESHOLD", "36h");
        assert_eq!(Config::build().unwrap().staleness_threshold_secs, 129_600);
        env::remove_var("STALENESS_THRESHOLD");

        // 5. Test debug redaction
        let debug_output = format!("{:?}", Config::build().unwrap());
        assert!(!debug_output.contains("test_token"));
        assert!(debug_output.contains("[REDACTED]"));

        // Cleanup
        env::remove_var("DISCORD_TOKEN");
        env::remove_var("GUILD_ID");
        env::remove_var("OWNER_ID");
    }

    #[test]
    fn test_document_path() {
        let mut config = Config::for_tests();
        config.data_dir = "/var/lib/redban".to_string();
        assert_eq!(
            config.document_path("redlist.json"),
            PathBuf::from("/var/lib/redban/redlist.json")
        );
    }
}
