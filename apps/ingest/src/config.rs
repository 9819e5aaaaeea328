use tokenholder_core::holders::DedupPolicy;
use tokenholder_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub dedup_policy: DedupPolicy,
    pub log_format: LogFormat,
    pub pool_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("HOLDERS_DB_PATH").unwrap_or_else(|| "./db/holders.db".into());

        let dedup_policy = match lookup("HOLDERS_DEDUP_POLICY") {
            Some(raw) => raw.parse().map_err(|e| {
                Error::InvalidConfigValue(format!("HOLDERS_DEDUP_POLICY: {}", e))
            })?,
            None => DedupPolicy::default(),
        };

        let log_format = match lookup("HOLDERS_LOG_FORMAT") {
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(raw) if raw.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(raw) => {
                return Err(Error::InvalidConfigValue(format!(
                    "HOLDERS_LOG_FORMAT: expected 'text' or 'json', got '{}'",
                    raw
                )))
            }
            None => LogFormat::Text,
        };

        let pool_size = match lookup("HOLDERS_POOL_SIZE") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                Error::InvalidConfigValue(format!("HOLDERS_POOL_SIZE '{}': {}", raw, e))
            })?,
            None => 4,
        };

        Ok(Self {
            db_path,
            dedup_policy,
            log_format,
            pool_size,
        })
    }
}
