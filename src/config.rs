use crate::error::ConfigError;
use std::{collections::HashSet, env, fmt::Display, str::FromStr, time::Duration};
use tracing::{info, warn};

const DEFAULT_CATEGORIES: &str = "baseball,basketball,hockey,rugby,soccer";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub categories: Vec<String>,
    /// Frames a client may have pending before it is treated as a slow consumer.
    pub outbound_queue: usize,
    pub send_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let categories = parse_categories(&var("VOTE_CATEGORIES").unwrap_or_else(|_| {
            info!("VOTE_CATEGORIES not set, using default: {DEFAULT_CATEGORIES}");
            DEFAULT_CATEGORIES.to_string()
        }))?;

        let outbound_queue: usize = try_load("OUTBOUND_QUEUE", "32")?;
        if outbound_queue == 0 {
            return Err(ConfigError::Invalid {
                key: "OUTBOUND_QUEUE",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            port: try_load("PORT", "8080")?,
            categories,
            outbound_queue,
            send_timeout: Duration::from_millis(try_load("SEND_TIMEOUT_MS", "5000")?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            categories: DEFAULT_CATEGORIES.split(',').map(str::to_string).collect(),
            outbound_queue: 32,
            send_timeout: Duration::from_secs(5),
        }
    }
}

pub fn parse_categories(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateCategory(name.to_string()));
        }
        categories.push(name.to_string());
    }

    if categories.is_empty() {
        return Err(ConfigError::NoCategories);
    }
    Ok(categories)
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| ())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}
