//! Environment-based configuration with logged defaults

use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub session_ttl_days: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("BOOKSTORE_PORT", "3000"),
            mongodb_uri: try_load("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_db: try_load("MONGODB_DB", "bookstore"),
            session_ttl_days: try_load("SESSION_TTL_DAYS", "30"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
