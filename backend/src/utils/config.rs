use anyhow::Result;
use std::env;
use std::str::FromStr;
use crate::constants::{
    DEFAULT_MAX_FRAME_BYTES, DEFAULT_PONG_WAIT_SECS, DEFAULT_SEND_BUFFER, DEFAULT_SERVER_PORT,
    DEFAULT_WRITE_WAIT_SECS,
};
use crate::services::SessionConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Empty means any origin is allowed.
    pub allowed_origins: Vec<String>,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, default: u64| parse_or(lookup(key), default);

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            port: parse_or(lookup("PORT"), DEFAULT_SERVER_PORT),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            session: SessionConfig::from_secs(
                number("WS_SEND_BUFFER", DEFAULT_SEND_BUFFER as u64) as usize,
                number("WS_MAX_FRAME_BYTES", DEFAULT_MAX_FRAME_BYTES as u64) as usize,
                number("WS_PONG_WAIT_SECS", DEFAULT_PONG_WAIT_SECS),
                number("WS_WRITE_WAIT_SECS", DEFAULT_WRITE_WAIT_SECS),
            ),
        })
    }
}

/// Falls back to `default` when the value is missing, unparsable or zero.
fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: FromStr + PartialEq + Default,
{
    raw.and_then(|value| value.trim().parse().ok())
        .filter(|value| *value != T::default())
        .unwrap_or(default)
}
