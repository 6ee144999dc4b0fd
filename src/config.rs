//! Runtime configuration read from the environment (and `.env`, via dotenv).

use std::{str::FromStr, time::Duration};

use thiserror::Error;

use crate::chat::ChatConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Inactivity window after which a room is reclaimed.
    pub room_timeout: Duration,
    /// Staleness window for waiting entries.
    pub waiting_timeout: Duration,
    pub sweep_interval: Duration,
    /// How often a live WebSocket refreshes its participant's last-seen time.
    pub heartbeat_interval: Duration,
    pub max_room_messages: usize,
    pub max_message_len: usize,
    pub session_idle_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_owned(),
            room_timeout: Duration::from_secs(30 * 60),
            waiting_timeout: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            heartbeat_interval: Duration::from_secs(30),
            max_room_messages: 500,
            max_message_len: 2000,
            session_idle_minutes: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults for absent keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            room_timeout: secs(&lookup, "ROOM_TIMEOUT_SECS", defaults.room_timeout)?,
            waiting_timeout: secs(&lookup, "WAITING_TIMEOUT_SECS", defaults.waiting_timeout)?,
            sweep_interval: secs(&lookup, "SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
            heartbeat_interval: secs(&lookup, "HEARTBEAT_SECS", defaults.heartbeat_interval)?,
            max_room_messages: parsed(&lookup, "MAX_ROOM_MESSAGES", defaults.max_room_messages)?,
            max_message_len: parsed(&lookup, "MAX_MESSAGE_LEN", defaults.max_message_len)?,
            session_idle_minutes: parsed(&lookup, "SESSION_IDLE_MINUTES", defaults.session_idle_minutes)?,
        })
    }

    pub fn chat(&self) -> ChatConfig {
        ChatConfig {
            room_timeout: self.room_timeout,
            waiting_timeout: self.waiting_timeout,
            max_room_messages: self.max_room_messages,
            max_message_len: self.max_message_len,
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parsed(lookup, key, default.as_secs()).map(Duration::from_secs)
}
