//! Client settings as supplied by the host, either as its JSON config block
//! or through environment variables.

use std::time::Duration;

use serde::Deserialize;

use crate::logger::MessageLogMode;
use crate::{Error, Result};

pub const DEFAULT_REFRESH_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageLogConfig {
    pub mode: MessageLogMode,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Controller address, optionally with `:port`.
    pub ip: String,
    /// Poll cadence in milliseconds.
    #[serde(default = "default_refresh_ms")]
    pub update_interval: u64,
    /// Per-request HTTP timeout in milliseconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    #[serde(default)]
    pub message_log: Option<MessageLogConfig>,
}

fn default_refresh_ms() -> u64 {
    DEFAULT_REFRESH_MS
}

impl ClientConfig {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            update_interval: DEFAULT_REFRESH_MS,
            request_timeout: None,
            message_log: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()
    }

    pub fn from_env() -> Result<Self> {
        let ip = match std::env::var("IZONE_IP") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => return Err(Error::Config("IZONE_IP is not set".to_string())),
        };

        let update_interval = match std::env::var("IZONE_UPDATE_INTERVAL_MS") {
            Ok(s) => s.trim().parse::<u64>().map_err(|_| {
                Error::Config("IZONE_UPDATE_INTERVAL_MS must be a whole number".to_string())
            })?,
            Err(_) => DEFAULT_REFRESH_MS,
        };

        let request_timeout = match std::env::var("IZONE_REQUEST_TIMEOUT_MS") {
            Ok(s) => Some(s.trim().parse::<u64>().map_err(|_| {
                Error::Config("IZONE_REQUEST_TIMEOUT_MS must be a whole number".to_string())
            })?),
            Err(_) => None,
        };

        let message_log = match std::env::var("IZONE_MESSAGE_LOG") {
            Ok(path) if !path.trim().is_empty() => {
                let mode_name =
                    std::env::var("IZONE_MESSAGE_LOG_MODE").unwrap_or_else(|_| "full".to_string());
                let mode = MessageLogMode::from_name(mode_name.trim()).ok_or_else(|| {
                    Error::Config(format!("unknown IZONE_MESSAGE_LOG_MODE: {mode_name}"))
                })?;
                Some(MessageLogConfig {
                    mode,
                    path: path.trim().to_string(),
                })
            }
            _ => None,
        };

        ClientConfig {
            ip,
            update_interval,
            request_timeout,
            message_log,
        }
        .validate()
    }

    fn validate(self) -> Result<Self> {
        if self.ip.trim().is_empty() {
            return Err(Error::Config("ip must not be empty".to_string()));
        }
        if self.request_timeout == Some(0) {
            return Err(Error::Config("requestTimeout must be positive".to_string()));
        }
        Ok(self)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_millis)
    }
}
