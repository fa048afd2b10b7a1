//! Client configuration.

use std::time::Duration;

use billionaire_protocol::DEFAULT_MAX_FRAME_BYTES;
use serde::{Deserialize, Serialize};

use crate::BillionaireError;

/// Environment variable overriding [`ClientConfig::host`].
pub const ENV_HOST: &str = "BILLIONAIRE_HOST";
/// Environment variable overriding [`ClientConfig::port`].
pub const ENV_PORT: &str = "BILLIONAIRE_PORT";
/// Environment variable overriding [`ClientConfig::connect_timeout`], in
/// milliseconds.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "BILLIONAIRE_CONNECT_TIMEOUT_MS";

/// How to reach the server and how much to buffer.
///
/// `#[serde(default)]` lets a config file name only the fields it
/// changes; everything else keeps its [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or IP.
    pub host: String,

    /// Server TCP port.
    pub port: u16,

    /// Give up connecting after this long. `None` waits for the OS.
    pub connect_timeout: Option<Duration>,

    /// Capacity of the event broadcast. A subscriber that falls this far
    /// behind skips ahead and is told how many events it missed.
    pub event_capacity: usize,

    /// Largest partial frame the decoder will buffer.
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
            connect_timeout: None,
            event_capacity: 256,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    /// `host:port`, as passed to the connector.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Defaults, overridden by `BILLIONAIRE_HOST`, `BILLIONAIRE_PORT` and
    /// `BILLIONAIRE_CONNECT_TIMEOUT_MS` where set.
    ///
    /// # Errors
    /// Returns [`BillionaireError::Config`] if a variable is set but does
    /// not parse.
    pub fn from_env() -> Result<Self, BillionaireError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup` (an environment, a map in tests).
    ///
    /// # Errors
    /// Returns [`BillionaireError::Config`] naming the bad variable.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BillionaireError> {
        if let Some(host) = lookup(ENV_HOST) {
            if host.trim().is_empty() {
                return Err(BillionaireError::Config(format!("{ENV_HOST} is empty")));
            }
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|e| {
                BillionaireError::Config(format!("{ENV_PORT}={port:?}: {e}"))
            })?;
        }
        if let Some(ms) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            let ms: u64 = ms.trim().parse().map_err(|e| {
                BillionaireError::Config(format!("{ENV_CONNECT_TIMEOUT_MS}={ms:?}: {e}"))
            })?;
            self.connect_timeout = Some(Duration::from_millis(ms));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "127.0.0.1:5555");
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
    }

    #[test]
    fn test_overrides_apply() {
        let config = ClientConfig::default()
            .with_overrides(env(&[
                (ENV_HOST, "game.local"),
                (ENV_PORT, "7000"),
                (ENV_CONNECT_TIMEOUT_MS, "1500"),
            ]))
            .unwrap();

        assert_eq!(config.address(), "game.local:7000");
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let config = ClientConfig::default().with_overrides(env(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_bad_port_is_config_error() {
        let result = ClientConfig::default().with_overrides(env(&[(ENV_PORT, "seventy")]));
        assert!(matches!(result, Err(BillionaireError::Config(msg)) if msg.contains(ENV_PORT)));
    }

    #[test]
    fn test_empty_host_is_config_error() {
        let result = ClientConfig::default().with_overrides(env(&[(ENV_HOST, "  ")]));
        assert!(matches!(result, Err(BillionaireError::Config(_))));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ClientConfig = serde_json::from_str(r#"{"port": 6000}"#).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.host, "127.0.0.1");
    }
}
