//! Server configuration read from environment variables.
//!
//! - `ENTLOCK_DB_PATH`: SQLite database file path (default: in-memory lock table)
//! - `ENTLOCK_HOST`: listen address (default: "0.0.0.0")
//! - `ENTLOCK_PORT`: listen port (default: "3000")
//! - `ENTLOCK_SWEEP_INTERVAL_SECS`: expired-lock sweep period; unset or 0 disables it

use std::time::Duration;

/// Errors from reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration of the lock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `None` keeps the lock table in memory.
    pub db_path: Option<String>,
    pub host: String,
    pub port: u16,
    /// `None` disables the background sweep.
    pub sweep_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            db_path: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
            sweep_interval: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = match non_empty("ENTLOCK_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "ENTLOCK_PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.port,
        };

        let sweep_interval = match non_empty("ENTLOCK_SWEEP_INTERVAL_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    var: "ENTLOCK_SWEEP_INTERVAL_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(ServerConfig {
            db_path: non_empty("ENTLOCK_DB_PATH"),
            host: non_empty("ENTLOCK_HOST").unwrap_or(defaults.host),
            port,
            sweep_interval,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
