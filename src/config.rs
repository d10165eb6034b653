use crate::ledger::RECENT_WINDOW;
use std::path::PathBuf;

/// Display name; the version lives in `crate::VERSION`
pub const APP_NAME: &str = "Clinica";

pub const DEFAULT_DATABASE: &str = "clinica.db";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_LOG: &str = "clinica=info";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: String,
    /// How many recent ledger lines the cash-flow page aggregates
    pub recent_window: usize,
    /// Default tracing directive when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            bind_addr: DEFAULT_BIND.to_string(),
            recent_window: RECENT_WINDOW,
            log_filter: DEFAULT_LOG.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(path) = get("CLINICA_DATABASE") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(addr) = get("CLINICA_BIND") {
            config.bind_addr = addr;
        }
        if let Some(raw) = get("CLINICA_RECENT_WINDOW") {
            config.recent_window = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CLINICA_RECENT_WINDOW",
                        value: raw,
                    })
                }
            };
        }
        if let Some(filter) = get("CLINICA_LOG") {
            config.log_filter = filter;
        }

        Ok(config)
    }
}
