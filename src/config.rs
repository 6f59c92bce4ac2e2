//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API origin and prefix, the idle-logout timeout, the session storage
//! scope, and the last used staff email.
//!
//! Configuration is stored at `~/.config/casebook/config.json`. Every field
//! can be overridden from the environment (`CASEBOOK_API_URL`,
//! `CASEBOOK_API_PREFIX`, `CASEBOOK_IDLE_TIMEOUT_SECS`,
//! `CASEBOOK_PERSIST_SESSION`), so nothing deployment-specific is baked in.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/state directory paths
const APP_NAME: &str = "casebook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Development fallback origin; production deployments set CASEBOOK_API_URL.
const DEFAULT_API_ORIGIN: &str = "http://127.0.0.1:5000";

/// All backend routes are mounted under this prefix.
const DEFAULT_API_PREFIX: &str = "/api";

/// Idle-logout timeout: 5 minutes of inactivity.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Origin of the case-management API, e.g. `https://center.example.org`.
    pub api_origin: String,
    /// Path prefix the backend mounts its routes under.
    pub api_prefix: String,
    /// Seconds of inactivity before the session is cleared.
    pub idle_timeout_secs: u64,
    /// When true the token is kept on disk and survives restarts;
    /// when false it lives in memory and dies with the process.
    pub persist_session: bool,
    /// HTTP statuses that terminate the session client-side. 422 is included
    /// by default because the backend returns it for malformed/expired
    /// credentials; deployments with a fixed contract can narrow this to 401.
    pub invalidating_statuses: Vec<u16>,
    /// Last email used to sign in, for login form prefill.
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_origin: DEFAULT_API_ORIGIN.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            persist_session: true,
            invalidating_statuses: vec![401, 422],
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(origin) = std::env::var("CASEBOOK_API_URL") {
            self.api_origin = origin.trim_end_matches('/').to_string();
        }
        if let Ok(prefix) = std::env::var("CASEBOOK_API_PREFIX") {
            self.api_prefix = prefix;
        }
        if let Ok(secs) = std::env::var("CASEBOOK_IDLE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.idle_timeout_secs = secs;
            }
        }
        if let Ok(persist) = std::env::var("CASEBOOK_PERSIST_SESSION") {
            self.persist_session = matches!(persist.as_str(), "1" | "true" | "yes");
        }
    }

    /// Origin + prefix, the fixed root every relative path is joined with.
    pub fn api_base(&self) -> String {
        format!("{}{}", self.api_origin, self.api_prefix)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for process-external state (the persisted token).
    pub fn state_dir() -> Result<PathBuf> {
        let state_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find local data directory"))?;
        Ok(state_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_dev_server() {
        let config = Config::default();
        assert_eq!(config.api_base(), "http://127.0.0.1:5000/api");
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
        assert!(config.persist_session);
    }

    #[test]
    fn invalidating_statuses_cover_backend_quirk() {
        let config = Config::default();
        assert!(config.invalidating_statuses.contains(&401));
        assert!(config.invalidating_statuses.contains(&422));
        assert!(!config.invalidating_statuses.contains(&500));
    }

    #[test]
    fn config_round_trips_through_json() {
        let mut config = Config::default();
        config.last_email = Some("staff@center.org".to_string());
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.last_email.as_deref(), Some("staff@center.org"));
        assert_eq!(parsed.invalidating_statuses, vec![401, 422]);
    }
}
