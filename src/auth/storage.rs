//! Token storage backends.
//!
//! The session token is the only value casebook persists outside the process.
//! `TokenStorage` abstracts where it lives so the deployment policy (keep the
//! session across restarts, or drop it when the process ends) is a wiring
//! decision rather than a code change.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token file name in the state directory
const TOKEN_FILE: &str = "token.json";

/// Where the current session token is kept.
pub trait TokenStorage: Send + Sync {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, token: &str) -> Result<()>;
    fn remove(&self) -> Result<()>;
}

/// Process-lifetime storage. The token dies with the process, which is the
/// "cleared at end of browsing session" scope.
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.token
            .lock()
            .map_err(|_| anyhow::anyhow!("token mutex poisoned"))
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn write(&self, token: &str) -> Result<()> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    saved_at: DateTime<Utc>,
}

/// On-disk storage under a single well-known file. Survives restarts, and
/// lets independent casebook processes share one session.
pub struct FileTokenStorage {
    state_dir: PathBuf,
}

impl FileTokenStorage {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    fn token_path(&self) -> PathBuf {
        self.state_dir.join(TOKEN_FILE)
    }
}

impl TokenStorage for FileTokenStorage {
    fn read(&self) -> Result<Option<String>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let stored: StoredToken =
            serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(stored.token))
    }

    fn write(&self, token: &str) -> Result<()> {
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredToken {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(path, contents).context("Failed to write token file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}
