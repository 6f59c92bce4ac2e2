//! Session token store.
//!
//! `SessionStore` is the single source of truth for the current bearer token.
//! Every component that needs session state holds a clone of the store and
//! re-reads via `get()` at the point of use; nothing caches the token.
//!
//! Mutations notify subscribers through a `watch` generation counter.
//! Notifications are best-effort and may be coalesced, which is fine: a
//! subscriber's only correct reaction is to call `get()` again.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::storage::TokenStorage;

struct Inner {
    backend: Box<dyn TokenStorage>,
    generation: watch::Sender<u64>,
}

/// Owner of current-token state. Clone is cheap; clones share the same
/// backend and the same change notification channel.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn TokenStorage>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                backend,
                generation,
            }),
        }
    }

    /// Current token, or `None`. Never blocks, never fails: a backend read
    /// error degrades to "no session" with a warning.
    pub fn get(&self) -> Option<String> {
        match self.inner.backend.read() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read session token, treating as absent");
                None
            }
        }
    }

    /// Store a new token, replacing any previous one, then notify subscribers.
    pub fn set(&self, token: &str) -> Result<()> {
        self.inner.backend.write(token)?;
        self.notify();
        debug!("Session token stored");
        Ok(())
    }

    /// Remove the token, then notify subscribers. Idempotent.
    pub fn clear(&self) -> Result<()> {
        self.inner.backend.remove()?;
        self.notify();
        debug!("Session token cleared");
        Ok(())
    }

    /// Subscribe to change notifications. The receiver carries a generation
    /// counter, not the token; on wakeup, call `get()`.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }

    fn notify(&self) {
        self.inner.generation.send_modify(|g| *g = g.wrapping_add(1));
    }
}
