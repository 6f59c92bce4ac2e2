//! Inactivity-based session expiry.
//!
//! `IdleMonitor` owns a background task with a single re-armable deadline.
//! Activity resets are O(1) (`watch::Sender::send_replace`) and safe to call
//! at input-event frequency. When the deadline passes with no activity, the
//! monitor clears the session store, signals its owner once, and stops.
//! Dropping the monitor aborts the task, so a pending deadline can never
//! fire against a torn-down context.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use super::store::SessionStore;

pub struct IdleMonitor {
    activity: watch::Sender<Instant>,
    task: JoinHandle<()>,
}

impl IdleMonitor {
    /// Spawn a monitor with the given timeout. On expiry the store is
    /// cleared and a single message is sent on `expired_tx`.
    pub fn spawn(timeout: Duration, store: SessionStore, expired_tx: mpsc::Sender<()>) -> Self {
        let (activity, mut activity_rx) = watch::channel(Instant::now());

        let task = tokio::spawn(async move {
            loop {
                let deadline = *activity_rx.borrow_and_update() + timeout;
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        // An activity signal may have raced the timer; only
                        // expire if the deadline still stands.
                        if *activity_rx.borrow() + timeout > Instant::now() {
                            continue;
                        }
                        info!(timeout_secs = timeout.as_secs(), "Idle timeout reached, ending session");
                        if let Err(e) = store.clear() {
                            tracing::warn!(error = %e, "Failed to clear session on idle timeout");
                        }
                        let _ = expired_tx.send(()).await;
                        break;
                    }
                    changed = activity_rx.changed() => {
                        if changed.is_err() {
                            // Monitor handle dropped
                            break;
                        }
                    }
                }
            }
        });

        Self { activity, task }
    }

    /// Record user activity, pushing the deadline out to now + timeout.
    pub fn touch(&self) {
        self.activity.send_replace(Instant::now());
    }
}

impl Drop for IdleMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
