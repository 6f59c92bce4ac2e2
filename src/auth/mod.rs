//! Authentication module: session state and inactivity enforcement.
//!
//! This module provides:
//! - `SessionStore`: single source of truth for the session token, with
//!   change notification for every component that renders from it
//! - `TokenStorage` backends: in-memory or on-disk session scope
//! - `IdleMonitor`: inactivity timeout that clears the session
//! - `SavedLogin`: OS-keychain storage for the staff password

pub mod credentials;
pub mod idle;
pub mod storage;
pub mod store;

pub use credentials::SavedLogin;
pub use idle::IdleMonitor;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::SessionStore;
