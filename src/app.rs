//! Application state management for casebook.
//!
//! The `App` struct is the session gate: it decides whether the login form
//! or the authenticated roster is shown, keeps that decision consistent
//! with `SessionStore` state, and coordinates background data fetches.
//!
//! Every session-ending path converges on the store: the idle monitor and
//! the request pipeline only ever clear the store, and the gate reacts to
//! the store's change notification. That keeps navigation in one place and
//! makes simultaneous auth failures naturally collapse into one transition.

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{
    FileTokenStorage, IdleMonitor, MemoryTokenStorage, SavedLogin, SessionStore, TokenStorage,
};
use crate::config::Config;
use crate::models::{CaseNote, NewCaseNote, Participant, Referral, ServiceRecord};
use crate::utils::{cmp_ignore_case, format_duration_secs};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
/// 32 covers a full refresh (roster + orgs + detail) with headroom.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for a case note typed in the quick-capture bar
const MAX_NOTE_LENGTH: usize = 500;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state. `Login` and `Active` are the two sides of the
/// session gate; `AddingNote` is `Active` with the note-capture bar open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Login,
    Active,
    AddingNote,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from background fetch tasks back to the main loop.
enum FetchResult {
    Participants(Vec<Participant>),
    /// Notes, services and referrals for one participant
    Detail {
        participant_id: i64,
        notes: Vec<CaseNote>,
        services: Vec<ServiceRecord>,
        referrals: Vec<Referral>,
    },
    NoteCreated(i64, CaseNote),
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub store: SessionStore,
    pub api: ApiClient,

    // Session gate
    pub state: AppState,
    session_rx: watch::Receiver<u64>,
    idle: Option<IdleMonitor>,
    idle_expired_rx: Option<mpsc::Receiver<()>>,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Roster data
    pub participants: Vec<Participant>,
    pub roster_selection: usize,

    // Detail pane for the selected participant
    pub detail_participant_id: Option<i64>,
    pub notes: Vec<CaseNote>,
    pub services: Vec<ServiceRecord>,
    pub referrals: Vec<Referral>,

    // Note quick-capture input
    pub note_input: String,

    // Background task channel
    fetch_tx: mpsc::Sender<FetchResult>,
    fetch_rx: mpsc::Receiver<FetchResult>,

    // Status line
    pub status_message: Option<String>,
}

impl App {
    /// Create the application with storage wired per config: on-disk token
    /// storage when the session should survive restarts, in-memory otherwise.
    pub fn new(config: Config) -> Result<Self> {
        let backend: Box<dyn TokenStorage> = if config.persist_session {
            Box::new(FileTokenStorage::new(Config::state_dir()?))
        } else {
            Box::new(MemoryTokenStorage::default())
        };
        let store = SessionStore::new(backend);
        Self::with_store(config, store)
    }

    /// Create the application over an existing store. Used directly by
    /// tests to inject in-memory storage.
    pub fn with_store(config: Config, store: SessionStore) -> Result<Self> {
        let api = ApiClient::new(&config, store.clone())?;
        let session_rx = store.subscribe();
        let (fetch_tx, fetch_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill the login form from env vars, then the saved login
        let login_email = std::env::var("CASEBOOK_EMAIL")
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var("CASEBOOK_PASSWORD").ok().unwrap_or_else(|| {
            if !login_email.is_empty() && SavedLogin::has_password(&login_email) {
                SavedLogin::get_password(&login_email).unwrap_or_default()
            } else {
                String::new()
            }
        });
        let login_focus = if login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };

        let mut app = Self {
            config,
            store,
            api,
            state: AppState::Login,
            session_rx,
            idle: None,
            idle_expired_rx: None,
            login_email,
            login_password,
            login_focus,
            login_error: None,
            participants: Vec::new(),
            roster_selection: 0,
            detail_participant_id: None,
            notes: Vec::new(),
            services: Vec::new(),
            referrals: Vec::new(),
            note_input: String::new(),
            fetch_tx,
            fetch_rx,
            status_message: None,
        };

        // Initial gate decision: an existing token renders the app directly
        if app.store.get().is_some() {
            debug!("Existing session found at startup");
            app.enter_active();
        }

        Ok(app)
    }

    // =========================================================================
    // Session gate
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.store.get().is_some()
    }

    /// Attempt login with the credentials from the login form.
    pub async fn attempt_login(&mut self) -> Result<(), ApiError> {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Ok(());
        }
        self.login_error = None;

        match self.api.login(&email, &password).await {
            Ok(token) => {
                if let Err(e) = self.store.set(&token) {
                    // Without a stored token every authenticated call would
                    // go out anonymous; treat this as a failed login.
                    error!(error = %e, "Failed to store session token");
                    self.login_error = Some("Could not store session token".to_string());
                    return Ok(());
                }

                if let Err(e) = SavedLogin::store(&email, &password) {
                    warn!(error = %e, "Failed to save login to keychain");
                }
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.login_password.clear();
                info!("Login successful");
                // Local transition is immediate; the watch notification that
                // follows the set() is only needed by other subscribers.
                self.enter_active();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(login_error_message(&e));
                Err(e)
            }
        }
    }

    /// Explicit sign-out. Clears the store (the gate transition happens in
    /// `check_session` like any other clear) and forgets the saved login.
    /// Idle or pipeline-driven clears keep the saved login for the next
    /// sign-in; only a deliberate sign-out removes it.
    pub fn sign_out(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session on sign-out");
        }
        let email = self.login_email.trim();
        if !email.is_empty() {
            if let Err(e) = SavedLogin::delete(email) {
                debug!(error = %e, "No saved login to remove");
            }
        }
        self.login_password.clear();
        self.status_message = Some("Signed out".to_string());
    }

    /// Forward a user-activity signal to the idle monitor.
    pub fn touch_activity(&self) {
        if let Some(ref idle) = self.idle {
            idle.touch();
        }
    }

    /// React to store change notifications: this is where idle expiry,
    /// pipeline-detected auth failure, sign-out, and changes made by any
    /// other holder of this store all land.
    pub fn check_session(&mut self) {
        let changed = self
            .session_rx
            .has_changed()
            .unwrap_or(false);
        if !changed {
            return;
        }
        self.session_rx.mark_unchanged();

        match (self.store.get().is_some(), self.in_active_view()) {
            (false, true) => {
                info!("Session ended, returning to login");
                self.leave_active();
            }
            (true, false) => {
                // Another component tree signed in over the shared store
                info!("Session established elsewhere, entering app");
                self.enter_active();
            }
            _ => {}
        }
    }

    /// Poll the idle monitor's expiry notification for the status line.
    /// The state flip itself rides the store notification.
    pub fn check_idle_expiry(&mut self) {
        let expired = match self.idle_expired_rx {
            Some(ref mut rx) => rx.try_recv().is_ok(),
            None => false,
        };
        if expired {
            self.status_message = Some(format!(
                "Signed out after {} of inactivity",
                format_duration_secs(self.config.idle_timeout_secs)
            ));
        }
    }

    fn in_active_view(&self) -> bool {
        matches!(self.state, AppState::Active | AppState::AddingNote)
    }

    fn enter_active(&mut self) {
        let (expired_tx, expired_rx) = mpsc::channel(1);
        self.idle = Some(IdleMonitor::spawn(
            self.config.idle_timeout(),
            self.store.clone(),
            expired_tx,
        ));
        self.idle_expired_rx = Some(expired_rx);
        self.state = AppState::Active;
        self.login_error = None;
        self.refresh_all();
    }

    fn leave_active(&mut self) {
        // Dropping the monitor aborts its pending deadline
        self.idle = None;
        self.idle_expired_rx = None;
        self.state = AppState::Login;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        // Stale data must not be rendered after the session ends
        self.participants.clear();
        self.clear_detail();
        self.note_input.clear();
    }

    fn clear_detail(&mut self) {
        self.detail_participant_id = None;
        self.notes.clear();
        self.services.clear();
        self.referrals.clear();
    }

    // =========================================================================
    // Input helpers
    // =========================================================================

    pub fn push_login_char(&mut self, c: char) {
        match self.login_focus {
            LoginFocus::Email if self.login_email.len() < MAX_EMAIL_LENGTH => {
                self.login_email.push(c);
            }
            LoginFocus::Password if self.login_password.len() < MAX_PASSWORD_LENGTH => {
                self.login_password.push(c);
            }
            _ => {}
        }
    }

    pub fn pop_login_char(&mut self) {
        match self.login_focus {
            LoginFocus::Email => {
                self.login_email.pop();
            }
            LoginFocus::Password => {
                self.login_password.pop();
            }
            LoginFocus::Button => {}
        }
    }

    pub fn next_login_focus(&mut self) {
        self.login_focus = match self.login_focus {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        };
    }

    pub fn push_note_char(&mut self, c: char) {
        if self.note_input.len() < MAX_NOTE_LENGTH {
            self.note_input.push(c);
        }
    }

    pub fn selected_participant(&self) -> Option<&Participant> {
        self.participants.get(self.roster_selection)
    }

    pub fn select_next(&mut self) {
        if !self.participants.is_empty() {
            self.roster_selection = (self.roster_selection + 1).min(self.participants.len() - 1);
            self.fetch_selected_detail();
        }
    }

    pub fn select_prev(&mut self) {
        self.roster_selection = self.roster_selection.saturating_sub(1);
        self.fetch_selected_detail();
    }

    // =========================================================================
    // Background fetches
    // =========================================================================

    /// Kick off a background refresh of the roster.
    pub fn refresh_all(&mut self) {
        self.status_message = Some("Refreshing...".to_string());
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            match api.fetch_participants().await {
                Ok(participants) => {
                    let _ = tx.send(FetchResult::Participants(participants)).await;
                }
                Err(e) => {
                    let _ = tx.send(FetchResult::Error(e.to_string())).await;
                }
            }
        });
    }

    /// Fetch notes, services and referrals for the selected participant.
    pub fn fetch_selected_detail(&mut self) {
        let Some(participant) = self.selected_participant() else {
            return;
        };
        let participant_id = participant.id;
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let notes = api.fetch_case_notes(participant_id).await;
            let services = api.fetch_services(participant_id).await;
            let referrals = api.fetch_referrals(participant_id).await;
            match (notes, services, referrals) {
                (Ok(notes), Ok(services), Ok(referrals)) => {
                    let _ = tx
                        .send(FetchResult::Detail {
                            participant_id,
                            notes,
                            services,
                            referrals,
                        })
                        .await;
                }
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                    let _ = tx.send(FetchResult::Error(e.to_string())).await;
                }
            }
        });
    }

    /// Submit the note-capture bar for the selected participant.
    pub fn submit_note(&mut self) {
        let content = self.note_input.trim().to_string();
        self.note_input.clear();
        self.state = AppState::Active;
        if content.is_empty() {
            return;
        }
        let Some(participant) = self.selected_participant() else {
            return;
        };
        let participant_id = participant.id;
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            match api
                .create_case_note(participant_id, &NewCaseNote { content })
                .await
            {
                Ok(note) => {
                    let _ = tx.send(FetchResult::NoteCreated(participant_id, note)).await;
                }
                Err(e) => {
                    let _ = tx.send(FetchResult::Error(e.to_string())).await;
                }
            }
        });
    }

    /// Drain completed background work into application state.
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.fetch_rx.try_recv() {
            // Results racing a sign-out are dropped, never rendered
            if !self.in_active_view() {
                continue;
            }
            match result {
                FetchResult::Participants(mut participants) => {
                    participants
                        .sort_by(|a, b| cmp_ignore_case(&a.display_name(), &b.display_name()));
                    self.participants = participants;
                    self.roster_selection = self
                        .roster_selection
                        .min(self.participants.len().saturating_sub(1));
                    self.status_message =
                        Some(format!("{} participants", self.participants.len()));
                    self.fetch_selected_detail();
                }
                FetchResult::Detail {
                    participant_id,
                    notes,
                    services,
                    referrals,
                } => {
                    // The selection may have moved while this was in flight
                    if self.selected_participant().map(|p| p.id) == Some(participant_id) {
                        self.detail_participant_id = Some(participant_id);
                        self.notes = notes;
                        self.services = services;
                        self.referrals = referrals;
                    }
                }
                FetchResult::NoteCreated(participant_id, note) => {
                    if self.detail_participant_id == Some(participant_id) {
                        self.notes.insert(0, note);
                    }
                    self.status_message = Some("Note saved".to_string());
                }
                FetchResult::Error(message) => {
                    self.status_message = Some(message);
                }
            }
        }
    }
}

/// Map a login failure to a message fit for the form's error line.
fn login_error_message(e: &ApiError) -> String {
    match e {
        ApiError::Application { status, message } if status.as_u16() == 401 => {
            if message.is_empty() {
                "Invalid email or password".to_string()
            } else {
                message.clone()
            }
        }
        ApiError::Network(_) => {
            "Unable to connect to server. Check your connection and try again.".to_string()
        }
        ApiError::InvalidResponse(msg) => msg.clone(),
        other => format!("Login failed: {other}"),
    }
}
