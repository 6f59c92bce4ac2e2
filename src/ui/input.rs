//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. The caller feeds
//! every terminal event to the idle monitor separately, so nothing here
//! needs to track activity.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, LoginFocus};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::Login => handle_login_input(app, key).await,
        AppState::AddingNote => {
            handle_note_input(app, key);
            Ok(false)
        }
        AppState::Active => Ok(handle_active_input(app, key)),
        AppState::Quitting => Ok(true),
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Tab | KeyCode::Down => app.next_login_focus(),
        KeyCode::Enter => {
            if app.login_focus == LoginFocus::Email {
                app.next_login_focus();
            } else {
                // Errors surface on the form's error line; the loop goes on
                let _ = app.attempt_login().await;
            }
        }
        KeyCode::Backspace => app.pop_login_char(),
        KeyCode::Char(c) => app.push_login_char(c),
        _ => {}
    }
    Ok(false)
}

fn handle_active_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.state = AppState::Quitting;
            return true;
        }
        KeyCode::Char('s') => app.sign_out(),
        KeyCode::Char('r') => app.refresh_all(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('n') => {
            if app.selected_participant().is_some() {
                app.state = AppState::AddingNote;
            }
        }
        _ => {}
    }
    false
}

fn handle_note_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.note_input.clear();
            app.state = AppState::Active;
        }
        KeyCode::Enter => app.submit_note(),
        KeyCode::Backspace => {
            app.note_input.pop();
        }
        KeyCode::Char(c) => app.push_note_char(c),
        _ => {}
    }
}
