//! casebook - a terminal client for drop-in center case management.
//!
//! Staff sign in, browse the participant roster, review case notes,
//! services and referrals, and capture quick notes. Sessions end on
//! sign-out, on an auth-rejected request, or after an idle timeout.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use casebook::api::ApiClient;
use casebook::app::{App, AppState};
use casebook::auth::{FileTokenStorage, SessionStore};
use casebook::config::Config;
use casebook::ui::input::handle_input;
use casebook::ui::render::render;

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--login" {
        return login_cli().await;
    }

    init_tracing();
    info!("casebook starting");

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config)?;
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("casebook shutting down");
    Ok(())
}

/// Headless login: prompt on the terminal and seed the token store, so the
/// next TUI start (or another process sharing the store) is signed in.
async fn login_cli() -> Result<()> {
    init_tracing();
    let mut config = Config::load()?;

    print!("Email: ");
    use std::io::Write;
    io::stdout().flush()?;
    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    let email = email.trim().to_string();

    let password = rpassword::prompt_password("Password: ")?;

    let store = SessionStore::new(Box::new(FileTokenStorage::new(Config::state_dir()?)));
    let api = ApiClient::new(&config, store.clone())?;

    let token = api.login(&email, &password).await?;
    store.set(&token)?;

    config.last_email = Some(email);
    config.save()?;

    println!("Login successful.");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            let ev = event::read()?;

            // Any terminal event counts as user activity for the idle
            // monitor: keys, mouse, resize, regaining focus.
            app.touch_activity();

            if let Event::Key(key) = ev {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Apply completed background work and react to session changes
        app.check_background_tasks();
        app.check_idle_expiry();
        app.check_session();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
