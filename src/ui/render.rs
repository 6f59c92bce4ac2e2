//! Rendering for the TUI: login form, roster, detail pane, status bar.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{App, AppState, LoginFocus};
use crate::models::participant::timestamp_display;
use crate::utils::{format_phone, truncate_string};

use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    if matches!(app.state, AppState::Login) {
        render_login_overlay(frame, app);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title_line = Line::from(vec![
        Span::styled("  casebook", styles::title_style()),
        Span::styled("  drop-in center case management", styles::muted_style()),
    ]);
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_roster(frame, app, columns[0]);
    render_detail(frame, app, columns[1]);
}

fn render_roster(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .participants
        .iter()
        .map(|p| {
            let phone = p
                .phone
                .as_deref()
                .map(format_phone)
                .unwrap_or_else(|| "-".to_string());
            ListItem::new(Line::from(vec![
                Span::raw(truncate_string(&p.display_name(), 24)),
                Span::raw("  "),
                Span::styled(phone, styles::muted_style()),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    if !app.participants.is_empty() {
        state.select(Some(app.roster_selection));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(" Participants ({}) ", app.participants.len()))
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .highlight_style(styles::selected_style());

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(p) = app.selected_participant() {
        lines.push(Line::from(Span::styled(
            p.display_name(),
            styles::title_style(),
        )));
        if let Some(ref dob) = p.dob {
            lines.push(Line::from(format!("DOB: {dob}")));
        }
        if let Some(ref address) = p.address {
            lines.push(Line::from(format!("Address: {address}")));
        }
        if let Some(ref email) = p.email {
            lines.push(Line::from(format!("Email: {email}")));
        }
        lines.push(Line::default());

        lines.push(Line::from(Span::styled(
            format!("Case notes ({})", app.notes.len()),
            styles::highlight_style(),
        )));
        for note in app.notes.iter().take(5) {
            lines.push(Line::from(vec![
                Span::styled(
                    timestamp_display(note.created_at.as_deref()),
                    styles::muted_style(),
                ),
                Span::raw("  "),
                Span::raw(truncate_string(note.content.as_deref().unwrap_or(""), 60)),
            ]));
        }
        lines.push(Line::default());

        lines.push(Line::from(Span::styled(
            format!("Services ({})", app.services.len()),
            styles::highlight_style(),
        )));
        for svc in app.services.iter().take(5) {
            lines.push(Line::from(vec![
                Span::styled(
                    timestamp_display(svc.provided_at.as_deref()),
                    styles::muted_style(),
                ),
                Span::raw("  "),
                Span::raw(svc.service_type.clone().unwrap_or_else(|| "-".to_string())),
            ]));
        }
        lines.push(Line::default());

        lines.push(Line::from(Span::styled(
            format!("Referrals ({})", app.referrals.len()),
            styles::highlight_style(),
        )));
        for referral in app.referrals.iter().take(5) {
            lines.push(Line::from(vec![
                Span::raw(referral.org_display()),
                Span::raw("  "),
                Span::styled(
                    referral.status.clone().unwrap_or_else(|| "-".to_string()),
                    styles::muted_style(),
                ),
            ]));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "No participant selected",
            styles::muted_style(),
        )));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(" Detail ")
            .borders(Borders::ALL)
            .border_style(styles::border_style(false)),
    );
    frame.render_widget(paragraph, area);

    if matches!(app.state, AppState::AddingNote) {
        render_note_bar(frame, app, area);
    }
}

fn render_note_bar(frame: &mut Frame, app: &App, area: Rect) {
    let bar = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(3),
        width: area.width,
        height: 3,
    };
    frame.render_widget(Clear, bar);
    let input = Paragraph::new(Line::from(vec![
        Span::raw(app.note_input.as_str()),
        Span::styled("_", styles::highlight_style()),
    ]))
    .block(
        Block::default()
            .title(" New case note (Enter to save, Esc to cancel) ")
            .borders(Borders::ALL)
            .border_style(styles::border_style(true)),
    );
    frame.render_widget(input, bar);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left = app.status_message.clone().unwrap_or_default();
    let help = match app.state {
        AppState::Login => "Tab switch field | Enter sign in | Ctrl+C quit",
        AppState::AddingNote => "Enter save | Esc cancel",
        _ => "j/k select | n note | r refresh | s sign out | q quit",
    };

    let padding = (area.width as usize).saturating_sub(left.len() + help.len() + 4);
    let line = Line::from(vec![
        Span::raw(format!("  {left}")),
        Span::raw(" ".repeat(padding)),
        Span::styled(help, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(line).style(styles::status_bar_style()), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 13 } else { 11 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let field = |label: &str, value: String, focused: bool| {
        Line::from(vec![
            Span::styled(
                format!(" {label:<10}"),
                if focused {
                    styles::highlight_style()
                } else {
                    styles::muted_style()
                },
            ),
            Span::raw(value),
            Span::raw(if focused { "_" } else { "" }),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled("  Staff sign-in", styles::title_style())),
        Line::default(),
        field(
            "Email",
            app.login_email.clone(),
            app.login_focus == LoginFocus::Email,
        ),
        field(
            "Password",
            "*".repeat(app.login_password.len()),
            app.login_focus == LoginFocus::Password,
        ),
        Line::default(),
        Line::from(Span::styled(
            if app.login_focus == LoginFocus::Button {
                " > [ Sign in ] "
            } else {
                "   [ Sign in ] "
            },
            if app.login_focus == LoginFocus::Button {
                styles::selected_style()
            } else {
                styles::muted_style()
            },
        )),
    ];

    if let Some(ref error) = app.login_error {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!(" {error}"),
            styles::error_style(),
        )));
    }

    let dialog = Paragraph::new(lines).block(
        Block::default()
            .title(" casebook ")
            .borders(Borders::ALL)
            .border_style(styles::border_style(true)),
    );
    frame.render_widget(dialog, area);
}

/// A fixed-size rect centered in `parent`
fn centered_rect_fixed(width: u16, height: u16, parent: Rect) -> Rect {
    let x = parent.x + parent.width.saturating_sub(width) / 2;
    let y = parent.y + parent.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(parent.width),
        height: height.min(parent.height),
    }
}
