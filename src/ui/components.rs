//! Shared UI components (status bar, modal helpers).
//!
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::keymap::KeyAction;
use crate::app::{AppState, InputMode, ModalState};

/// Render the bottom status bar with mode, counts and the last load error.
pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Search => "SEARCH",
        InputMode::Modal => "MODAL",
    };
    let activity = if app.loading {
        "  loading..."
    } else if app.list.has_pending() {
        "  saving..."
    } else {
        ""
    };
    let msg = format!(
        "mode: {mode}  shown:{}  total:{}  rows/page:{}{activity}",
        app.users.len(),
        app.list.len(),
        app.rows_per_page,
    );
    let mut spans = vec![Span::raw(msg)];
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!("  {status}"),
            Style::default().fg(app.theme.error).add_modifier(Modifier::BOLD),
        ));
    }
    let p = Paragraph::new(Line::from(spans)).style(
        Style::default()
            .fg(app.theme.status_fg)
            .bg(app.theme.status_bg),
    );
    f.render_widget(p, area);
}

/// Compute a rectangle centered within `area` with a maximum size.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Render a notice; dismissed with Enter or Esc.
pub fn render_info_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::Info { message, .. } = state {
        let max_w = area.width.saturating_sub(6).max(30);
        let min_w = 48u16.min(max_w);
        let approx_lines = (message.len() as u16 / (min_w.saturating_sub(4).max(10))).max(1);
        let max_h = area.height.saturating_sub(6).max(5);
        let height = (approx_lines + 4).min(max_h).max(5);
        let rect = centered_rect(min_w, height, area);
        let p = Paragraph::new(format!("{message}\n\n[Enter] OK"))
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(app.theme.text))
            .block(
                Block::default()
                    .title("Notice")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.error)),
            );
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

/// Render the help modal from the active keymap.
pub fn render_help_modal(f: &mut Frame, area: Rect, app: &AppState) {
    let width = 64u16.min(area.width.saturating_sub(4)).max(40);
    let height = 20u16.min(area.height.saturating_sub(4)).max(12);
    let rect = centered_rect(width, height, area);

    let key_style = Style::default().add_modifier(Modifier::ITALIC);
    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled("Keys", Style::default().add_modifier(Modifier::BOLD))),
        Line::raw(""),
    ];
    for (label, action) in [
        ("Search", KeyAction::StartSearch),
        ("New user", KeyAction::NewUser),
        ("Edit selected", KeyAction::EditSelection),
        ("Delete selected", KeyAction::DeleteSelection),
        ("Reload list", KeyAction::Reload),
        ("Move up", KeyAction::MoveUp),
        ("Move down", KeyAction::MoveDown),
        ("Page up", KeyAction::PageUp),
        ("Page down", KeyAction::PageDown),
        ("Help", KeyAction::OpenHelp),
        ("Quit", KeyAction::Quit),
    ] {
        lines.push(Line::from(vec![
            Span::raw(format!("{label:>16}  ")),
            Span::styled(app.keymap.keys_for(action).join(", "), key_style),
        ]));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::raw("Search: typing filters by name or username; "),
        Span::styled("Enter", key_style),
        Span::raw(" keeps, "),
        Span::styled("Esc", key_style),
        Span::raw(" clears"),
    ]));
    lines.push(Line::from(vec![
        Span::raw("Form: "),
        Span::styled("Tab", key_style),
        Span::raw(" next field, "),
        Span::styled("Enter", key_style),
        Span::raw(" save, "),
        Span::styled("Esc", key_style),
        Span::raw(" cancel"),
    ]));

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}
