use ratatui::Frame;
use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use serde_json::Value;

use crate::api::Field;
use crate::app::{AppState, ModalState};
use crate::session::SessionKind;
use crate::state::PendingOp;

pub fn render_users_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    let block = Block::default()
        .title("Users")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border));

    if app.loading && app.list.is_empty() {
        let p = Paragraph::new("Loading users...")
            .style(Style::default().fg(app.theme.muted))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }

    let start = (app.selected_user_index / app.rows_per_page) * app.rows_per_page;
    let end = (start + app.rows_per_page).min(app.users.len());
    let slice = &app.users[start..end];

    let rows = slice.iter().enumerate().map(|(i, u)| {
        let absolute_index = start + i;
        // Deleted rows leave the list at once, so only updates show here.
        let saving = app.list.pending(u.id) == Some(PendingOp::Update);
        let mut style = if saving {
            Style::default().fg(app.theme.muted).add_modifier(Modifier::ITALIC)
        } else {
            Style::default().fg(app.theme.text)
        };
        if absolute_index == app.selected_user_index {
            style = style.fg(app.theme.highlight_fg).bg(app.theme.highlight_bg).add_modifier(Modifier::BOLD);
        }
        let marker = if saving { "~" } else { " " };
        let city = if u.address.city.is_empty() { "-" } else { u.address.city.as_str() };
        Row::new(vec![
            Cell::from(format!("{marker}{}", u.id)),
            Cell::from(u.name.clone()),
            Cell::from(u.username.clone()),
            Cell::from(u.email.clone()),
            Cell::from(city.to_string()),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(28),
        Constraint::Percentage(18),
        Constraint::Percentage(32),
        Constraint::Percentage(22),
    ];

    let header = Row::new(vec!["ID", "NAME", "USERNAME", "EMAIL", "CITY"]).style(
        Style::default().fg(app.theme.title).add_modifier(Modifier::BOLD),
    );

    let table = Table::new(rows, widths).header(header).block(block).column_spacing(1);

    f.render_widget(table, area);
}

pub fn render_user_details(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(u) = app.selected_user() {
        for (label, value) in [
            ("Id", u.id.to_string()),
            ("Name", u.name.clone()),
            ("Username", u.username.clone()),
            ("Email", u.email.clone()),
            ("City", u.address.city.clone()),
        ] {
            lines.push(Line::from(vec![
                Span::styled(format!("{label}: "), Style::default().fg(app.theme.title)),
                Span::raw(value),
            ]));
        }
        // Plain string fields the server sent that the form does not edit
        for (key, value) in &u.extra {
            if let Value::String(s) = value {
                lines.push(Line::from(vec![
                    Span::styled(format!("{key}: "), Style::default().fg(app.theme.muted)),
                    Span::raw(s.clone()),
                ]));
            }
        }
        if app.list.pending(u.id) == Some(PendingOp::Update) {
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled(
                "Saving changes...",
                Style::default().fg(app.theme.muted).add_modifier(Modifier::ITALIC),
            )));
        }
    }
    let p = Paragraph::new(lines).style(Style::default().fg(app.theme.text)).block(
        Block::default().title("Details").borders(Borders::ALL).border_style(Style::default().fg(app.theme.border)),
    );
    f.render_widget(p, area);
}

pub fn render_user_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    match state {
        ModalState::Form { session, focus } => {
            let rect = crate::ui::components::centered_rect(56, 10, area);
            let title = match session.kind() {
                SessionKind::Create => "New user".to_string(),
                SessionKind::Edit(source) => format!("Edit user {}", source.id),
            };
            let mut lines: Vec<Line> = Field::ALL
                .iter()
                .map(|field| {
                    let value = session.draft().get(*field);
                    let focused = field == focus && !session.is_saving();
                    let cursor = if focused { "_" } else { "" };
                    let marker = if focused { "▶" } else { " " };
                    let style = if focused {
                        Style::default().fg(app.theme.highlight_fg)
                    } else {
                        Style::default().fg(app.theme.text)
                    };
                    Line::styled(format!("{marker} {:<9}{value}{cursor}", format!("{}:", field.label())), style)
                })
                .collect();
            lines.push(Line::raw(""));
            if session.is_saving() {
                lines.push(Line::styled("Saving...", Style::default().fg(app.theme.muted)));
            } else {
                lines.push(Line::styled(
                    "Enter: save  Tab/Up/Down: field  Esc: cancel",
                    Style::default().fg(app.theme.muted),
                ));
            }
            let p = Paragraph::new(lines).block(
                Block::default().title(title).borders(Borders::ALL).border_style(Style::default().fg(app.theme.border)),
            );
            f.render_widget(Clear, rect);
            f.render_widget(p, rect);
        }
        ModalState::DeleteConfirm { id, name, selected } => {
            let rect = crate::ui::components::centered_rect(50, 7, area);
            let yes = if *selected == 0 { "[Yes]" } else { " Yes " };
            let no = if *selected == 1 { "[No]" } else { " No " };
            let text = format!("Delete user {id} ({name})?\n\n    {yes}    {no}");
            let p = Paragraph::new(text).block(
                Block::default()
                    .title("Confirm delete")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
            f.render_widget(Clear, rect);
            f.render_widget(p, rect);
        }
        ModalState::Info { .. } | ModalState::Help => {}
    }
}
