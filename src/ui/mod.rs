pub mod components;
pub mod users;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{AppState, InputMode, ModalState};

pub fn render(f: &mut Frame, app: &mut AppState) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(root[1]);

    let prompt = match app.input_mode {
        InputMode::Search => format!("  Search: {}_", app.search_query),
        _ if !app.search_query.is_empty() => format!("  Filter: {}", app.search_query),
        _ => String::new(),
    };
    let p = Paragraph::new(format!(
        "{}{prompt}  users:{}/{}  /: search; n: new; e: edit; d: delete; r: reload; ?: help; q: quit",
        app.source,
        app.users.len(),
        app.list.len(),
    ))
    .block(
        Block::default()
            .title("usrapi-manager")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    )
    .style(Style::default().fg(app.theme.header_fg).bg(app.theme.header_bg));
    f.render_widget(p, root[0]);

    users::render_users_table(f, body[0], app);
    users::render_user_details(f, body[1], app);
    components::render_status_bar(f, root[2], app);

    if app.modal.is_some() {
        render_modal(f, f.area(), app);
    }
}

fn render_modal(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(state) = app.modal.as_ref() else {
        return;
    };
    match state {
        ModalState::Form { .. } | ModalState::DeleteConfirm { .. } => {
            users::render_user_modal(f, area, app, state);
        }
        ModalState::Info { back, .. } => {
            // Keep the form visible underneath its failure notice.
            if let Some(prev) = back.as_deref() {
                users::render_user_modal(f, area, app, prev);
            }
            components::render_info_modal(f, area, app, state);
        }
        ModalState::Help => components::render_help_modal(f, area, app),
    }
}
