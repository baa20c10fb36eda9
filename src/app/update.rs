//! Event loop and input handling.
//!
//! Key handling never awaits. Anything that needs the server is spawned
//! onto the runtime and reports back as a [`TaskResult`], which the loop
//! picks up on its next tick. Confirmed records reach the list through the
//! [`UserEvents`] bus.

use anyhow::{Context as _, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{Field, UserId, UserStore};
use crate::app::keymap::KeyAction;
use crate::app::{AppState, InputMode, ModalState};
use crate::events::{TaskReceiver, TaskResult, TaskSender, UserEvent, UserEvents, task_channel};
use crate::notice::{Notice, NoticeKind};
use crate::search::apply_search;
use crate::session::EditSession;
use crate::ui;

const TICK: Duration = Duration::from_millis(50);

/// Whether the loop should keep running after a key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owns the store handle and the channels between the UI and request tasks.
pub struct Dispatcher {
    store: Arc<dyn UserStore>,
    events: UserEvents,
    user_rx: broadcast::Receiver<UserEvent>,
    tasks: TaskSender,
    results: TaskReceiver,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        let events = UserEvents::new();
        let user_rx = events.subscribe();
        let (tasks, results) = task_channel();
        Self {
            store,
            events,
            user_rx,
            tasks,
            results,
        }
    }

    pub fn events(&self) -> &UserEvents {
        &self.events
    }

    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let tx = self.tasks.clone();
        tokio::spawn(async move {
            if tx.send(fut.await).is_err() {
                debug!("UI loop gone; dropping task result");
            }
        });
    }

    /// Apply published user events and refresh the visible rows.
    pub fn sync(&mut self, app: &mut AppState) {
        if app.list.drain(&mut self.user_rx) > 0 {
            apply_search(app);
        }
    }

    /// Handle every result that has already arrived.
    pub fn poll_results(&mut self, app: &mut AppState) -> usize {
        let mut handled = 0;
        while let Ok(result) = self.results.try_recv() {
            self.handle_result(app, result);
            handled += 1;
        }
        handled
    }

    /// Wait for the next result and handle it. Returns false if no task can
    /// ever report again.
    pub async fn wait_result(&mut self, app: &mut AppState) -> bool {
        match self.results.recv().await {
            Some(result) => {
                self.handle_result(app, result);
                true
            }
            None => false,
        }
    }

    pub fn handle_result(&mut self, app: &mut AppState, result: TaskResult) {
        debug!(user_id = ?result.user_id(), "task finished");
        match result {
            TaskResult::Loaded(Ok(users)) => {
                app.loading = false;
                app.status = None;
                self.events.publish(UserEvent::Loaded(users));
            }
            TaskResult::Loaded(Err(err)) => {
                app.loading = false;
                warn!(error = %err, "loading users failed");
                app.status = Some(Notice::from_error(NoticeKind::LoadFailed, &err).to_string());
            }
            TaskResult::Committed { target, result } => match take_form(&mut app.modal) {
                Some((mut session, focus)) => {
                    match session.finish(&mut app.list, result, &self.events) {
                        Ok(_) => {
                            if app.modal.is_none() {
                                app.close_modal();
                            }
                        }
                        Err(notice) => {
                            let form = ModalState::Form { session, focus };
                            if app.modal.is_some() {
                                put_back_form(&mut app.modal, form);
                            } else {
                                app.open_modal(form);
                            }
                            app.show_notice(&notice);
                        }
                    }
                }
                None => {
                    // The form is gone; still reconcile the list.
                    if let Some(id) = target {
                        app.list.release(id);
                    }
                    match result {
                        Ok(record) if target.is_some() => {
                            self.events.publish(UserEvent::Updated(record));
                        }
                        Ok(record) => {
                            self.events.publish(UserEvent::Created(record));
                        }
                        Err(err) => {
                            let kind = if target.is_some() {
                                NoticeKind::UpdateFailed
                            } else {
                                NoticeKind::CreateFailed
                            };
                            app.show_notice(&Notice::from_error(kind, &err));
                        }
                    }
                }
            },
            TaskResult::Deleted { ticket, result } => {
                if let Err(notice) = app.list.settle_delete(ticket, result) {
                    apply_search(app);
                    app.show_notice(&notice);
                }
            }
        }
        self.sync(app);
    }

    /// Fetch the list in the background. Overlapping loads are not
    /// deduplicated; whichever lands last wins.
    pub fn load(&mut self, app: &mut AppState) {
        app.loading = true;
        let store = self.store.clone();
        self.spawn(async move { TaskResult::Loaded(store.list().await) });
    }

    /// Optimistically drop `id` from the list and confirm with the server.
    pub fn delete(&mut self, app: &mut AppState, id: UserId) {
        match app.list.begin_delete(id) {
            Ok(ticket) => {
                apply_search(app);
                let store = self.store.clone();
                self.spawn(async move {
                    let result = store.delete(id).await;
                    TaskResult::Deleted { ticket, result }
                });
            }
            Err(err) => app.show_notice(&Notice::from_error(NoticeKind::DeleteFailed, &err)),
        }
    }

    /// Send the open form. The form stays up, read-only, until the answer lands.
    pub fn commit(&mut self, app: &mut AppState, mut session: EditSession, focus: Field) {
        match session.begin(&mut app.list) {
            Ok(request) => {
                let target = session.target_id();
                app.open_modal(ModalState::Form { session, focus });
                let store = self.store.clone();
                self.spawn(async move {
                    let result = request.send(store.as_ref()).await;
                    TaskResult::Committed { target, result }
                });
            }
            Err(notice) => {
                app.open_modal(ModalState::Form { session, focus });
                app.show_notice(&notice);
            }
        }
    }

    pub fn handle_key(&mut self, app: &mut AppState, key: KeyEvent) -> Flow {
        match app.input_mode {
            InputMode::Normal => return self.handle_normal_key(app, key),
            InputMode::Search => handle_search_key(app, key.code),
            InputMode::Modal => self.handle_modal_key(app, key.code),
        }
        Flow::Continue
    }

    fn handle_normal_key(&mut self, app: &mut AppState, key: KeyEvent) -> Flow {
        let Some(action) = app.keymap.resolve(&key) else {
            return Flow::Continue;
        };
        match action {
            KeyAction::Quit => return Flow::Quit,
            KeyAction::OpenHelp => app.open_modal(ModalState::Help),
            KeyAction::StartSearch => app.input_mode = InputMode::Search,
            KeyAction::NewUser => app.open_modal(ModalState::Form {
                session: EditSession::open_create(),
                focus: Field::Name,
            }),
            KeyAction::EditSelection => {
                if let Some(user) = app.selected_user() {
                    let session = EditSession::open_edit(user);
                    app.open_modal(ModalState::Form {
                        session,
                        focus: Field::Name,
                    });
                }
            }
            KeyAction::DeleteSelection => {
                if let Some(user) = app.selected_user() {
                    let modal = ModalState::DeleteConfirm {
                        id: user.id,
                        name: user.name.clone(),
                        selected: 1,
                    };
                    app.open_modal(modal);
                }
            }
            KeyAction::Reload => self.load(app),
            KeyAction::MoveUp => {
                app.selected_user_index = app.selected_user_index.saturating_sub(1);
            }
            KeyAction::MoveDown => {
                if app.selected_user_index + 1 < app.users.len() {
                    app.selected_user_index += 1;
                }
            }
            KeyAction::PageUp => {
                let rpp = app.rows_per_page.max(1);
                app.selected_user_index = app.selected_user_index.saturating_sub(rpp);
            }
            KeyAction::PageDown => {
                let rpp = app.rows_per_page.max(1);
                let new_idx = app.selected_user_index.saturating_add(rpp);
                app.selected_user_index = new_idx.min(app.users.len().saturating_sub(1));
            }
            KeyAction::Ignore => {}
        }
        Flow::Continue
    }

    fn handle_modal_key(&mut self, app: &mut AppState, code: KeyCode) {
        let Some(modal) = app.modal.take() else {
            app.input_mode = InputMode::Normal;
            return;
        };
        match modal {
            ModalState::Help => match code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q') => {
                    app.close_modal()
                }
                _ => app.modal = Some(ModalState::Help),
            },
            ModalState::Info { message, back } => match code {
                KeyCode::Esc | KeyCode::Enter => match back {
                    Some(prev) => app.open_modal(*prev),
                    None => app.close_modal(),
                },
                _ => app.modal = Some(ModalState::Info { message, back }),
            },
            ModalState::DeleteConfirm { id, name, selected } => match code {
                KeyCode::Esc | KeyCode::Char('n') => app.close_modal(),
                KeyCode::Char('y') => {
                    app.close_modal();
                    self.delete(app, id);
                }
                KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                    let selected = if selected == 0 { 1 } else { 0 };
                    app.modal = Some(ModalState::DeleteConfirm { id, name, selected });
                }
                KeyCode::Enter => {
                    app.close_modal();
                    if selected == 0 {
                        self.delete(app, id);
                    }
                }
                _ => app.modal = Some(ModalState::DeleteConfirm { id, name, selected }),
            },
            ModalState::Form { mut session, focus } => {
                if session.is_saving() {
                    app.modal = Some(ModalState::Form { session, focus });
                    return;
                }
                match code {
                    KeyCode::Esc => {
                        session.cancel();
                        app.close_modal();
                    }
                    KeyCode::Enter => self.commit(app, session, focus),
                    KeyCode::Tab | KeyCode::Down => {
                        let focus = next_field(focus);
                        app.modal = Some(ModalState::Form { session, focus });
                    }
                    KeyCode::BackTab | KeyCode::Up => {
                        let focus = prev_field(focus);
                        app.modal = Some(ModalState::Form { session, focus });
                    }
                    KeyCode::Backspace => {
                        let mut value = session.draft().get(focus).to_string();
                        value.pop();
                        session.set_field(focus, value);
                        app.modal = Some(ModalState::Form { session, focus });
                    }
                    KeyCode::Char(c) => {
                        let value = format!("{}{}", session.draft().get(focus), c);
                        session.set_field(focus, value);
                        app.modal = Some(ModalState::Form { session, focus });
                    }
                    _ => app.modal = Some(ModalState::Form { session, focus }),
                }
            }
        }
    }
}

/// Pull the form out of the open dialog, looking through every notice
/// stacked over it. The notices stay open.
fn take_form(modal: &mut Option<ModalState>) -> Option<(EditSession, Field)> {
    match modal.take() {
        Some(ModalState::Form { session, focus }) => Some((session, focus)),
        Some(ModalState::Info { message, back }) => {
            let mut below = back.map(|b| *b);
            let form = take_form(&mut below);
            *modal = Some(ModalState::Info {
                message,
                back: below.map(Box::new),
            });
            form
        }
        other => {
            *modal = other;
            None
        }
    }
}

/// Return `form` to the bottom of a notice stack. Any other open dialog
/// is left alone.
fn put_back_form(modal: &mut Option<ModalState>, form: ModalState) {
    if let Some(ModalState::Info { back, .. }) = modal {
        let mut below = back.take().map(|b| *b);
        put_back_form(&mut below, form);
        *back = below.map(Box::new);
    } else if modal.is_none() {
        *modal = Some(form);
    } else {
        warn!("form dropped under a non-notice dialog");
    }
}

fn handle_search_key(app: &mut AppState, code: KeyCode) {
    match code {
        KeyCode::Enter => app.input_mode = InputMode::Normal,
        KeyCode::Esc => {
            app.search_query.clear();
            apply_search(app);
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            app.search_query.pop();
            apply_search(app);
        }
        KeyCode::Char(c) => {
            app.search_query.push(c);
            apply_search(app);
        }
        _ => {}
    }
}

fn next_field(focus: Field) -> Field {
    let i = Field::ALL.iter().position(|f| *f == focus).unwrap_or(0);
    Field::ALL[(i + 1) % Field::ALL.len()]
}

fn prev_field(focus: Field) -> Field {
    let i = Field::ALL.iter().position(|f| *f == focus).unwrap_or(0);
    Field::ALL[(i + Field::ALL.len() - 1) % Field::ALL.len()]
}

pub async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut app: AppState,
    store: Arc<dyn UserStore>,
) -> Result<()> {
    let mut dispatcher = Dispatcher::new(store);
    dispatcher.load(&mut app);
    info!(source = %app.source, "event loop started");

    loop {
        dispatcher.poll_results(&mut app);

        terminal
            .draw(|f| {
                ui::render(f, &mut app);
            })
            .context("drawing frame")?;

        if event::poll(TICK)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && dispatcher.handle_key(&mut app, key) == Flow::Quit
        {
            break;
        }
    }

    info!(uptime_s = app.started_at.elapsed().as_secs(), "event loop finished");
    Ok(())
}
