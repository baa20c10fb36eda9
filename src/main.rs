//! usrapi-manager binary entry point.
//!
//! Parses configuration, sets up logging and the user store, runs the TUI
//! event loop, and restores the terminal state on exit.
//!
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::sync::Arc;
use std::time::Duration;

use usrapi_manager::Result;
use usrapi_manager::api::{HttpUserStore, MemoryUserStore, UserStore};
use usrapi_manager::app::keymap::Keymap;
use usrapi_manager::app::{self, AppState, Theme};
use usrapi_manager::config::Cli;
use usrapi_manager::error::Context;
use usrapi_manager::logging;

/// Initialize a Crossterm-backed `ratatui` terminal in raw mode.
fn init_terminal() -> std::io::Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn build_store(cli: &Cli) -> Result<Arc<dyn UserStore>> {
    if cli.offline {
        let store = MemoryUserStore::seeded().with_latency(Duration::from_millis(300));
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(HttpUserStore::new(&cli.store_config()?)?))
}

/// Program entry point: run the TUI and report any top-level error to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_file)?;

    let store = build_store(&cli)?;
    let app = AppState::new(
        Theme::load_or_init(&cli.theme),
        Keymap::load_or_init(&cli.keybinds),
        cli.source_label(),
    );

    let mut terminal = init_terminal().with_ctx(|| "init terminal".to_string())?;

    let res = app::run(&mut terminal, app, store).await;

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    if let Err(err) = res {
        tracing::error!(error = %format!("{err:#}"), "application error");
        eprintln!("application error: {err:#}");
    }
    Ok(())
}
