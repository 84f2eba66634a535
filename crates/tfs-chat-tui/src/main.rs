use std::time::Duration;
use anyhow::{Context, Result};
use tfs_chat_core::Config;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const LOG_FILE_NAME: &str = "tfs-chat.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());
    init_file_logging(&config)?;

    let mut app = App::new(&config)?;
    app.refresh_status().await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(Duration::from_millis(300));

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        tracing::error!(error = %e, "chat client exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

/// The terminal belongs to the UI, so logs go to a file in the data directory.
fn init_file_logging(config: &Config) -> Result<()> {
    let dir = config.data_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory '{}'", dir.display()))?;

    let log_path = dir.join(LOG_FILE_NAME);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    let default_level = config.log_level();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}
