mod config;
mod error;
mod menu;
mod prompt;
mod task;
mod todo_manager;
mod ui;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{Cli, Config};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::File, io, path::Path, sync::Mutex};
use todo_manager::TodoManager;
use tracing_subscriber::EnvFilter;
use ui::App;

fn main() -> Result<()> {
    let config = Config::from(Cli::parse());

    if let Some(log_file) = &config.log_file {
        install_tracing(log_file)?;
    }

    let manager = TodoManager::open(&config.storage_path)
        .with_context(|| format!("failed to open {}", config.storage_path.display()))?;
    let mut app = App::new(manager);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.context("terminal UI failed")?;
    println!("Bye!");
    Ok(())
}

/// The UI owns the terminal, so logs only ever go to a file.
fn install_tracing(path: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_tracing_install_is_an_error() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("todo.log");
        install_tracing(&log).unwrap();
        assert!(log.exists());

        let err = install_tracing(&log).unwrap_err();
        assert!(err.to_string().contains("failed to install tracing subscriber"));
    }
}
