use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_STORAGE: &str = "storage.json";

/// Local to-do list manager.
#[derive(Parser, Debug)]
#[command(name = "todo", version, about = "Keep a to-do list in a local JSON file")]
pub struct Cli {
    /// JSON file holding the task list.
    #[arg(long, env = "TODO_STORAGE", default_value = DEFAULT_STORAGE)]
    pub storage: PathBuf,

    /// Write logs here (filtered by RUST_LOG); logging is off otherwise.
    #[arg(long, env = "TODO_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage_path: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            storage_path: cli.storage,
            log_file: cli.log_file,
        }
    }
}
