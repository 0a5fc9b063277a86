//! CLI command implementations

pub mod achievements;
pub mod data;
pub mod init;
pub mod practice;
pub mod serve;
pub mod settings;
pub mod stats;

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use mathdrill::config::Config;
use mathdrill::stats::ProgressStore;

/// Configuration and storage location shared by every command
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
}

impl AppContext {
    /// Load the config (creating it on first run) and resolve the database path.
    /// `--db` wins over `[storage] database_path`.
    pub fn load(config_override: Option<PathBuf>, db_override: Option<PathBuf>) -> Result<Self> {
        let config_path = config_override.unwrap_or_else(Config::global_config_path);
        let config = Config::load_from(&config_path)?;
        let db_path = db_override.unwrap_or_else(|| config.database_path());
        Ok(Self {
            config,
            config_path,
            db_path,
        })
    }

    pub fn open_store(&self) -> Result<ProgressStore> {
        ProgressStore::with_path(&self.db_path)
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
