//! Configuration loading and management

mod io;
mod settings;

pub use settings::{AudioSettings, PracticeDefaults, ServerSettings, SessionSettings, StorageSettings};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::practice::SessionTiming;

/// Main configuration structure (`~/.mathdrill/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Defaults for new practice sessions
    #[serde(default)]
    pub practice: PracticeDefaults,

    /// Session pacing
    #[serde(default)]
    pub session: SessionSettings,

    /// REST server
    #[serde(default)]
    pub server: ServerSettings,

    /// Speech backend
    #[serde(default)]
    pub audio: AudioSettings,

    /// Progress database location
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Config {
    /// Timer delays for the session state machine
    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            advance_delay_ms: self.session.advance_delay_ms,
            audio_advance_delay_ms: self.session.audio_advance_delay_ms,
            dictation_delay_ms: self.session.dictation_delay_ms,
            ..SessionTiming::default()
        }
    }

    /// Resolved database path
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("progress.db"))
    }

    /// `bind:port` for the REST server
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
