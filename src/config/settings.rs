//! Settings sections of `config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::{Difficulty, Operation, PracticeMode};

/// Defaults for `mathdrill practice` when flags are omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeDefaults {
    #[serde(default = "default_operation")]
    pub operation: Operation,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[serde(default)]
    pub mode: PracticeMode,

    /// Problems generated per session
    #[serde(default = "default_session_length")]
    pub session_length: usize,

    /// Seconds, timed mode only
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,

    #[serde(default)]
    pub include_decimals: bool,

    #[serde(default)]
    pub include_negatives: bool,

    #[serde(default)]
    pub multi_step: bool,

    #[serde(default)]
    pub mixed_operations: bool,
}

fn default_operation() -> Operation {
    Operation::Addition
}

fn default_session_length() -> usize {
    10
}

fn default_time_limit() -> u32 {
    60
}

impl Default for PracticeDefaults {
    fn default() -> Self {
        Self {
            operation: default_operation(),
            difficulty: Difficulty::default(),
            mode: PracticeMode::default(),
            session_length: default_session_length(),
            time_limit: default_time_limit(),
            include_decimals: false,
            include_negatives: false,
            multi_step: false,
            mixed_operations: false,
        }
    }
}

/// Pacing of the session's delayed transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Feedback display time before the next problem
    #[serde(default = "default_advance_delay_ms")]
    pub advance_delay_ms: u64,

    /// Same, in audio mode (spoken feedback needs longer)
    #[serde(default = "default_audio_advance_delay_ms")]
    pub audio_advance_delay_ms: u64,

    /// Pause before a problem is read aloud
    #[serde(default = "default_dictation_delay_ms")]
    pub dictation_delay_ms: u64,
}

fn default_advance_delay_ms() -> u64 {
    1500
}

fn default_audio_advance_delay_ms() -> u64 {
    2000
}

fn default_dictation_delay_ms() -> u64 {
    500
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            advance_delay_ms: default_advance_delay_ms(),
            audio_advance_delay_ms: default_audio_advance_delay_ms(),
            dictation_delay_ms: default_dictation_delay_ms(),
        }
    }
}

/// REST server binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Text-to-speech backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// TTS binary to use instead of the platform default (`say` / `espeak`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_command: Option<String>,
}

/// Where progress is stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Defaults to `~/.mathdrill/progress.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}
