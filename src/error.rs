//! Error taxonomy for the practice core
//!
//! Generation and validation failures are raised synchronously. Storage and
//! speech failures cross the persistence/audio boundary and are reported
//! without touching in-memory session state.

/// Errors surfaced by the generator, the session state machine and `save_results`
#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage failure: {0:#}")]
    StorageFailure(anyhow::Error),

    #[error("Speech unavailable: {0}")]
    SpeechUnavailable(String),
}

impl PracticeError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

pub type PracticeResult<T> = Result<T, PracticeError>;
