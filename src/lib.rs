//! mathdrill - mental math practice
//!
//! Generates arithmetic problems, runs timed, accuracy and audio practice
//! sessions against a virtual clock, and keeps progress, streaks and
//! achievements in a local SQLite database.
//!
//! ## Layers
//!
//! 1. **Practice core** (`practice`): problem generator, answer validator and
//!    the session state machine. Synchronous and clock-free; time only moves
//!    through `PracticeSession::elapse`.
//!
//! 2. **Progress store** (`stats`): sessions, per-bucket progress, the
//!    achievement engine, settings, export and import.
//!
//! 3. **Surfaces**: the terminal runner (`practice::runner`), speech backends
//!    (`speech`) and the REST mirror (`http_server`).

pub mod config;
pub mod domain;
pub mod error;
pub mod http_server;
pub mod practice;
pub mod speech;
pub mod stats;

pub use domain::*;
pub use error::{PracticeError, PracticeResult};
