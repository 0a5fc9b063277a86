//! Core domain types for mathdrill

mod operation;
mod problem;
mod settings;

pub use operation::{Difficulty, NumericRange, Operation, PracticeMode};
pub use problem::{format_number, MathProblem, ProblemConfig};
pub use settings::UserSettings;
