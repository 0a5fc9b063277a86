use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PracticeError;

/// Arithmetic operation a problem exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Percentage,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
        Operation::Percentage,
    ];

    /// Storage / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
            Self::Multiplication => "multiplication",
            Self::Division => "division",
            Self::Percentage => "percentage",
        }
    }

    /// Operator used in the canonical (evaluable) expression
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Subtraction => "-",
            Self::Multiplication => "*",
            Self::Division => "/",
            Self::Percentage => "%",
        }
    }

    /// Typographic operator used in the display expression
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Subtraction => "−",
            Self::Multiplication => "×",
            Self::Division => "÷",
            Self::Percentage => "%",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Addition => "Addition",
            Self::Subtraction => "Subtraction",
            Self::Multiplication => "Multiplication",
            Self::Division => "Division",
            Self::Percentage => "Percentage",
        }
    }
}

impl FromStr for Operation {
    type Err = PracticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "addition" | "add" | "+" => Ok(Self::Addition),
            "subtraction" | "subtract" | "sub" | "-" => Ok(Self::Subtraction),
            "multiplication" | "multiply" | "mul" | "*" => Ok(Self::Multiplication),
            "division" | "divide" | "div" | "/" => Ok(Self::Division),
            "percentage" | "percent" | "%" => Ok(Self::Percentage),
            other => Err(PracticeError::invalid_config(format!(
                "unrecognized operation '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive numeric range operands are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: i64,
    pub max: i64,
}

impl NumericRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

/// Difficulty tier, each mapping to a default operand range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
        Difficulty::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }

    pub fn default_range(&self) -> NumericRange {
        match self {
            Self::Beginner => NumericRange::new(1, 10),
            Self::Intermediate => NumericRange::new(1, 100),
            Self::Advanced => NumericRange::new(1, 1000),
            Self::Expert => NumericRange::new(1, 10000),
        }
    }
}

impl FromStr for Difficulty {
    type Err = PracticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "expert" => Ok(Self::Expert),
            other => Err(PracticeError::invalid_config(format!(
                "unrecognized difficulty '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Practice session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    Timed,
    #[default]
    Accuracy,
    Audio,
}

impl PracticeMode {
    pub const ALL: [PracticeMode; 3] = [PracticeMode::Timed, PracticeMode::Accuracy, PracticeMode::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timed => "timed",
            Self::Accuracy => "accuracy",
            Self::Audio => "audio",
        }
    }
}

impl FromStr for PracticeMode {
    type Err = PracticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timed" => Ok(Self::Timed),
            "accuracy" => Ok(Self::Accuracy),
            "audio" => Ok(Self::Audio),
            other => Err(PracticeError::invalid_config(format!(
                "unrecognized mode '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse_roundtrip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!(matches!(
            "modulo".parse::<Operation>(),
            Err(PracticeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_difficulty_default_ranges() {
        assert_eq!(Difficulty::Beginner.default_range(), NumericRange::new(1, 10));
        assert_eq!(Difficulty::Intermediate.default_range(), NumericRange::new(1, 100));
        assert_eq!(Difficulty::Advanced.default_range(), NumericRange::new(1, 1000));
        assert_eq!(Difficulty::Expert.default_range(), NumericRange::new(1, 10000));
    }

    #[test]
    fn test_serde_names_are_lowercase() {
        let json = serde_json::to_string(&PracticeMode::Timed).unwrap();
        assert_eq!(json, "\"timed\"");
        let op: Operation = serde_json::from_str("\"percentage\"").unwrap();
        assert_eq!(op, Operation::Percentage);
    }
}
