use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Difficulty, NumericRange, Operation};

/// Input to problem generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemConfig {
    pub operation: Operation,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub include_decimals: bool,
    #[serde(default)]
    pub include_negatives: bool,
    #[serde(default)]
    pub multi_step: bool,
    #[serde(default)]
    pub mixed_operations: bool,
    #[serde(default)]
    pub custom_range: Option<NumericRange>,
}

impl ProblemConfig {
    pub fn new(operation: Operation, difficulty: Difficulty) -> Self {
        Self {
            operation,
            difficulty,
            include_decimals: false,
            include_negatives: false,
            multi_step: false,
            mixed_operations: false,
            custom_range: None,
        }
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.custom_range = Some(NumericRange::new(min, max));
        self
    }

    /// Range operands are drawn from: the custom range if set, else the difficulty default
    pub fn range(&self) -> NumericRange {
        self.custom_range
            .unwrap_or_else(|| self.difficulty.default_range())
    }
}

/// A generated problem. Never mutated after generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MathProblem {
    pub id: String,
    pub operation: Operation,
    pub difficulty: Difficulty,
    /// Canonical expression using `+ - * /`, evaluable with standard precedence
    pub expression: String,
    /// Expression for display, using typographic glyphs
    pub display_expression: String,
    pub answer: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<f64>,
    #[serde(default)]
    pub multi_step: bool,
    pub time_generated: DateTime<Utc>,
}

/// Format a number the way problems show it: integers without a fraction,
/// everything else with at most two decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.25), "1.25");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_config_range_prefers_custom() {
        let config = ProblemConfig::new(Operation::Division, Difficulty::Expert);
        assert_eq!(config.range(), NumericRange::new(1, 10000));
        let config = config.with_range(2, 12);
        assert_eq!(config.range(), NumericRange::new(2, 12));
    }

    #[test]
    fn test_config_deserializes_camel_case_with_defaults() {
        let config: ProblemConfig = serde_json::from_str(
            r#"{"operation":"addition","difficulty":"beginner","multiStep":true,"customRange":{"min":1,"max":5}}"#,
        )
        .unwrap();
        assert!(config.multi_step);
        assert!(!config.include_decimals);
        assert_eq!(config.custom_range, Some(NumericRange::new(1, 5)));
    }
}
