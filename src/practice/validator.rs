//! Answer validation

/// Tolerance used when none is given
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// True iff `submitted` is within `tolerance` of `expected`. NaN never matches.
pub fn is_correct(submitted: f64, expected: f64, tolerance: f64) -> bool {
    (submitted - expected).abs() <= tolerance
}

/// [`is_correct`] with [`DEFAULT_TOLERANCE`]
pub fn check_answer(submitted: f64, expected: f64) -> bool {
    is_correct(submitted, expected, DEFAULT_TOLERANCE)
}

/// Parse user input as a number.
///
/// Accepts surrounding whitespace, the typographic minus and a comma decimal separator.
pub fn parse_answer(text: &str) -> Option<f64> {
    let normalized = text.trim().replace('−', "-").replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_boundary() {
        assert!(check_answer(10.0, 10.0));
        assert!(check_answer(10.005, 10.0));
        assert!(!check_answer(10.02, 10.0));
        assert!(is_correct(10.5, 10.0, 0.5));
    }

    #[test]
    fn test_symmetric_and_reflexive() {
        for (a, b) in [(1.0, 1.004), (3.3, 3.31), (-2.0, 2.0), (0.0, 0.0)] {
            assert_eq!(check_answer(a, b), check_answer(b, a));
            assert!(check_answer(a, a));
        }
    }

    #[test]
    fn test_idempotent() {
        let first = check_answer(41.99, 42.0);
        let second = check_answer(41.99, 42.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nan_never_validates() {
        assert!(!check_answer(f64::NAN, 1.0));
        assert!(!check_answer(f64::NAN, f64::NAN));
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer(" 42 "), Some(42.0));
        assert_eq!(parse_answer("−7"), Some(-7.0));
        assert_eq!(parse_answer("2,5"), Some(2.5));
        assert_eq!(parse_answer("abc"), None);
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("inf"), None);
    }
}
