//! Problem generation
//!
//! Produces one [`MathProblem`] from a [`ProblemConfig`]. The shape of a problem
//! is fixed by the operation; only the values are random. Division problems are
//! built from their factors so that the quotient is always an exact integer.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::domain::{format_number, MathProblem, NumericRange, Operation, ProblemConfig};
use crate::error::{PracticeError, PracticeResult};

/// Operators multi-step problems are built from
pub const MULTI_STEP_PALETTE: [Operation; 3] = [
    Operation::Addition,
    Operation::Subtraction,
    Operation::Multiplication,
];

/// Smallest base a percentage problem uses
const PERCENT_BASE_MIN: i64 = 10;
const PERCENT_MIN: i64 = 5;
const PERCENT_MAX: i64 = 100;

/// Generate a problem using the thread-local random source
pub fn generate(config: &ProblemConfig) -> PracticeResult<MathProblem> {
    generate_with(config, &mut rand::rng())
}

/// Generate `count` problems up front
pub fn generate_batch(config: &ProblemConfig, count: usize) -> PracticeResult<Vec<MathProblem>> {
    let mut rng = rand::rng();
    (0..count).map(|_| generate_with(config, &mut rng)).collect()
}

/// Generate a problem from an explicit random source
pub fn generate_with<R: Rng + ?Sized>(
    config: &ProblemConfig,
    rng: &mut R,
) -> PracticeResult<MathProblem> {
    let range = config.range();
    if range.min > range.max {
        return Err(PracticeError::invalid_config(format!(
            "range minimum {} exceeds maximum {}",
            range.min, range.max
        )));
    }

    if config.multi_step {
        let draft = multi_step(range, rng);
        return Ok(finish(config, config.operation, draft));
    }

    let operation = if config.mixed_operations {
        Operation::ALL[rng.random_range(0..Operation::ALL.len())]
    } else {
        config.operation
    };

    let draft = match operation {
        Operation::Addition => addition(config, range, rng),
        Operation::Subtraction => subtraction(config, range, rng),
        Operation::Multiplication => multiplication(config, range, rng),
        Operation::Division => division(range, rng)?,
        Operation::Percentage => percentage(range, rng)?,
    };

    Ok(finish(config, operation, draft))
}

/// Generated values before id/timestamp are attached
struct Draft {
    expression: String,
    display_expression: String,
    answer: f64,
    operands: Vec<f64>,
    multi_step: bool,
}

impl Draft {
    fn binary(a: f64, op: Operation, b: f64, answer: f64) -> Self {
        Self {
            expression: format!("{} {} {}", format_number(a), op.symbol(), format_number(b)),
            display_expression: format!("{} {} {}", format_number(a), op.glyph(), format_number(b)),
            answer,
            operands: vec![a, b],
            multi_step: false,
        }
    }
}

fn finish(config: &ProblemConfig, operation: Operation, draft: Draft) -> MathProblem {
    MathProblem {
        id: Uuid::new_v4().to_string(),
        operation,
        difficulty: config.difficulty,
        expression: draft.expression,
        display_expression: draft.display_expression,
        answer: draft.answer,
        operands: draft.operands,
        multi_step: draft.multi_step,
        time_generated: Utc::now(),
    }
}

fn draw<R: Rng + ?Sized>(range: NumericRange, rng: &mut R) -> f64 {
    rng.random_range(range.min..=range.max) as f64
}

/// Draw with one decimal place inside the range
fn draw_tenths<R: Rng + ?Sized>(range: NumericRange, rng: &mut R) -> f64 {
    let lo = range.min.saturating_mul(10);
    let hi = range.max.saturating_mul(10);
    rng.random_range(lo..=hi) as f64 / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn addition<R: Rng + ?Sized>(config: &ProblemConfig, range: NumericRange, rng: &mut R) -> Draft {
    let (a, b) = if config.include_decimals {
        (draw_tenths(range, rng), draw_tenths(range, rng))
    } else {
        (draw(range, rng), draw(range, rng))
    };
    Draft::binary(a, Operation::Addition, b, round2(a + b))
}

fn subtraction<R: Rng + ?Sized>(config: &ProblemConfig, range: NumericRange, rng: &mut R) -> Draft {
    let (mut a, mut b) = if config.include_decimals {
        (draw_tenths(range, rng), draw_tenths(range, rng))
    } else {
        (draw(range, rng), draw(range, rng))
    };
    if !config.include_negatives && a < b {
        std::mem::swap(&mut a, &mut b);
    }
    Draft::binary(a, Operation::Subtraction, b, round2(a - b))
}

fn multiplication<R: Rng + ?Sized>(
    config: &ProblemConfig,
    range: NumericRange,
    rng: &mut R,
) -> Draft {
    let a = if config.include_decimals {
        draw_tenths(range, rng)
    } else {
        draw(range, rng)
    };
    let b = draw(range, rng);
    Draft::binary(a, Operation::Multiplication, b, round2(a * b))
}

fn division<R: Rng + ?Sized>(range: NumericRange, rng: &mut R) -> PracticeResult<Draft> {
    let divisor_min = range.min.max(1);
    // Largest divisor that still leaves room for a quotient >= range.min
    let divisor_max = if range.min >= 1 {
        range.max.div_euclid(range.min)
    } else {
        range.max.max(1)
    };
    if divisor_max < divisor_min {
        return Err(PracticeError::invalid_config(format!(
            "division range [{}, {}] has no valid divisor",
            range.min, range.max
        )));
    }

    let divisor = rng.random_range(divisor_min..=divisor_max);
    let quotient = rng.random_range(range.min..=range.max.div_euclid(divisor));
    let dividend = divisor * quotient;

    Ok(Draft::binary(
        dividend as f64,
        Operation::Division,
        divisor as f64,
        quotient as f64,
    ))
}

fn percentage<R: Rng + ?Sized>(range: NumericRange, rng: &mut R) -> PracticeResult<Draft> {
    if range.max < PERCENT_BASE_MIN {
        return Err(PracticeError::invalid_config(format!(
            "percentage problems need a range maximum of at least {}, got {}",
            PERCENT_BASE_MIN, range.max
        )));
    }
    let base = rng.random_range(PERCENT_BASE_MIN..=range.max);
    let percent = rng.random_range(PERCENT_MIN..=PERCENT_MAX);
    let answer = (base as f64 * percent as f64 / 100.0).round();
    let text = format!("{}% of {}", percent, base);

    Ok(Draft {
        expression: text.clone(),
        display_expression: text,
        answer,
        operands: vec![base as f64, percent as f64],
        multi_step: false,
    })
}

fn multi_step<R: Rng + ?Sized>(range: NumericRange, rng: &mut R) -> Draft {
    let operands = [draw(range, rng), draw(range, rng), draw(range, rng)];
    let ops = [
        MULTI_STEP_PALETTE[rng.random_range(0..MULTI_STEP_PALETTE.len())],
        MULTI_STEP_PALETTE[rng.random_range(0..MULTI_STEP_PALETTE.len())],
    ];

    let [a, b, c] = operands.map(format_number);
    Draft {
        expression: format!("{} {} {} {} {}", a, ops[0].symbol(), b, ops[1].symbol(), c),
        display_expression: format!("{} {} {} {} {}", a, ops[0].glyph(), b, ops[1].glyph(), c),
        answer: evaluate_chain(operands, ops),
        operands: operands.to_vec(),
        multi_step: true,
    }
}

/// Value of `a op0 b op1 c` with multiplication binding tighter than +/-
fn evaluate_chain(operands: [f64; 3], ops: [Operation; 2]) -> f64 {
    let [a, b, c] = operands;
    if ops[1] == Operation::Multiplication && ops[0] != Operation::Multiplication {
        apply(ops[0], a, b * c)
    } else {
        apply(ops[1], apply(ops[0], a, b), c)
    }
}

fn apply(op: Operation, lhs: f64, rhs: f64) -> f64 {
    match op {
        Operation::Addition => lhs + rhs,
        Operation::Subtraction => lhs - rhs,
        Operation::Multiplication => lhs * rhs,
        Operation::Division => lhs / rhs,
        Operation::Percentage => lhs * rhs / 100.0,
    }
}
