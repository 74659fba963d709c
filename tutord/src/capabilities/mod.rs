//! Built-in capabilities used by the subject handlers

pub mod calculator;
pub mod equation_solver;
pub mod expression;
pub mod graphing;
pub mod physics_calculator;
pub mod physics_constants;
pub mod unit_converter;

pub use calculator::Calculator;
pub use equation_solver::EquationSolver;
pub use graphing::Graphing;
pub use physics_calculator::PhysicsCalculator;
pub use physics_constants::PhysicsConstants;
pub use unit_converter::UnitConverter;

use regex::Regex;
use tracing::warn;

/// Integral values print without a fractional part, everything else in shortest form
pub(crate) fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:?}", value)
    }
}

/// `%g`-style formatting with `digits` significant digits
pub(crate) fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{}", value);
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value))
    }
}

fn trim_fraction(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

/// Round away floating point noise such as `2.0000000000000004`
pub(crate) fn tidy(value: f64) -> f64 {
    let rounded = (value * 1e10).round() / 1e10;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Compile a built-in pattern; a pattern that fails to compile simply never matches
pub(crate) fn pattern(source: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(pattern = source, error = %e, "Ignoring invalid pattern");
            None
        }
    }
}
