use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::expression::{Bindings, Expression};
use super::{format_number, pattern, tidy};
use crate::capability::{string_param, Capability, CapabilityDescriptor, CapabilityError};

const EPSILON: f64 = 1e-9;

/// Solves equations in `x` of degree at most two
#[derive(Debug)]
pub struct EquationSolver {
    prefixes: Vec<Regex>,
    equation: Option<Regex>,
    add_form: Option<Regex>,
    sub_form: Option<Regex>,
    scale_form: Option<Regex>,
}

impl Default for EquationSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// `a x^2 + b x + c`, recovered numerically
#[derive(Debug, Clone, Copy, PartialEq)]
struct Quadratic {
    a: f64,
    b: f64,
    c: f64,
}

impl Quadratic {
    fn at(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }
}

impl EquationSolver {
    pub const NAME: &'static str = "equation_solver";

    pub fn new() -> Self {
        Self {
            prefixes: [
                r"(?i)solve\s*:?\s*",
                r"(?i)equation\s*:?\s*",
                r"(?i)find\s+x\s+in\s+",
            ]
            .iter()
            .filter_map(|p| pattern(p))
            .collect(),
            equation: pattern(r"([^=]+=[^=]+)"),
            add_form: pattern(r"^\s*(\d+)\s*x\s*\+\s*(\d+)\s*=\s*(\d+)\s*$"),
            sub_form: pattern(r"^\s*(\d+)\s*x\s*-\s*(\d+)\s*=\s*(\d+)\s*$"),
            scale_form: pattern(r"^\s*(\d+)\s*x\s*=\s*(\d+)\s*$"),
        }
    }

    /// Strip command words and keep the `lhs = rhs` part
    pub fn clean_equation(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for prefix in &self.prefixes {
            cleaned = prefix.replace_all(&cleaned, "").into_owned();
        }
        let equation = match self.equation.as_ref().and_then(|re| re.find(&cleaned)) {
            Some(m) => m.as_str(),
            None => cleaned.as_str(),
        };
        strip_leading_words(equation)
            .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.') || c.is_whitespace())
            .to_string()
    }

    /// `ax + b = c`, `ax - b = c` and `ax = c` with explanatory steps
    fn solve_simple_linear(&self, equation: &str) -> Option<String> {
        let ints = |caps: &regex::Captures<'_>, i: usize| caps[i].parse::<i64>().ok();

        if let Some(caps) = self.add_form.as_ref().and_then(|re| re.captures(equation)) {
            let (a, b, c) = (ints(&caps, 1)?, ints(&caps, 2)?, ints(&caps, 3)?);
            if a == 0 {
                return None;
            }
            let diff = c.checked_sub(b)?;
            let x = format_number(tidy(diff as f64 / a as f64));
            return Some(format!(
                "x = {x}\n\nSteps:\n\
                 Starting with the equation: {a}x + {b} = {c}\n\
                 Subtract {b} from both sides: {a}x = {c} - {b} = {diff}\n\
                 Divide both sides by {a}: x = {diff}/{a} = {x}"
            ));
        }

        if let Some(caps) = self.sub_form.as_ref().and_then(|re| re.captures(equation)) {
            let (a, b, c) = (ints(&caps, 1)?, ints(&caps, 2)?, ints(&caps, 3)?);
            if a == 0 {
                return None;
            }
            // Out-of-range sums fall through to the numeric solver
            let sum = c.checked_add(b)?;
            let x = format_number(tidy(sum as f64 / a as f64));
            return Some(format!(
                "x = {x}\n\nSteps:\n\
                 Starting with the equation: {a}x - {b} = {c}\n\
                 Add {b} to both sides: {a}x = {c} + {b} = {sum}\n\
                 Divide both sides by {a}: x = {sum}/{a} = {x}"
            ));
        }

        if let Some(caps) = self.scale_form.as_ref().and_then(|re| re.captures(equation)) {
            let (a, c) = (ints(&caps, 1)?, ints(&caps, 2)?);
            if a == 0 {
                return None;
            }
            let x = format_number(tidy(c as f64 / a as f64));
            return Some(format!(
                "x = {x}\n\nSteps:\n\
                 Starting with the equation: {a}x = {c}\n\
                 Divide both sides by {a}: x = {c}/{a} = {x}"
            ));
        }

        None
    }

    /// Fit `lhs - rhs` to a quadratic and check the fit away from the sample points
    fn fit(&self, equation: &str) -> Result<Quadratic, CapabilityError> {
        let (lhs, rhs) = equation.split_once('=').unwrap_or((equation, "0"));
        let parse = |side: &str| {
            Expression::parse(side).map_err(|e| {
                CapabilityError::execution(
                    Self::NAME,
                    format!("Could not read equation '{}': {}", equation, e),
                )
            })
        };
        let (lhs, rhs) = (parse(lhs)?, parse(rhs)?);
        if lhs.uses('y') || rhs.uses('y') {
            return Err(CapabilityError::execution(
                Self::NAME,
                "Only equations in the single variable x are supported",
            ));
        }

        let f = |x: f64| -> Result<f64, CapabilityError> {
            let value = lhs
                .eval(Bindings::x(x))
                .and_then(|l| rhs.eval(Bindings::x(x)).map(|r| l - r))
                .map_err(|e| {
                    CapabilityError::execution(
                        Self::NAME,
                        format!("Could not evaluate '{}': {}", equation, e),
                    )
                })?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(CapabilityError::execution(
                    Self::NAME,
                    format!("'{}' is undefined near x = {}", equation, x),
                ))
            }
        };

        let (f_neg, f_zero, f_pos) = (f(-1.0)?, f(0.0)?, f(1.0)?);
        let fitted = Quadratic {
            a: (f_pos + f_neg) / 2.0 - f_zero,
            b: (f_pos - f_neg) / 2.0,
            c: f_zero,
        };

        for probe in [2.0, -2.0, 3.0, 0.5, -7.5] {
            let actual = f(probe)?;
            let tolerance = EPSILON * actual.abs().max(1.0) * 1e3;
            if (actual - fitted.at(probe)).abs() > tolerance {
                return Err(CapabilityError::execution(
                    Self::NAME,
                    "Only polynomial equations in x up to degree two can be solved",
                ));
            }
        }
        Ok(fitted)
    }

    fn solve_numeric(&self, equation: &str) -> Result<String, CapabilityError> {
        let Quadratic { a, b, c } = self.fit(equation)?;

        if a.abs() < EPSILON {
            if b.abs() < EPSILON {
                return Ok(if c.abs() < EPSILON {
                    "Infinite solutions: the equation holds for every x".to_string()
                } else {
                    "No solution found".to_string()
                });
            }
            return Ok(format!("x = {}", format_number(tidy(-c / b))));
        }

        let discriminant = b * b - 4.0 * a * c;
        if discriminant.abs() < EPSILON {
            return Ok(format!("x = {}", format_number(tidy(-b / (2.0 * a)))));
        }

        if discriminant > 0.0 {
            let root = discriminant.sqrt();
            let mut roots = [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)];
            roots.sort_by(|l, r| l.total_cmp(r));
            return Ok(format!(
                "Multiple solutions: x_1 = {}, x_2 = {}",
                format_number(tidy(roots[0])),
                format_number(tidy(roots[1]))
            ));
        }

        let real = format_number(tidy(-b / (2.0 * a)));
        let imaginary = format_number(tidy(((-discriminant).sqrt() / (2.0 * a)).abs()));
        Ok(format!(
            "Multiple solutions: x_1 = {real} - {imaginary}i, x_2 = {real} + {imaginary}i"
        ))
    }
}

/// Drop leading prose such as "the" or "what is" in front of the maths
fn strip_leading_words(text: &str) -> &str {
    const FUNCTIONS: &[&str] = &["sqrt", "sin", "cos", "tan", "log", "exp", "abs", "pi"];
    let mut rest = text.trim_start();
    while let Some((word, tail)) = rest.split_once(char::is_whitespace) {
        let is_prose = word.chars().count() >= 2
            && word.chars().all(char::is_alphabetic)
            && !FUNCTIONS.contains(&word.to_lowercase().as_str());
        if !is_prose {
            break;
        }
        rest = tail.trim_start();
    }
    rest
}

#[async_trait]
impl Capability for EquationSolver {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: Self::NAME.to_string(),
            description: "Solves mathematical equations in x".to_string(),
            schema: json!({
                "equation": {
                    "type": "string",
                    "description": "Mathematical equation to solve (e.g., '2x + 5 = 11')"
                }
            }),
        }
    }

    async fn execute(&self, params: &Value) -> Result<String, CapabilityError> {
        let input = string_param(Self::NAME, params, "equation")?;
        let equation = self.clean_equation(input);
        if equation.is_empty() {
            return Err(CapabilityError::invalid(Self::NAME, "no equation found"));
        }

        if let Some(solution) = self.solve_simple_linear(&equation) {
            return Ok(solution);
        }
        self.solve_numeric(&equation)
    }
}
