use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::expression::{Bindings, ExprError, Expression};
use super::{format_number, pattern};
use crate::capability::{string_param, Capability, CapabilityDescriptor, CapabilityError};

const WORD_OPERATORS: &[(&str, &str)] = &[
    ("to the power of", "^"),
    ("divided by", "/"),
    ("multiplied by", "*"),
    ("squared", "^2"),
    ("cubed", "^3"),
    ("times", "*"),
    ("plus", "+"),
    ("minus", "-"),
];

/// Evaluates arithmetic found in a natural-language question
#[derive(Debug)]
pub struct Calculator {
    function_rhs: Option<Regex>,
    times_sign: Option<Regex>,
    span: Option<Regex>,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    pub const NAME: &'static str = "calculator";

    pub fn new() -> Self {
        Self {
            function_rhs: pattern(r"f\s*\(\s*x\s*\)\s*=\s*(.+)"),
            times_sign: pattern(r"(\d)\s*[xX]\s*(\d)"),
            span: pattern(
                r"(?:\d+(?:\.\d+)?|\.\d+|\b(?:sqrt|sin|cos|tan|log|exp|abs|pi|e)\b|\*\*|[-+*/^().×÷]|\s)+",
            ),
        }
    }

    /// Pull the arithmetic part out of `text`, e.g. "what is 12 divided by 4?" gives "12 / 4"
    pub fn extract_expression(&self, text: &str) -> Option<String> {
        let mut expr = text.to_string();
        if expr.contains('=') {
            if let Some(caps) = self.function_rhs.as_ref().and_then(|re| re.captures(text)) {
                expr = caps[1].to_string();
            }
        }

        let mut expr = expr.to_lowercase();
        for (word, symbol) in WORD_OPERATORS {
            expr = expr.replace(word, &format!(" {} ", symbol));
        }
        if let Some(re) = &self.times_sign {
            expr = re.replace_all(&expr, "${1}*${2}").into_owned();
        }

        let span = self.span.as_ref()?;
        span.find_iter(&expr)
            .map(|m| {
                m.as_str()
                    .trim()
                    .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
                    .to_string()
            })
            .filter(|candidate| candidate.chars().any(|c| c.is_ascii_digit()))
            .max_by_key(|candidate| candidate.len())
    }
}

#[async_trait]
impl Capability for Calculator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: Self::NAME.to_string(),
            description: "Performs mathematical calculations and evaluates expressions".to_string(),
            schema: json!({
                "expression": {
                    "type": "string",
                    "description": "Mathematical expression to evaluate"
                }
            }),
        }
    }

    async fn execute(&self, params: &Value) -> Result<String, CapabilityError> {
        let input = string_param(Self::NAME, params, "expression")?;
        let expr = self.extract_expression(input).ok_or_else(|| {
            CapabilityError::execution(
                Self::NAME,
                "Could not extract a valid mathematical expression",
            )
        })?;

        let value = Expression::parse(&expr)
            .and_then(|parsed| parsed.eval(Bindings::none()))
            .map_err(|e| match e {
                ExprError::UnboundVariable(v) => CapabilityError::execution(
                    Self::NAME,
                    format!("'{}' still contains the variable {}; try the equation solver", expr, v),
                ),
                other => CapabilityError::execution(
                    Self::NAME,
                    format!("Could not evaluate '{}': {}", expr, other),
                ),
            })?;

        if !value.is_finite() {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("The result of '{}' is not a finite number", expr),
            ));
        }
        Ok(format!("{} = {}", expr, format_number(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn calculate(text: &str) -> Result<String, CapabilityError> {
        Calculator::new()
            .execute(&json!({ "expression": text }))
            .await
    }

    #[test]
    fn test_extracts_expression_from_prose() {
        let calc = Calculator::new();
        assert_eq!(
            calc.extract_expression("What is 2 + 3 * 4?").as_deref(),
            Some("2 + 3 * 4")
        );
        assert_eq!(
            calc.extract_expression("what is 12 divided by 4").as_deref(),
            Some("12  /  4")
        );
        assert_eq!(calc.extract_expression("3 x 4").as_deref(), Some("3*4"));
        assert_eq!(
            calc.extract_expression("calculate sqrt(16) + 2").as_deref(),
            Some("sqrt(16) + 2")
        );
        assert_eq!(calc.extract_expression("no numbers here"), None);
    }

    #[tokio::test]
    async fn test_evaluates() {
        assert_eq!(calculate("2 + 3 * 4").await.unwrap(), "2 + 3 * 4 = 14");
        assert_eq!(calculate("calculate 7 / 2").await.unwrap(), "7 / 2 = 3.5");
        assert_eq!(calculate("2^10").await.unwrap(), "2^10 = 1024");
        assert_eq!(calculate("f(x) = 3 + 4").await.unwrap(), "3 + 4 = 7");
    }

    #[tokio::test]
    async fn test_failures_are_execution_errors() {
        assert!(matches!(
            calculate("1 / 0").await,
            Err(CapabilityError::Execution { .. })
        ));
        assert!(matches!(
            calculate("hello there").await,
            Err(CapabilityError::Execution { .. })
        ));
        assert!(matches!(
            Calculator::new().execute(&json!({})).await,
            Err(CapabilityError::InvalidParameters { .. })
        ));
    }
}
