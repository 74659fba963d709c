use std::f64::consts::PI;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::expression::{Bindings, Expression};
use super::pattern;
use crate::capability::{string_param, Capability, CapabilityDescriptor, CapabilityError};
use crate::intent::PlotType;

const SAMPLES_2D: usize = 200;
const GRID_3D: usize = 50;

/// Builds Plotly figure documents for functions of x (2D) or x and y (3D)
#[derive(Debug)]
pub struct Graphing {
    verbs: Option<Regex>,
    function_rhs: Option<Regex>,
    assignment_rhs: Option<Regex>,
    span: Option<Regex>,
}

impl Default for Graphing {
    fn default() -> Self {
        Self::new()
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n.saturating_sub(1).max(1)) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

fn sample(expr: &Expression, bindings: Bindings) -> Value {
    match expr.eval(bindings) {
        Ok(v) if v.is_finite() => json!(v),
        _ => Value::Null,
    }
}

impl Graphing {
    pub const NAME: &'static str = "graphing";

    pub fn new() -> Self {
        Self {
            verbs: pattern(r"(?i)graph of|plot|graph|draw|show|visualize|display"),
            function_rhs: pattern(r"f\s*\(\s*x\s*\)\s*=\s*([^,;?]+)"),
            assignment_rhs: pattern(r"\b[yz]\s*=\s*([^,;?]+)"),
            span: pattern(
                r"(?:\d+(?:\.\d+)?|\.\d+|\b(?:sqrt|sin|cos|tan|log|exp|abs|pi|e)\b|\*\*|[xy]|[-+*/^().\s])+",
            ),
        }
    }

    /// Reduce a request such as "plot f(x) = x^2 + 1" to the function text "x^2 + 1"
    pub fn clean_function(&self, text: &str) -> String {
        let stripped = match &self.verbs {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };
        let tidy = |s: &str| s.trim().trim_end_matches('.').trim().to_string();

        for re in [&self.function_rhs, &self.assignment_rhs].into_iter().flatten() {
            if let Some(caps) = re.captures(&stripped) {
                return tidy(&caps[1]);
            }
        }

        // Otherwise the longest run of maths that parses
        let lower = stripped.to_lowercase();
        self.span
            .as_ref()
            .and_then(|re| {
                re.find_iter(&lower)
                    .map(|m| {
                        // An x or y glued to a word belongs to that word ("my", "explain")
                        let is_var = |c: char| c == 'x' || c == 'y';
                        let mut run = m.as_str();
                        if lower[..m.start()].chars().next_back().is_some_and(char::is_alphabetic) {
                            run = run.trim_start_matches(is_var);
                        }
                        if lower[m.end()..].chars().next().is_some_and(char::is_alphabetic) {
                            run = run.trim_end_matches(is_var);
                        }
                        tidy(run)
                    })
                    .filter(|candidate| Expression::parse(candidate).is_ok())
                    .max_by_key(|candidate| candidate.len())
            })
            .unwrap_or_else(|| tidy(&stripped))
    }

    fn title_2d(function: &str) -> (String, f64) {
        let lower = function.to_lowercase().replace(' ', "");
        if lower.contains("x^2") || lower.contains("x**2") {
            ("Quadratic Function".to_string(), 10.0)
        } else if lower.contains("x^3") || lower.contains("x**3") {
            ("Cubic Function".to_string(), 10.0)
        } else if lower.contains("sin") {
            ("Sine Function".to_string(), 2.0 * PI)
        } else if lower.contains("cos") {
            ("Cosine Function".to_string(), 2.0 * PI)
        } else {
            (format!("Graph of {}", function), 10.0)
        }
    }

    fn figure_2d(&self, function: &str, expr: &Expression) -> Result<Value, CapabilityError> {
        let (title, half_width) = Self::title_2d(function);
        let xs = linspace(-half_width, half_width, SAMPLES_2D);
        let ys: Vec<Value> = xs.iter().map(|&x| sample(expr, Bindings::x(x))).collect();
        if ys.iter().all(Value::is_null) {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("Could not plot function: '{}' has no finite values", function),
            ));
        }

        Ok(json!({
            "data": [{
                "type": "scatter",
                "mode": "lines",
                "name": function,
                "x": xs,
                "y": ys,
            }],
            "layout": {
                "title": {"text": title},
                "xaxis": {"title": {"text": "x"}},
                "yaxis": {"title": {"text": "y"}},
                "height": 500,
                "plot_bgcolor": "white",
            }
        }))
    }

    fn figure_3d(&self, function: &str, expr: &Expression) -> Result<Value, CapabilityError> {
        let xs = linspace(-5.0, 5.0, GRID_3D);
        let ys = linspace(-5.0, 5.0, GRID_3D);
        let zs: Vec<Vec<Value>> = ys
            .iter()
            .map(|&y| xs.iter().map(|&x| sample(expr, Bindings::xy(x, y))).collect())
            .collect();
        if zs.iter().flatten().all(Value::is_null) {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("Could not generate 3D plot: '{}' has no finite values", function),
            ));
        }

        Ok(json!({
            "data": [{
                "type": "surface",
                "x": xs,
                "y": ys,
                "z": zs,
            }],
            "layout": {
                "title": {"text": format!("Surface: z = {}", function)},
                "scene": {
                    "xaxis": {"title": {"text": "X"}},
                    "yaxis": {"title": {"text": "Y"}},
                    "zaxis": {"title": {"text": "Z"}},
                },
                "height": 600,
            }
        }))
    }
}

#[async_trait]
impl Capability for Graphing {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: Self::NAME.to_string(),
            description: "Creates interactive graphs for mathematical functions".to_string(),
            schema: json!({
                "function": {
                    "type": "string",
                    "description": "Mathematical function to graph (e.g., 'x^2', 'sin(x)', 'x^2 + y^2')"
                },
                "plot_type": {
                    "type": "string",
                    "description": "Type of plot ('2d', '3d', or 'auto')",
                    "enum": ["2d", "3d", "auto"],
                    "default": "auto"
                }
            }),
        }
    }

    async fn execute(&self, params: &Value) -> Result<String, CapabilityError> {
        let request = string_param(Self::NAME, params, "function")?;
        let plot_type = match params.get("plot_type").and_then(Value::as_str) {
            None => PlotType::Auto,
            Some(raw) => raw.parse::<PlotType>().map_err(|_| {
                CapabilityError::invalid(Self::NAME, format!("unknown plot_type '{}'", raw))
            })?,
        };

        let function = self.clean_function(request);
        let expr = Expression::parse(&function).map_err(|e| {
            CapabilityError::execution(
                Self::NAME,
                format!("Could not read function '{}': {}", function, e),
            )
        })?;

        let three_d = match plot_type {
            PlotType::ThreeD => true,
            PlotType::TwoD => false,
            PlotType::Auto => expr.uses('y') || PlotType::detect(request) == PlotType::ThreeD,
        };
        if !three_d && expr.uses('y') {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("'{}' depends on y and needs a 3D plot", function),
            ));
        }

        let figure = if three_d {
            self.figure_3d(&function, &expr)?
        } else {
            self.figure_2d(&function, &expr)?
        };
        Ok(format!("<plotly-graph>{}</plotly-graph>", figure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn graph(params: Value) -> Result<Value, CapabilityError> {
        let output = Graphing::new().execute(&params).await?;
        let body = output
            .strip_prefix("<plotly-graph>")
            .and_then(|s| s.strip_suffix("</plotly-graph>"))
            .expect("wrapped figure");
        Ok(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_clean_function() {
        let g = Graphing::new();
        assert_eq!(g.clean_function("graph f(x) = x^2 + 1"), "x^2 + 1");
        assert_eq!(g.clean_function("plot y = sin(x)."), "sin(x)");
        assert_eq!(g.clean_function("Draw the function x^3 - 2x"), "x^3 - 2x");
        assert_eq!(g.clean_function("show z = x^2 + y^2"), "x^2 + y^2");
    }

    #[tokio::test]
    async fn test_quadratic_2d() {
        let figure = graph(json!({"function": "graph f(x) = x^2"})).await.unwrap();
        assert_eq!(figure["data"][0]["type"], "scatter");
        assert_eq!(figure["data"][0]["x"].as_array().unwrap().len(), 200);
        assert_eq!(figure["data"][0]["x"][0], -10.0);
        assert_eq!(figure["data"][0]["y"][0], 100.0);
        assert_eq!(figure["layout"]["title"]["text"], "Quadratic Function");
    }

    #[tokio::test]
    async fn test_trig_uses_two_pi_range() {
        let figure = graph(json!({"function": "plot sin(x)"})).await.unwrap();
        assert_eq!(figure["layout"]["title"]["text"], "Sine Function");
        let first = figure["data"][0]["x"][0].as_f64().unwrap();
        assert!((first + 2.0 * PI).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_undefined_points_are_null() {
        let figure = graph(json!({"function": "plot sqrt(x)"})).await.unwrap();
        assert!(figure["data"][0]["y"][0].is_null());
        assert!(figure["data"][0]["y"][199].is_number());
    }

    #[tokio::test]
    async fn test_surface_when_y_present_or_requested() {
        let figure = graph(json!({"function": "plot x^2 + y^2"})).await.unwrap();
        assert_eq!(figure["data"][0]["type"], "surface");
        assert_eq!(figure["data"][0]["z"].as_array().unwrap().len(), 50);
        assert_eq!(figure["layout"]["title"]["text"], "Surface: z = x^2 + y^2");

        let figure = graph(json!({"function": "x^2", "plot_type": "3d"})).await.unwrap();
        assert_eq!(figure["data"][0]["type"], "surface");
    }

    #[tokio::test]
    async fn test_bad_requests() {
        assert!(matches!(
            graph(json!({"function": "plot my feelings"})).await,
            Err(CapabilityError::Execution { .. })
        ));
        assert!(matches!(
            graph(json!({"function": "x^2", "plot_type": "4d"})).await,
            Err(CapabilityError::InvalidParameters { .. })
        ));
        assert!(matches!(
            graph(json!({"function": "x + y", "plot_type": "2d"})).await,
            Err(CapabilityError::Execution { .. })
        ));
    }
}
