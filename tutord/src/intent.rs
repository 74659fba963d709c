//! Phrase-based intent detection shared by the orchestrator and the math handler

use std::fmt;
use std::str::FromStr;

/// Phrases that mark a request to visualise something
pub const GRAPHING_PHRASES: &[&str] = &[
    "graph",
    "plot",
    "visualize",
    "draw",
    "show the function",
    "show f(x)",
    "display",
];

/// Phrases that mark a request to solve an equation
pub const EQUATION_PHRASES: &[&str] = &["solve", "equation", "find x", "find the value"];

const THREE_D_PHRASES: &[&str] = &["3d", "surface", "contour", "three dimensional"];
const TWO_D_PHRASES: &[&str] = &["2d", "plane", "two dimensional"];

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| haystack.contains(phrase))
}

/// Requested dimensionality of a plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotType {
    TwoD,
    ThreeD,
    #[default]
    Auto,
}

impl PlotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotType::TwoD => "2d",
            PlotType::ThreeD => "3d",
            PlotType::Auto => "auto",
        }
    }

    /// Read the plot type a free-text request asks for
    pub fn detect(query: &str) -> Self {
        let lower = query.to_lowercase();
        if contains_any(&lower, THREE_D_PHRASES) {
            PlotType::ThreeD
        } else if contains_any(&lower, TWO_D_PHRASES) {
            PlotType::TwoD
        } else {
            PlotType::Auto
        }
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "2d" => Ok(PlotType::TwoD),
            "3d" => Ok(PlotType::ThreeD),
            "auto" | "" => Ok(PlotType::Auto),
            other => Err(format!("Unknown plot type: {}", other)),
        }
    }
}

/// Everything the math handler and the orchestrator need to know about a query, read once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryIntent {
    pub graphing: bool,
    pub equation: bool,
    pub calculation: bool,
    pub plot_type: PlotType,
}

impl QueryIntent {
    pub fn detect(query: &str) -> Self {
        let lower = query.to_lowercase();
        Self {
            graphing: contains_any(&lower, GRAPHING_PHRASES),
            equation: contains_any(&lower, EQUATION_PHRASES),
            calculation: query.contains(&['+', '-', '*', '/', '='][..])
                || lower.contains("calculate"),
            plot_type: PlotType::detect(&lower),
        }
    }
}
