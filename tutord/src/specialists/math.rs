use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tracing::{debug, warn};
use tutor_core::{Context, LLMClientRef, Message};

use super::labelled;
use crate::capabilities::{pattern, Calculator, EquationSolver, Graphing};
use crate::capability::{CapabilitySet, ToolOutcome};
use crate::handler::{
    history_block, indicator_confidence, Handler, HandlerDescriptor, HandlerKind, PROMPT_HISTORY,
};
use crate::intent::QueryIntent;

const INDICATORS: &[&str] = &[
    "solve",
    "calculate",
    "equation",
    "derivative",
    "integral",
    "graph",
    "plot",
    "algebra",
    "geometry",
    "trigonometry",
];

const TOPICS: &[&str] = &[
    "algebra",
    "calculus",
    "geometry",
    "statistics",
    "equations",
    "graphing",
    "calculations",
];

const APOLOGY: &str = "I apologize, but I couldn't put together an explanation for this math problem right now.";

/// Algebra, calculus and graphing questions
pub struct MathHandler {
    llm: LLMClientRef,
    capabilities: CapabilitySet,
    function_def: Option<Regex>,
    y_def: Option<Regex>,
    after_verb: Option<Regex>,
}

impl MathHandler {
    pub const ID: &'static str = "math_001";
    pub const NAME: &'static str = "Mathematics Expert";

    pub fn new(llm: LLMClientRef) -> Self {
        Self {
            llm,
            capabilities: CapabilitySet::new()
                .with(Calculator::new())
                .with(Graphing::new())
                .with(EquationSolver::new()),
            function_def: pattern(r"f\s*\(\s*x\s*\)\s*=\s*([^,;?]+)"),
            y_def: pattern(r"\by\s*=\s*([^,;?]+)"),
            after_verb: pattern(r"(?i)\b(?:graph|plot|visualize|draw|show)\s+([^,;?]+)"),
        }
    }

    /// How the function is named back to the user: "f(x) = ..", "y = ..", or the words after the verb
    fn extract_function(&self, query: &str) -> String {
        let capture = |re: &Option<Regex>| {
            re.as_ref()
                .and_then(|re| re.captures(query))
                .map(|caps| caps[1].trim().trim_end_matches('.').trim().to_string())
        };
        if let Some(rhs) = capture(&self.function_def) {
            return format!("f(x) = {}", rhs);
        }
        if let Some(rhs) = capture(&self.y_def) {
            return format!("y = {}", rhs);
        }
        capture(&self.after_verb).unwrap_or_else(|| query.trim().to_string())
    }

    async fn explain(&self, query: &str, context: &Context, results: &[String]) -> String {
        let tool_context = if results.is_empty() {
            "No tools were used.".to_string()
        } else {
            results.join("\n")
        };
        let prompt = format!(
            "You are a mathematics expert. Answer this math question concisely.\n\n\
             Recent conversation:\n{}\n\n\
             Question: {}\n\
             Tool Results: {}\n\n\
             Provide a brief, educational explanation. Focus on the main concepts without unnecessary details.\n\
             If there's a graph or calculation result, highlight that.",
            history_block(context, PROMPT_HISTORY),
            query,
            tool_context
        );

        match self.llm.generate(&prompt).await {
            Ok(mut reply) => {
                let missing: Vec<&str> = results
                    .iter()
                    .filter(|r| !reply.contains(r.as_str()))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    reply.push_str("\n\n");
                    reply.push_str(&missing.join("\n"));
                }
                reply
            }
            Err(e) => {
                warn!(handler = Self::ID, error = %e, "Text completion failed");
                let solved: Vec<&str> = results
                    .iter()
                    .filter(|r| !r.contains("error:"))
                    .map(String::as_str)
                    .collect();
                if solved.is_empty() {
                    APOLOGY.to_string()
                } else {
                    format!("{}\n\n{}", APOLOGY, solved.join("\n"))
                }
            }
        }
    }
}

#[async_trait]
impl Handler for MathHandler {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            id: Self::ID.to_string(),
            kind: HandlerKind::Specialist,
            name: Self::NAME.to_string(),
            capabilities: self.capabilities.names(),
            topics: TOPICS.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn can_handle(&self, query: &str) -> f32 {
        indicator_confidence(query, INDICATORS, 0.3)
    }

    async fn process(&self, message: &Message, context: &Context) -> String {
        let query = message.content();
        let intent = QueryIntent::detect(query);
        debug!(handler = Self::ID, ?intent, "Processing math query");

        let mut solved = None;
        if intent.equation {
            let outcome = self
                .capabilities
                .run(EquationSolver::NAME, &json!({ "equation": query }))
                .await;
            if let Some(solution) = outcome.output().filter(|s| s.contains("x =")) {
                return solution.to_string();
            }
            solved = Some(outcome);
        }

        let mut results = Vec::new();
        if intent.graphing {
            let params = json!({ "function": query, "plot_type": intent.plot_type.as_str() });
            match self.capabilities.run(Graphing::NAME, &params).await {
                ToolOutcome::Output(graph) if graph.contains("<plotly-graph>") => {
                    return format!(
                        "Here's the graph of {}:\n\n{}",
                        self.extract_function(query),
                        graph
                    );
                }
                outcome => results.push(labelled(&outcome, "Graph generated: ", "Graphing error: ")),
            }
        }

        if intent.calculation {
            let outcome = self
                .capabilities
                .run(Calculator::NAME, &json!({ "expression": query }))
                .await;
            results.push(labelled(&outcome, "Calculation result: ", "Calculation error: "));
        }

        if let Some(outcome) = solved {
            results.push(labelled(&outcome, "Solution: ", "Equation solving error: "));
        }

        self.explain(query, context, &results).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;

    fn ask(query: &str) -> (Message, Context) {
        (
            Message::query("msg_1", "tutor_001", MathHandler::ID, query),
            Context::new("s1", query, Vec::new(), Default::default()),
        )
    }

    #[tokio::test]
    async fn test_linear_equation_answered_by_solver() {
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let handler = MathHandler::new(llm.clone());
        let (message, context) = ask("solve 2x + 5 = 11");

        let answer = handler.process(&message, &context).await;
        assert!(answer.starts_with("x = 3\n\nSteps:\n"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_graph_request_returns_figure() {
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let handler = MathHandler::new(llm.clone());
        let (message, context) = ask("plot f(x) = x^2 + 1");

        let answer = handler.process(&message, &context).await;
        assert!(answer.starts_with("Here's the graph of f(x) = x^2 + 1:\n\n<plotly-graph>"));
        assert!(answer.ends_with("</plotly-graph>"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_calculation_is_explained_and_quoted() {
        let llm = Arc::new(ScriptedLlm::replying("Multiplication comes before addition."));
        let handler = MathHandler::new(llm.clone());
        let (message, context) = ask("What is 2 + 3 * 4?");

        let answer = handler.process(&message, &context).await;
        assert!(answer.starts_with("Multiplication comes before addition."));
        assert!(answer.ends_with("Calculation result: 2 + 3 * 4 = 14"));
        assert!(llm
            .last_prompt()
            .unwrap()
            .contains("Tool Results: Calculation result: 2 + 3 * 4 = 14"));
    }

    #[tokio::test]
    async fn test_collaborator_failure_keeps_tool_results() {
        let handler = MathHandler::new(Arc::new(ScriptedLlm::failing()));
        let (message, context) = ask("calculate 7 / 2");

        let answer = handler.process(&message, &context).await;
        assert!(answer.starts_with(APOLOGY));
        assert!(answer.contains("Calculation result: 7 / 2 = 3.5"));
    }

    #[tokio::test]
    async fn test_failed_tools_become_notes() {
        let llm = Arc::new(ScriptedLlm::replying("Let's look at it."));
        let handler = MathHandler::new(llm.clone());
        let (message, context) = ask("solve this equation: x = x + 1");

        let answer = handler.process(&message, &context).await;
        assert!(answer.starts_with("Let's look at it."));
        assert!(answer.contains("Solution: No solution found"));
    }

    #[test]
    fn test_extract_function() {
        let handler = MathHandler::new(Arc::new(ScriptedLlm::failing()));
        assert_eq!(handler.extract_function("graph f(x)=x^3, please"), "f(x) = x^3");
        assert_eq!(handler.extract_function("plot y = sin(x)."), "y = sin(x)");
        assert_eq!(handler.extract_function("Draw a parabola"), "a parabola");
        assert_eq!(handler.extract_function("  visualise  "), "visualise");
    }

    #[test]
    fn test_confidence_and_descriptor() {
        let handler = MathHandler::new(Arc::new(ScriptedLlm::failing()));
        assert_eq!(handler.can_handle("hello"), 0.0);
        assert!((handler.can_handle("solve the equation") - 0.6).abs() < 1e-6);
        assert_eq!(
            handler.can_handle("solve calculate equation derivative integral"),
            1.0
        );

        let descriptor = handler.descriptor();
        assert_eq!(descriptor.name, "Mathematics Expert");
        assert_eq!(
            descriptor.capabilities,
            vec!["calculator", "graphing", "equation_solver"]
        );
    }
}
