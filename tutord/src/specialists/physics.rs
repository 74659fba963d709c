use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use tracing::warn;
use tutor_core::{Context, LLMClientRef, Message};

use crate::capabilities::{pattern, PhysicsCalculator, PhysicsConstants, UnitConverter};
use crate::capability::CapabilitySet;
use crate::handler::{
    history_block, indicator_confidence, Handler, HandlerDescriptor, HandlerKind, PROMPT_HISTORY,
};

const INDICATORS: &[&str] = &[
    "force",
    "velocity",
    "acceleration",
    "energy",
    "momentum",
    "newton",
    "einstein",
    "quantum",
    "electromagnetic",
    "gravity",
];

const TOPICS: &[&str] = &[
    "mechanics",
    "thermodynamics",
    "electromagnetism",
    "quantum",
    "constants",
    "unit_conversion",
];

const CONSTANT_TRIGGERS: &[&str] = &["constant", "speed of light", "planck", "gravity"];
const CONVERSION_TRIGGERS: &[&str] = &["convert", "unit", "meter", "kilogram"];
const CALCULATION_TRIGGERS: &[&str] = &["calculate", "find", "formula"];

const APOLOGY: &str = "I couldn't answer that physics question properly. Can you try rephrasing it?";

/// Mechanics, units and physical constants
pub struct PhysicsHandler {
    llm: LLMClientRef,
    capabilities: CapabilitySet,
    blank_lines: Option<Regex>,
    spaces: Option<Regex>,
}

impl PhysicsHandler {
    pub const ID: &'static str = "physics_001";
    pub const NAME: &'static str = "Physics Expert";

    pub fn new(llm: LLMClientRef) -> Self {
        Self {
            llm,
            capabilities: CapabilitySet::new()
                .with(PhysicsConstants::new())
                .with(UnitConverter::new())
                .with(PhysicsCalculator::new()),
            blank_lines: pattern(r"\n{3,}"),
            spaces: pattern(r"[ \t]{2,}"),
        }
    }

    /// Successful tool results only; failures are dropped from physics answers
    async fn gather(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        let wants = |triggers: &[&str]| triggers.iter().any(|t| lower.contains(t));

        let mut plan = Vec::new();
        if wants(CONSTANT_TRIGGERS) {
            plan.push((PhysicsConstants::NAME, json!({ "query": query }), "Constants: "));
        }
        if wants(CONVERSION_TRIGGERS) {
            plan.push((UnitConverter::NAME, json!({ "query": query }), "Conversion: "));
        }
        if wants(CALCULATION_TRIGGERS) {
            plan.push((PhysicsCalculator::NAME, json!({ "problem": query }), "Calculation: "));
        }

        let mut results = Vec::new();
        for (name, params, label) in plan {
            if let Some(output) = self.capabilities.run(name, &params).await.output() {
                results.push(format!("{}{}", label, output));
            }
        }
        results
    }

    fn normalize(&self, text: &str) -> String {
        let mut text = text.trim().to_string();
        if let Some(re) = &self.blank_lines {
            text = re.replace_all(&text, "\n\n").into_owned();
        }
        if let Some(re) = &self.spaces {
            text = re.replace_all(&text, " ").into_owned();
        }
        text
    }
}

fn with_results(text: String, results: &[String]) -> String {
    if results.is_empty() {
        text
    } else {
        format!("{}\n\n**Results:**\n{}", text, results.join("\n"))
    }
}

#[async_trait]
impl Handler for PhysicsHandler {
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
        indicator_confidence(query, INDICATORS, 0.4)
    }

    async fn process(&self, message: &Message, context: &Context) -> String {
        let query = message.content();
        let results = self.gather(query).await;
        let tool_context = if results.is_empty() {
            "No tools were used.".to_string()
        } else {
            results.join("\n")
        };

        let prompt = format!(
            "You are a physics expert. Answer this physics question concisely.\n\n\
             Recent conversation:\n{}\n\n\
             Question: {}\n\
             Tool Results: {}\n\n\
             Keep your explanation brief: the core answer first, then only the essential concepts.\n\
             Limit your answer to 3-4 sentences unless absolutely necessary. Use formulas where appropriate.",
            history_block(context, PROMPT_HISTORY),
            query,
            tool_context
        );

        match self.llm.generate(&prompt).await {
            Ok(reply) => with_results(self.normalize(&reply), &results),
            Err(e) => {
                warn!(handler = Self::ID, error = %e, "Text completion failed");
                with_results(APOLOGY.to_string(), &results)
            }
        }
    }
}
