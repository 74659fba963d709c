//! The contract every subject responder implements

use std::sync::Arc;

use async_trait::async_trait;
use tutor_core::{Context, Message};
use tutor_ipc::tutor_api::HandlerSummary;

/// How many history entries a handler quotes back to the text-completion service
pub const PROMPT_HISTORY: usize = 3;

/// Role of a handler; reported as `as_str()` in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Orchestrator,
    Specialist,
    Tool,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Orchestrator => "orchestrator",
            HandlerKind::Specialist => "specialist",
            HandlerKind::Tool => "tool",
        }
    }
}

/// Static description of a handler; confidence is never stored here
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerDescriptor {
    pub id: String,
    pub kind: HandlerKind,
    pub name: String,
    /// Names of the capabilities the handler can invoke
    pub capabilities: Vec<String>,
    pub topics: Vec<String>,
}

impl HandlerDescriptor {
    pub fn summary(&self) -> HandlerSummary {
        HandlerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind.as_str().to_string(),
            capabilities: self.capabilities.clone(),
            topics: self.topics.clone(),
        }
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    fn descriptor(&self) -> HandlerDescriptor;

    /// Advisory fitness for `query`, always within [0, 1]. Routing never depends on it.
    fn can_handle(&self, query: &str) -> f32;

    /// Answer `message`. Never fails: tool and collaborator failures become text.
    async fn process(&self, message: &Message, context: &Context) -> String;
}

pub type HandlerRef = Arc<dyn Handler>;

/// `weight` per indicator found in `query`, capped at 1
pub(crate) fn indicator_confidence(query: &str, indicators: &[&str], weight: f32) -> f32 {
    let lower = query.to_lowercase();
    let hits = indicators.iter().filter(|i| lower.contains(*i)).count();
    (hits as f32 * weight).clamp(0.0, 1.0)
}

/// The last `max` turns of the conversation as "role: message" lines
pub(crate) fn history_block(context: &Context, max: usize) -> String {
    context
        .recent_history(max)
        .iter()
        .map(|entry| format!("{}: {}", entry.role, entry.message))
        .collect::<Vec<_>>()
        .join("\n")
}
