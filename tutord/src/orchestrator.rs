//! Top-level entry point: classify, delegate to exactly one handler, present the answer

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};
use tutor_core::{Context, Message};
use tutor_ipc::tutor_api::HandlerListing;

use crate::classifier::Classifier;
use crate::handler::{Handler, HandlerDescriptor, HandlerKind};
use crate::intent::QueryIntent;
use crate::registry::HandlerRegistry;

/// Label whose graphing answers are passed through without a name prefix
const GRAPHING_LABEL: &str = "math";

/// Outcome of routing one message
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub label: String,
    /// Name of the handler (or fallback) that answered
    pub handler_name: String,
    pub response: String,
    /// Whether a registered specialist answered rather than the fallback
    pub specialist: bool,
}

pub struct Orchestrator {
    classifier: Classifier,
    registry: HandlerRegistry,
}

impl Orchestrator {
    pub const ID: &'static str = "tutor_001";
    pub const NAME: &'static str = "AI Tutor";

    pub fn new(classifier: Classifier, registry: HandlerRegistry) -> Self {
        Self {
            classifier,
            registry,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Route `message` to one handler and return its presented answer
    pub async fn route(&self, message: &Message, context: &Context) -> Routed {
        let query = message.content();
        let label = self.classifier.classify(query).await;

        let (handler, specialist) = match self.registry.resolve(&label) {
            Some(handler) => (handler, true),
            None => (self.registry.fallback(), false),
        };
        let descriptor = handler.descriptor();
        info!(
            session_id = %context.session_id,
            label = %label,
            handler = %descriptor.id,
            "Routing query"
        );

        let forwarded = message.forward(
            format!("msg_{}_{}", context.session_id, context.current_step),
            Self::ID,
            descriptor.id.as_str(),
        );
        let answer = handler.process(&forwarded, context).await;

        let response = if !specialist {
            format!("🤖 **{}**:\n\n{}", descriptor.name, answer)
        } else if label == GRAPHING_LABEL && QueryIntent::detect(query).graphing {
            debug!("Passing graph answer through unprefixed");
            answer
        } else {
            format!("🎓 **{}**:\n\n{}", descriptor.name, answer)
        };

        Routed {
            label,
            handler_name: descriptor.name,
            response,
            specialist,
        }
    }

    /// Descriptors of the orchestrator and every registered specialist
    pub fn listing(&self) -> HandlerListing {
        let specialists: BTreeMap<String, _> = self
            .registry
            .specialists()
            .map(|(label, handler)| (label.to_string(), handler.descriptor().summary()))
            .collect();
        HandlerListing {
            orchestrator: self.descriptor().summary(),
            specialists,
        }
    }
}

#[async_trait]
impl Handler for Orchestrator {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            id: Self::ID.to_string(),
            kind: HandlerKind::Orchestrator,
            name: Self::NAME.to_string(),
            capabilities: Vec::new(),
            topics: self.registry.labels().map(str::to_string).collect(),
        }
    }

    /// The best confidence among the specialists
    fn can_handle(&self, query: &str) -> f32 {
        self.registry
            .specialists()
            .map(|(_, handler)| handler.can_handle(query))
            .fold(0.0, f32::max)
    }

    async fn process(&self, message: &Message, context: &Context) -> String {
        self.route(message, context).await.response
    }
}
