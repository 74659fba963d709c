use async_trait::async_trait;
use tracing::warn;
use tutor_core::{Context, LLMClientRef, Message};

use crate::handler::{history_block, Handler, HandlerDescriptor, HandlerKind, PROMPT_HISTORY};

const APOLOGY: &str = "I apologize, but I couldn't process your question right now. Please try again in a moment.";

/// Answers anything no specialist is registered for
pub struct GeneralTutor {
    llm: LLMClientRef,
}

impl GeneralTutor {
    pub const ID: &'static str = "general_001";
    pub const NAME: &'static str = "General Tutor";

    pub fn new(llm: LLMClientRef) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Handler for GeneralTutor {
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            id: Self::ID.to_string(),
            kind: HandlerKind::Specialist,
            name: Self::NAME.to_string(),
            capabilities: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Willing to take anything, but never eager
    fn can_handle(&self, _query: &str) -> f32 {
        0.1
    }

    async fn process(&self, message: &Message, context: &Context) -> String {
        let prompt = format!(
            "You are an AI tutor. Answer this educational question clearly and concisely.\n\n\
             Recent conversation:\n{}\n\n\
             Question: {}\n\n\
             Provide a brief, focused explanation without unnecessary details. \
             Get straight to the point and focus on the key concepts.",
            history_block(context, PROMPT_HISTORY),
            message.content()
        );

        match self.llm.generate(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(handler = Self::ID, error = %e, "Text completion failed");
                APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use std::sync::Arc;
    use tutor_core::{HistoryEntry, Role};

    #[tokio::test]
    async fn test_prompt_carries_history() {
        let llm = Arc::new(ScriptedLlm::replying("Rome was founded in 753 BC."));
        let tutor = GeneralTutor::new(llm.clone());
        let context = Context::new(
            "s1",
            "When was Rome founded?",
            vec![
                HistoryEntry::new(Role::User, "Tell me about Italy"),
                HistoryEntry::new(Role::Assistant, "Italy is in Europe."),
            ],
            Default::default(),
        );
        let message = Message::query("m", "tutor_001", GeneralTutor::ID, "When was Rome founded?");

        assert_eq!(
            tutor.process(&message, &context).await,
            "Rome was founded in 753 BC."
        );
        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("user: Tell me about Italy\nassistant: Italy is in Europe."));
        assert!(prompt.contains("Question: When was Rome founded?"));
    }

    #[tokio::test]
    async fn test_failure_is_an_apology() {
        let tutor = GeneralTutor::new(Arc::new(ScriptedLlm::failing()));
        let message = Message::query("m", "tutor_001", GeneralTutor::ID, "why is the sky blue");
        assert_eq!(
            tutor.process(&message, &Context::default()).await,
            APOLOGY
        );
    }
}
