use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::GeminiResult;

/// Common trait for all text-completion clients
///
/// Every caller must treat a failed generation as recoverable and turn it into a
/// user-safe message; the raw error never reaches a user.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate text from a prompt
    async fn generate(&self, prompt: &str) -> GeminiResult<String>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Get the model name being used
    fn model_name(&self) -> String;
}

/// Type alias for Arc-wrapped LLMClient trait objects
pub type LLMClientRef = Arc<dyn LLMClient>;
