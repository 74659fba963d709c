// Shared building blocks for the tutor workspace:
// - API client for Gemini and the text-completion trait
// - Request/response data structures
// - Message and conversation context types
// - Configuration loading
// - Shared error types

// Export client module - API client for Gemini
pub mod client;
pub use client::*;

// Export llm module - Text-completion collaborator trait
pub mod llm;
pub use llm::*;

// Export types module - Gemini request/response data structures
pub mod types;
pub use types::*;

// Export message module - Messages, history entries and request context
pub mod message;
pub use message::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;
