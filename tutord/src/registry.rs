//! Label to handler lookup, with a fallback responder for unknown labels

use thiserror::Error;

use crate::handler::HandlerRef;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("A handler is already registered for label '{0}'")]
    DuplicateLabel(String),

    #[error("A handler named '{0}' is already registered")]
    DuplicateName(String),
}

/// Specialists in registration order plus the fallback responder
pub struct HandlerRegistry {
    entries: Vec<(String, HandlerRef)>,
    fallback: HandlerRef,
}

impl HandlerRegistry {
    pub fn new(fallback: HandlerRef) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
        }
    }

    /// Register `handler` under `label`; labels and handler names stay unique
    pub fn register(&mut self, label: &str, handler: HandlerRef) -> Result<(), RegistryError> {
        if self.entries.iter().any(|(existing, _)| existing == label) {
            return Err(RegistryError::DuplicateLabel(label.to_string()));
        }
        let name = handler.descriptor().name;
        if name == self.fallback.descriptor().name
            || self.entries.iter().any(|(_, h)| h.descriptor().name == name)
        {
            return Err(RegistryError::DuplicateName(name));
        }
        self.entries.push((label.to_string(), handler));
        Ok(())
    }

    /// Builder form of `register`
    pub fn with(mut self, label: &str, handler: HandlerRef) -> Result<Self, RegistryError> {
        self.register(label, handler)?;
        Ok(self)
    }

    /// Exact-match lookup
    pub fn resolve(&self, label: &str) -> Option<&HandlerRef> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, handler)| handler)
    }

    pub fn fallback(&self) -> &HandlerRef {
        &self.fallback
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn specialists(&self) -> impl Iterator<Item = (&str, &HandlerRef)> {
        self.entries
            .iter()
            .map(|(label, handler)| (label.as_str(), handler))
    }
}
