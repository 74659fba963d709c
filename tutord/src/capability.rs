//! Named units of work that handlers invoke by name

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Errors raised while resolving or running a capability
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapabilityError {
    #[error("Capability not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters for {capability}: {reason}")]
    InvalidParameters { capability: String, reason: String },

    #[error("{capability} failed: {reason}")]
    Execution { capability: String, reason: String },
}

impl CapabilityError {
    pub fn invalid(capability: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            capability: capability.to_string(),
            reason: reason.into(),
        }
    }

    pub fn execution(capability: &str, reason: impl Into<String>) -> Self {
        Self::Execution {
            capability: capability.to_string(),
            reason: reason.into(),
        }
    }

    /// Text that is safe to show to an end user
    pub fn user_note(&self) -> String {
        match self {
            Self::NotFound(_) => "That tool is not available right now.".to_string(),
            Self::InvalidParameters { reason, .. } | Self::Execution { reason, .. } => {
                reason.clone()
            }
        }
    }
}

/// Self-description of a capability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    /// Accepted parameters, keyed by name
    pub schema: Value,
}

#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique name within the owning handler
    fn name(&self) -> &'static str;

    fn describe(&self) -> CapabilityDescriptor;

    async fn execute(&self, params: &Value) -> Result<String, CapabilityError>;
}

/// Fetch a required string parameter
pub(crate) fn string_param<'a>(
    capability: &str,
    params: &'a Value,
    key: &str,
) -> Result<&'a str, CapabilityError> {
    let value = params
        .get(key)
        .ok_or_else(|| CapabilityError::invalid(capability, format!("missing '{}'", key)))?;
    let text = value
        .as_str()
        .ok_or_else(|| CapabilityError::invalid(capability, format!("'{}' must be a string", key)))?;
    if text.trim().is_empty() {
        return Err(CapabilityError::invalid(
            capability,
            format!("'{}' must not be empty", key),
        ));
    }
    Ok(text)
}

/// Result of running a capability from inside a handler
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Output(String),
    /// The capability failed; carries a user-safe explanation
    Note(String),
}

impl ToolOutcome {
    pub fn output(&self) -> Option<&str> {
        match self {
            ToolOutcome::Output(text) => Some(text),
            ToolOutcome::Note(_) => None,
        }
    }
}

/// Ordered collection of capabilities with unique names
#[derive(Default)]
pub struct CapabilitySet {
    capabilities: Vec<Arc<dyn Capability>>,
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert`
    pub fn with(mut self, capability: impl Capability + 'static) -> Self {
        self.insert(Arc::new(capability));
        self
    }

    /// Add a capability, replacing and returning any existing one with the same name
    pub fn insert(&mut self, capability: Arc<dyn Capability>) -> Option<Arc<dyn Capability>> {
        match self
            .capabilities
            .iter_mut()
            .find(|existing| existing.name() == capability.name())
        {
            Some(slot) => Some(std::mem::replace(slot, capability)),
            None => {
                self.capabilities.push(capability);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.iter().find(|c| c.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.capabilities
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn describe_all(&self) -> Vec<CapabilityDescriptor> {
        self.capabilities.iter().map(|c| c.describe()).collect()
    }

    /// Run the capability called `name`
    pub async fn invoke(&self, name: &str, params: &Value) -> Result<String, CapabilityError> {
        let capability = self
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;
        capability.execute(params).await
    }

    /// Run a capability, turning any failure into a user-safe note
    pub async fn run(&self, name: &str, params: &Value) -> ToolOutcome {
        match self.invoke(name, params).await {
            Ok(output) => ToolOutcome::Output(output),
            Err(e) => {
                warn!(capability = name, error = %e, "Capability failed");
                ToolOutcome::Note(e.user_note())
            }
        }
    }
}
