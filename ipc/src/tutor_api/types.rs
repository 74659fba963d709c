use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A question submitted to the tutor
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// The query text from the user/client
    pub query: String,
    /// Optional session ID to maintain conversation context
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The tutor's answer to a `QueryRequest`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryResponse {
    /// The response text to send back to the user/client
    pub response: String,
    /// Session ID used for this conversation; new if the request had none or an expired one
    pub session_id: String,
    /// Name of the handler that produced the response
    pub handler_used: String,
}

/// Reply to an explicit session creation request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionCreated {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// Public description of a handler
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HandlerSummary {
    pub id: String,
    pub name: String,
    /// "orchestrator", "specialist" or "tool"
    #[serde(rename = "type")]
    pub kind: String,
    /// Names of the capabilities the handler can invoke
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    /// Subject areas the handler covers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
}

/// Everything `listHandlers` reports
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HandlerListing {
    pub orchestrator: HandlerSummary,
    /// Keyed by routing label
    pub specialists: BTreeMap<String, HandlerSummary>,
}

/// Stable error kinds surfaced at the transport boundary
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    InternalError,
}

/// Body of every error reply
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
