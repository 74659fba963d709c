use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Who authored a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// One turn of a conversation.
///
/// History is append-only; the position in the list is the authoritative order and
/// `timestamp` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Kind of a routed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Query,
    Response,
}

/// A message passed to exactly one `process` call. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: String,
    sender_id: String,
    receiver_id: String,
    content: String,
    message_type: MessageType,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
        timestamp: DateTime<Utc>,
        metadata: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content: content.into(),
            message_type,
            timestamp,
            metadata,
        }
    }

    /// A fresh query message stamped with the current time
    pub fn query(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            sender_id,
            receiver_id,
            content,
            MessageType::Query,
            Utc::now(),
            None,
        )
    }

    /// A copy of this message re-addressed from `sender_id` to `receiver_id`.
    /// Content, type and timestamp are kept; metadata is not forwarded.
    pub fn forward(
        &self,
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            sender_id,
            receiver_id,
            self.content.clone(),
            self.message_type,
            self.timestamp,
            None,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }
}

/// Per-request view of a session handed to the orchestrator and handlers
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub session_id: String,
    pub user_query: String,
    pub conversation_history: Vec<HistoryEntry>,
    pub current_step: usize,
    pub workflow_state: Map<String, Value>,
}

impl Context {
    /// Build a context; the step counter is one past the number of stored entries.
    pub fn new(
        session_id: impl Into<String>,
        user_query: impl Into<String>,
        conversation_history: Vec<HistoryEntry>,
        workflow_state: Map<String, Value>,
    ) -> Self {
        let current_step = conversation_history.len() + 1;
        Self {
            session_id: session_id.into(),
            user_query: user_query.into(),
            conversation_history,
            current_step,
            workflow_state,
        }
    }

    /// The last `max_entries` history entries, oldest first
    pub fn recent_history(&self, max_entries: usize) -> &[HistoryEntry] {
        let len = self.conversation_history.len();
        &self.conversation_history[len.saturating_sub(max_entries)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!(" Assistant ".parse::<Role>(), Ok(Role::Assistant));
        assert!("system".parse::<Role>().is_err());
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_history_entry_serializes_lowercase_role() {
        let entry = HistoryEntry::new(Role::User, "2+2");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["message"], "2+2");
    }

    #[test]
    fn test_forward_keeps_content_and_timestamp() {
        let original = Message::query("msg_1", "user", "tutor_001", "solve 2x + 5 = 11");
        let forwarded = original.forward("msg_s_1", "tutor_001", "math_001");

        assert_eq!(forwarded.id(), "msg_s_1");
        assert_eq!(forwarded.sender_id(), "tutor_001");
        assert_eq!(forwarded.receiver_id(), "math_001");
        assert_eq!(forwarded.content(), original.content());
        assert_eq!(forwarded.timestamp(), original.timestamp());
        assert_eq!(forwarded.message_type(), MessageType::Query);
        assert!(forwarded.metadata().is_none());
    }

    #[test]
    fn test_context_step_and_recent_history() {
        let history = vec![
            HistoryEntry::new(Role::User, "a"),
            HistoryEntry::new(Role::Assistant, "b"),
            HistoryEntry::new(Role::User, "c"),
        ];
        let context = Context::new("s1", "d", history, Map::new());

        assert_eq!(context.current_step, 4);
        let recent = context.recent_history(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "b");
        assert_eq!(recent[1].message, "c");
        assert_eq!(context.recent_history(10).len(), 3);
    }
}
