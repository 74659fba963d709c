//! Transport-agnostic operations: submit a query, manage sessions, list handlers

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use tutor_core::{Context, Message, Role};
use tutor_ipc::tutor_api::{HandlerListing, QueryResponse, SessionCreated};

use crate::orchestrator::Orchestrator;
use crate::session::{Session, SessionStoreError, SessionStoreRef};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionStoreError> for ServiceError {
    fn from(e: SessionStoreError) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

/// Ties the orchestrator to the session store for one request at a time
#[derive(Clone)]
pub struct TutorService {
    orchestrator: Arc<Orchestrator>,
    sessions: SessionStoreRef,
}

impl TutorService {
    pub fn new(orchestrator: Arc<Orchestrator>, sessions: SessionStoreRef) -> Self {
        Self {
            orchestrator,
            sessions,
        }
    }

    /// Answer `query` inside `session_id`, creating a session when the id is missing, unknown or expired
    pub async fn submit_query(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> Result<QueryResponse, ServiceError> {
        if query.trim().is_empty() {
            return Err(ServiceError::Validation("query must not be empty".to_string()));
        }

        let session = self.live_or_new(session_id).await?;
        let context = Context::new(
            session.id.clone(),
            query,
            session.conversation_history,
            session.context,
        );
        let message = Message::query(
            format!("msg_{}_{}", context.session_id, context.current_step),
            "user",
            Orchestrator::ID,
            query,
        );

        let routed = self.orchestrator.route(&message, &context).await;

        self.sessions
            .append_history(&session.id, Role::User, query)
            .await?;
        self.sessions
            .append_history(&session.id, Role::Assistant, &routed.response)
            .await?;

        Ok(QueryResponse {
            response: routed.response,
            session_id: session.id,
            handler_used: routed.handler_name,
        })
    }

    async fn live_or_new(&self, session_id: Option<&str>) -> Result<Session, ServiceError> {
        if let Some(id) = session_id.map(str::trim).filter(|id| !id.is_empty()) {
            if let Some(session) = self.sessions.get_session(id).await? {
                return Ok(session);
            }
            debug!(session_id = id, "Session unknown or expired, starting a new one");
        }
        let session = self.sessions.create_session(None).await?;
        info!(session_id = %session.id, "Created session");
        Ok(session)
    }

    pub async fn create_session(&self) -> Result<SessionCreated, ServiceError> {
        let session = self.sessions.create_session(None).await?;
        info!(session_id = %session.id, "Created session");
        Ok(SessionCreated {
            session_id: session.id,
            created_at: session.created_at,
            message: "New session created successfully".to_string(),
        })
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, ServiceError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Session not found".to_string()))
    }

    pub fn list_handlers(&self) -> HandlerListing {
        self.orchestrator.listing()
    }
}
