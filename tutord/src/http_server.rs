use crate::service::{ServiceError, TutorService};
use crate::session::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tutor_ipc::tutor_api::{
    ErrorBody, ErrorKind, HandlerListing, QueryRequest, QueryResponse, SessionCreated,
};

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    service: TutorService,
}

/// Error type for HTTP server
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Self::Service(e) = self;
        let (status, kind, message) = match e {
            ServiceError::Validation(reason) => {
                (StatusCode::BAD_REQUEST, ErrorKind::ValidationError, reason)
            }
            ServiceError::NotFound(reason) => (StatusCode::NOT_FOUND, ErrorKind::NotFound, reason),
            ServiceError::Internal(cause) => {
                error!(error = %cause, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::InternalError,
                    "An internal error occurred while processing the request".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { kind, message })).into_response()
    }
}

/// Build the router with every route and permissive CORS
pub fn router(service: TutorService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/api/query", post(handle_query))
        .route("/api/session/new", post(create_session))
        .route("/api/session/:session_id", get(get_session))
        .route("/api/agents", get(list_handlers))
        .layer(cors)
        .with_state(AppState { service })
}

/// Start the HTTP server
pub async fn run_server(service: TutorService, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    axum::Server::bind(&addr)
        .serve(router(service).into_make_service())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start HTTP server: {}", e))
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "AI Tutor is running"
}

async fn handle_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let reply = state
        .service
        .submit_query(&payload.query, payload.session_id.as_deref())
        .await?;
    Ok(Json(reply))
}

async fn create_session(State(state): State<AppState>) -> Result<Json<SessionCreated>, ApiError> {
    Ok(Json(state.service.create_session().await?))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.service.get_session(&session_id).await?))
}

async fn list_handlers(State(state): State<AppState>) -> Json<HandlerListing> {
    Json(state.service.list_handlers())
}
