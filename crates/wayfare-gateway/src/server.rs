//! Gateway server — the main chat application, an Axum HTTP API
//!
//! Routes every chat message through the assistant pipeline (guardrail →
//! capability routing → specialist dispatch) with the session's conversation
//! history as context.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tracing::info;

use wayfare_core::Assistant;
use wayfare_core::types::{TravelRequest, TurnRole};

use crate::auth;
use crate::protocol::{ApiError, ChatRequest, ChatResponse, CreateSessionRequest};
use crate::session::SessionManager;

/// Shared state for all handlers
#[derive(Clone)]
pub struct GatewayState {
    pub sessions: Arc<SessionManager>,
    pub assistant: Arc<Assistant>,
    pub auth_token: String,
    pub start_time: std::time::Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    /// Create a new gateway server
    pub fn new(bind: SocketAddr, assistant: Arc<Assistant>, auth_token: String) -> Self {
        let state = GatewayState {
            sessions: Arc::new(SessionManager::new()),
            assistant,
            auth_token,
            start_time: std::time::Instant::now(),
        };
        Self { state, bind }
    }

    /// Get a reference to the session manager
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.state.sessions
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/chat", post(chat_handler))
            .route("/api/status", get(status_handler))
            .route("/api/sessions", get(sessions_handler).post(create_session_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}", self.bind);

        axum::serve(listener, router).await?;
        Ok(())
    }
}

// ── HTTP Handlers ──

async fn status_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let sessions = state.sessions.count().await;
    let uptime = state.start_time.elapsed().as_secs();

    axum::Json(serde_json::json!({
        "status": "ok",
        "sessions": sessions,
        "uptime_secs": uptime,
    }))
}

async fn sessions_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    if !check_auth(&state.auth_token, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let sessions = state.sessions.list().await;
    Ok(axum::Json(serde_json::json!({ "sessions": sessions })))
}

async fn create_session_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if !check_auth(&state.auth_token, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let name = request.name.as_deref().unwrap_or("Untitled");
    let session = state.sessions.create(name).await;
    Ok((StatusCode::CREATED, axum::Json(session)))
}

async fn chat_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ChatRequest>,
) -> Result<axum::Json<ChatResponse>, (StatusCode, axum::Json<ApiError>)> {
    if !check_auth(&state.auth_token, &headers) {
        return Err((
            StatusCode::UNAUTHORIZED,
            axum::Json(ApiError::new("unauthorized")),
        ));
    }

    let content = request.content.trim();
    if content.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            axum::Json(ApiError::new("Missing or empty 'content'")),
        ));
    }

    let session_id = request.session_id.as_deref().unwrap_or("main").to_string();
    let history = state.sessions.history(&session_id).await;
    let travel_request = TravelRequest::new(session_id.clone(), content);

    // The assistant never errors outward; failures become canned replies
    let reply = state.assistant.process(&travel_request, &history).await;

    state
        .sessions
        .record_turn(&session_id, TurnRole::User, content)
        .await;
    state
        .sessions
        .record_turn(&session_id, TurnRole::Assistant, &reply.content)
        .await;

    Ok(axum::Json(ChatResponse {
        content: reply.content,
        agent: reply.agent.map(|a| a.to_string()),
        session_id,
    }))
}

fn check_auth(configured_token: &str, headers: &HeaderMap) -> bool {
    if configured_token.is_empty() {
        return true;
    }
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(auth::extract_bearer_token);

    match token {
        Some(t) => auth::validate_token(configured_token, t),
        None => false,
    }
}
