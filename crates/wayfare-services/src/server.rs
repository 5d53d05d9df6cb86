//! Tool server — exposes a tool registry over HTTP
//!
//! One process per domain (weather, booking, places, planner), each serving:
//! - `GET  /health`        — liveness and tool count
//! - `GET  /tools`         — tool definitions for agent registration
//! - `POST /tools/{name}`  — execute a tool with a JSON input object

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use wayfare_core::tools::{ToolExecutor, ToolRegistry};

use crate::protocol::{HealthResponse, ToolCallResponse};

/// Maximum request body size (1MB)
const MAX_REQUEST_BODY_SIZE: usize = 1_048_576;

/// Shared state for all handlers
struct ServerState {
    name: String,
    registry: Arc<ToolRegistry>,
}

/// HTTP server wrapping one domain's tool registry
pub struct ToolServer {
    state: Arc<ServerState>,
}

impl ToolServer {
    pub fn new(name: impl Into<String>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            state: Arc::new(ServerState {
                name: name.into(),
                registry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/tools", get(list_tools_handler))
            .route("/tools/{name}", post(call_tool_handler))
            .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self, host: &str, port: u16) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(
            "{} tool server listening on {} ({} tools)",
            self.state.name,
            addr,
            self.state.registry.len()
        );

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self, host: String, port: u16) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(&host, port).await })
    }
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "ok".to_string(),
        server: state.name.clone(),
        tools: state.registry.len(),
    })
}

async fn list_tools_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    axum::Json(state.registry.list_tools())
}

async fn call_tool_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let input = if body.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) if value.is_object() => value,
            Ok(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    axum::Json(ToolCallResponse::err("Tool input must be a JSON object")),
                );
            }
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    axum::Json(ToolCallResponse::err(format!("Invalid JSON body: {}", e))),
                );
            }
        }
    };

    if state.registry.get(&name).is_none() {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(ToolCallResponse::err(format!("Unknown tool: {}", name))),
        );
    }

    let started = Instant::now();
    match state.registry.execute(&name, input).await {
        Ok(result) => {
            debug!(
                "{}::{} completed in {:?}",
                state.name,
                name,
                started.elapsed()
            );
            (StatusCode::OK, axum::Json(ToolCallResponse::ok(result)))
        }
        Err(e) => {
            warn!("{}::{} failed: {}", state.name, name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(ToolCallResponse::err(e.to_string())),
            )
        }
    }
}
