//! Remote tools — proxies to standalone tool servers
//!
//! Each specialist agent's tools live in a separate HTTP process (the tool
//! server). At startup the agent fetches the server's tool definitions from
//! `GET /tools` and registers a [`RemoteTool`] per definition; execution is
//! forwarded to `POST /tools/{name}`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::ToolDefinition;
use crate::tools::{ToolHandler, ToolRegistry};

/// Timeout for a single remote tool call. Planner calls fan out to several
/// upstream APIs, so this is longer than a plain proxy would need.
const CALL_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTP client for one tool server
pub struct ToolServerClient {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

/// Wire shape of a tool call response from a tool server
#[derive(Debug, Deserialize)]
struct CallResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl ToolServerClient {
    /// Create a client for the tool server at `base_url`
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server is up
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let health: HealthResponse = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Tool server '{}' unreachable at {}", self.name, url))?
            .error_for_status()?
            .json()
            .await?;

        if health.status != "ok" {
            return Err(anyhow!("Tool server '{}' reported status {}", self.name, health.status));
        }
        Ok(())
    }

    /// Fetch the server's tool definitions
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let url = format!("{}/tools", self.base_url);
        let tools: Vec<ToolDefinition> = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to list tools from '{}' server", self.name))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Invalid tool list from '{}' server", self.name))?;

        debug!("Server '{}' exposes {} tools", self.name, tools.len());
        Ok(tools)
    }

    /// Execute a tool on the server
    pub async fn call(&self, tool_name: &str, input: Value) -> Result<String> {
        let url = format!("{}/tools/{}", self.base_url, tool_name);
        let response = self
            .client
            .post(&url)
            .json(&input)
            .send()
            .await
            .with_context(|| format!("Failed to call tool '{}' on '{}' server", tool_name, self.name))?;

        let status = response.status();
        let body: CallResponse = response
            .json()
            .await
            .with_context(|| format!("Invalid response from tool '{}' on '{}' server", tool_name, self.name))?;

        if let Some(error) = body.error {
            return Err(anyhow!("Tool '{}' failed ({}): {}", tool_name, status, error));
        }

        body.result
            .ok_or_else(|| anyhow!("Tool '{}' returned neither result nor error", tool_name))
    }
}

/// A tool whose execution is forwarded to a tool server
pub struct RemoteTool {
    definition: ToolDefinition,
    server: Arc<ToolServerClient>,
}

impl RemoteTool {
    pub fn new(definition: ToolDefinition, server: Arc<ToolServerClient>) -> Self {
        Self { definition, server }
    }
}

#[async_trait]
impl ToolHandler for RemoteTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn input_schema(&self) -> Value {
        self.definition.input_schema.clone()
    }

    async fn execute(&self, input: Value) -> Result<String> {
        self.server.call(&self.definition.name, input).await
    }
}

/// Build a registry from everything a tool server exposes.
///
/// An unreachable server yields an empty registry with a warning rather than
/// a hard failure, so the assistant can still answer without tools while the
/// server is down.
pub async fn registry_from_server(server: Arc<ToolServerClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    match server.list_tools().await {
        Ok(definitions) => {
            for definition in definitions {
                registry.register(Arc::new(RemoteTool::new(definition, server.clone())));
            }
            info!(
                "Connected to '{}' tool server at {} ({} tools)",
                server.name(),
                server.base_url(),
                registry.len()
            );
        }
        Err(e) => {
            warn!(
                "Could not load tools from '{}' server: {}; continuing without them",
                server.name(),
                e
            );
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let client = ToolServerClient::new("weather", "http://localhost:5004/");
        assert_eq!(client.base_url(), "http://localhost:5004");

        let client = ToolServerClient::new("weather", "http://localhost:5004");
        assert_eq!(client.base_url(), "http://localhost:5004");
    }

    #[test]
    fn test_call_response_parsing() {
        let ok: CallResponse = serde_json::from_str(r#"{"result":"sunny"}"#).unwrap();
        assert_eq!(ok.result.as_deref(), Some("sunny"));
        assert!(ok.error.is_none());

        let err: CallResponse = serde_json::from_str(r#"{"error":"unknown tool"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("unknown tool"));
        assert!(err.result.is_none());
    }

    #[test]
    fn test_remote_tool_exposes_definition() {
        let server = Arc::new(ToolServerClient::new("weather", "http://localhost:5004"));
        let tool = RemoteTool::new(
            ToolDefinition {
                name: "check_weather".to_string(),
                description: "Check the weather in a location".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            },
            server,
        );
        assert_eq!(tool.name(), "check_weather");
        assert!(tool.description().contains("weather"));
    }

    #[tokio::test]
    async fn test_registry_from_unreachable_server() {
        // Port 9 (discard) is never a tool server; registry should come back empty
        let server = Arc::new(ToolServerClient::new("weather", "http://127.0.0.1:9"));
        let registry = registry_from_server(server).await;
        assert!(registry.is_empty());
    }
}
