//! wayfare-core — the brain of the wayfare travel assistant
//!
//! This crate provides:
//! - The assistant pipeline: input guardrail, capability routing, specialist
//!   dispatch with a single handoff bounce
//! - Anthropic API client with full tool use loop support
//! - Tool registry plus remote tools proxied to standalone tool servers
//! - System prompt building with per-session conversation memory

pub mod agent;
pub mod api;
pub mod context;
pub mod guardrail;
pub mod router;
pub mod tools;
pub mod types;

// Re-export main types for convenience
pub use agent::{Assistant, ERROR_MESSAGE, Specialist};
pub use api::{ApiClient, ApiMessage, ApiResponse, ContentBlock, MessageContent, ToolDefinition};
pub use context::build_system_prompt;
pub use guardrail::{GuardrailConfig, GuardrailDecision, REFUSAL_MESSAGE, TravelCheck};
pub use router::{CLARIFICATION_MESSAGE, Route, RouterConfig};
pub use tools::remote::{RemoteTool, ToolServerClient, registry_from_server};
pub use tools::{ToolExecutor, ToolHandler, ToolRegistry};
pub use types::{AgentKind, ChatTurn, TravelReply, TravelRequest, TurnRole};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Just verify that all main types are exported
        let _ = std::mem::size_of::<Assistant>();
        let _ = std::mem::size_of::<ApiClient>();
        let _ = std::mem::size_of::<ToolRegistry>();
        let _ = std::mem::size_of::<TravelRequest>();
        let _ = std::mem::size_of::<TravelReply>();
    }
}
