//! Shared types for wayfare-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The specialist agents a request can be routed to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Weather,
    Booking,
    Places,
    Planner,
}

impl AgentKind {
    /// Parse an agent kind from a string (e.g., from a transfer phrase or config)
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "weather" => Some(Self::Weather),
            "booking" => Some(Self::Booking),
            "places" => Some(Self::Places),
            "planner" | "trip_planner" | "trip planner" => Some(Self::Planner),
            _ => None,
        }
    }

    /// All routable agent kinds
    pub fn all() -> [Self; 4] {
        [Self::Weather, Self::Booking, Self::Places, Self::Planner]
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weather => write!(f, "weather"),
            Self::Booking => write!(f, "booking"),
            Self::Places => write!(f, "places"),
            Self::Planner => write!(f, "planner"),
        }
    }
}

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of a conversation, kept as session memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Incoming user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelRequest {
    pub id: String,
    pub session_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TravelRequest {
    /// Build a request with a fresh ID, timestamped now
    pub fn new(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Reply produced by the assistant pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelReply {
    pub content: String,
    /// Which specialist answered, if any (None for controller replies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}
