//! Capability routing — the controller's handoff mechanism
//!
//! Analyzes a user request and picks the specialist agent that should handle
//! it: weather, booking, places, or the trip planner. Keyword heuristics run
//! first (fast, free); ambiguous requests can optionally be classified by
//! the LLM. Requests that match no capability fall back to a clarification
//! from the controller.

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{ApiClient, ApiMessage, ContentBlock, MessageContent};
use crate::types::AgentKind;

/// Outcome of routing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Hand the request to a specialist agent
    Dispatch(AgentKind),
    /// No capability matched — the controller asks the user to narrow down
    Clarify,
}

/// Configuration for the capability router
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Whether to use LLM-based classification for ambiguous requests
    pub use_llm_classification: bool,
    /// Whether the router is enabled at all
    pub enabled: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            use_llm_classification: false, // start with heuristics, cheaper
            enabled: true,
        }
    }
}

/// The controller's clarification reply when no capability matches
pub const CLARIFICATION_MESSAGE: &str = "I can help with weather forecasts, accommodation \
     bookings, places to visit, and trip planning. Could you tell me a bit more about what \
     you're looking for?";

/// Transfer phrase a dispatching controller (or a declining specialist) uses
pub fn transfer_phrase(agent: AgentKind, request: &str) -> String {
    format!(
        "I'll transfer you to the {} agent who can help with {}.",
        agent, request
    )
}

/// Route a request to the appropriate specialist.
///
/// Heuristics first; the LLM is only consulted for requests the heuristics
/// cannot place, and only when enabled.
pub async fn route_request(
    text: &str,
    api: Option<&ApiClient>,
    config: &RouterConfig,
) -> Result<Route> {
    if !config.enabled {
        return Ok(Route::Clarify);
    }

    if let Some(agent) = classify_heuristic(text) {
        debug!("Heuristic routed request to {} agent", agent);
        return Ok(Route::Dispatch(agent));
    }

    if config.use_llm_classification
        && let Some(api) = api
    {
        match classify_with_llm(api, text).await {
            Ok(route) => {
                debug!("LLM routed request as {:?}", route);
                return Ok(route);
            }
            Err(e) => {
                debug!("LLM routing failed, falling back to clarification: {}", e);
            }
        }
    }

    Ok(Route::Clarify)
}

/// Keyword signals per capability. Order within each list does not matter;
/// routing scores the number of distinct hits.
const PLANNER_SIGNALS: &[&str] = &[
    "itinerary",
    "itineraries",
    "plan a trip",
    "plan my trip",
    "trip plan",
    "plan a visit",
    "travel plan",
    "plan for",
    "day trip",
    "multi-day",
    "organize my",
    "days in",
];

const WEATHER_SIGNALS: &[&str] = &[
    "weather",
    "forecast",
    "temperature",
    "rain",
    "raining",
    "snow",
    "snowing",
    "sunny",
    "wind",
    "storm",
    "thunderstorm",
    "heatwave",
    "humidity",
    "cold",
    "umbrella",
    "best days",
];

const BOOKING_SIGNALS: &[&str] = &[
    "hotel",
    "hotels",
    "accommodation",
    "accommodations",
    "book",
    "booking",
    "room",
    "rooms",
    "stay",
    "hostel",
    "apartment",
    "resort",
    "villa",
    "guesthouse",
    "check-in",
    "checkin",
    "checkout",
    "night",
    "nights",
];

const PLACES_SIGNALS: &[&str] = &[
    "restaurant",
    "restaurants",
    "museum",
    "museums",
    "attraction",
    "attractions",
    "places to",
    "things to do",
    "sightseeing",
    "activities",
    "activity",
    "cafe",
    "cafes",
    "bar",
    "bars",
    "park",
    "parks",
    "landmark",
    "gallery",
    "nearby",
    "visit",
];

/// Heuristic-based capability matching (fast, no API call).
///
/// Planner signals win outright: a request like "plan a sunny weekend trip"
/// mentions weather but belongs to the planner, which coordinates the other
/// domains itself.
fn classify_heuristic(text: &str) -> Option<AgentKind> {
    let lower = text.to_lowercase();

    if PLANNER_SIGNALS.iter().any(|s| lower.contains(s)) {
        return Some(AgentKind::Planner);
    }

    let scores = [
        (AgentKind::Booking, count_hits(&lower, BOOKING_SIGNALS)),
        (AgentKind::Weather, count_hits(&lower, WEATHER_SIGNALS)),
        (AgentKind::Places, count_hits(&lower, PLACES_SIGNALS)),
    ];

    let (best, best_score) = scores
        .iter()
        .copied()
        .max_by_key(|(_, score)| *score)
        .unwrap_or((AgentKind::Weather, 0));

    if best_score == 0 {
        return None;
    }

    // A tie between two domains is ambiguous; let the caller decide
    // (LLM classification or clarification).
    let tied = scores
        .iter()
        .filter(|(kind, score)| *score == best_score && *kind != best)
        .count();
    if tied > 0 {
        return None;
    }

    Some(best)
}

fn count_hits(lower: &str, signals: &[&str]) -> usize {
    signals.iter().filter(|s| lower.contains(*s)).count()
}

/// LLM-based capability classification for requests the heuristics cannot place
async fn classify_with_llm(api: &ApiClient, text: &str) -> Result<Route> {
    let classification_prompt = format!(
        "You are the controller of a travel assistant. Route this request to the right \
         specialist. Respond with ONLY one word:\n\
         - WEATHER: weather conditions, forecasts, or weather events\n\
         - BOOKING: accommodation bookings, availability, or hotel details\n\
         - PLACES: discovering places, attractions, or local activities\n\
         - PLANNER: detailed trip planning, itineraries, or travel coordination\n\
         - UNCLEAR: general or ambiguous requests\n\n\
         Request: {}\n\nRoute:",
        text
    );

    let messages = vec![ApiMessage {
        role: "user".to_string(),
        content: MessageContent::Text(classification_prompt),
    }];

    let response = api
        .chat(
            &messages,
            &[],
            "You are a request router. Respond with exactly one word.",
        )
        .await
        .context("Failed to classify request")?;

    let text: String = response
        .content
        .iter()
        .filter_map(|b| {
            if let ContentBlock::Text { text } = b {
                Some(text.as_str())
            } else {
                None
            }
        })
        .collect();

    let trimmed = text.trim().to_uppercase();
    Ok(match trimmed.as_str() {
        "WEATHER" => Route::Dispatch(AgentKind::Weather),
        "BOOKING" => Route::Dispatch(AgentKind::Booking),
        "PLACES" => Route::Dispatch(AgentKind::Places),
        "PLANNER" => Route::Dispatch(AgentKind::Planner),
        _ => Route::Clarify,
    })
}

/// Detect a transfer phrase in a specialist's reply.
///
/// Specialists are instructed to answer in-domain questions themselves and
/// only announce a transfer ("I'll transfer you to the booking agent…") when
/// the request is clearly outside their scope. The assistant honors exactly
/// one such bounce.
pub fn detect_handoff(reply: &str) -> Option<AgentKind> {
    let lower = reply.to_lowercase();
    let marker = "transfer you to the ";
    let start = lower.find(marker)? + marker.len();
    let rest = &lower[start..];
    let target = rest.split_whitespace().next()?;
    AgentKind::from_string(target.trim_matches(|c: char| !c.is_alphanumeric() && c != '_'))
}
