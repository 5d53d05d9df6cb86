//! Travel-topic input guardrail
//!
//! Screens user input before it reaches any agent: travel questions and
//! greetings pass, everything else is blocked with a fixed refusal. A cheap
//! keyword screen runs first; when LLM classification is enabled, inputs the
//! screen would reject get a second opinion before being blocked. Classifier
//! failures never block a request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiMessage, ContentBlock, MessageContent};

/// Refusal sent to the user when the guardrail trips
pub const REFUSAL_MESSAGE: &str = "I can only help with travel-related questions and greetings. \
     Please ask about weather, accommodations, places to visit, or trip planning.";

/// Classification of a user input
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TravelCheck {
    pub is_travel_query: bool,
    pub is_greeting: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl TravelCheck {
    fn allows(&self) -> bool {
        self.is_travel_query || self.is_greeting
    }
}

/// Outcome of the guardrail check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Block { reasoning: String },
}

/// Configuration for the input guardrail
#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    pub enabled: bool,
    /// Whether a borderline input gets an LLM second opinion before blocking
    pub use_llm_classification: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_llm_classification: false,
        }
    }
}

/// Check an input against the guardrail
pub async fn check_input(
    text: &str,
    api: Option<&ApiClient>,
    config: &GuardrailConfig,
) -> Result<GuardrailDecision> {
    if !config.enabled {
        return Ok(GuardrailDecision::Allow);
    }

    let heuristic = classify_heuristic(text);
    if heuristic.allows() {
        debug!("Guardrail heuristic allowed input ({})", heuristic.reasoning);
        return Ok(GuardrailDecision::Allow);
    }

    if config.use_llm_classification
        && let Some(api) = api
    {
        match classify_with_llm(api, text).await {
            Ok(check) if check.allows() => {
                debug!("Guardrail LLM allowed input: {}", check.reasoning);
                return Ok(GuardrailDecision::Allow);
            }
            Ok(check) => {
                return Ok(GuardrailDecision::Block {
                    reasoning: check.reasoning,
                });
            }
            Err(e) => {
                // Never block on classifier failure
                warn!("Guardrail classification failed, allowing input: {}", e);
                return Ok(GuardrailDecision::Allow);
            }
        }
    }

    Ok(GuardrailDecision::Block {
        reasoning: heuristic.reasoning,
    })
}

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "how are you",
    "thanks",
    "thank you",
    "goodbye",
    "bye",
];

const TRAVEL_SIGNALS: &[&str] = &[
    "travel",
    "trip",
    "vacation",
    "holiday",
    "destination",
    "weather",
    "forecast",
    "temperature",
    "rain",
    "snow",
    "storm",
    "hotel",
    "accommodation",
    "booking",
    "hostel",
    "apartment",
    "resort",
    "stay",
    "restaurant",
    "museum",
    "attraction",
    "places",
    "sightseeing",
    "activities",
    "itinerary",
    "flight",
    "visit",
    "tour",
    "city",
    "beach",
];

/// Keyword screen — allows greetings and anything mentioning a travel topic
fn classify_heuristic(text: &str) -> TravelCheck {
    let lower = text.to_lowercase();
    let trimmed = lower.trim().trim_end_matches(['!', '.', '?']);

    let is_greeting = GREETINGS
        .iter()
        .any(|g| trimmed == *g || trimmed.starts_with(&format!("{} ", g)));

    let is_travel_query = TRAVEL_SIGNALS.iter().any(|s| lower.contains(s));

    let reasoning = if is_greeting {
        "greeting".to_string()
    } else if is_travel_query {
        "mentions a travel topic".to_string()
    } else {
        "no travel topic or greeting detected".to_string()
    };

    TravelCheck {
        is_travel_query,
        is_greeting,
        reasoning,
    }
}

/// LLM classification returning a [`TravelCheck`] as JSON
async fn classify_with_llm(api: &ApiClient, text: &str) -> Result<TravelCheck> {
    let prompt = format!(
        "Determine if the user query is related to travel assistance (weather, booking, \
         places, planning) OR if it's a greeting/polite conversation starter.\n\n\
         Travel queries include: weather, accommodations, hotels, restaurants, attractions, \
         trip planning, itineraries, flights, etc.\n\
         Greetings include: hello, hi, good morning/afternoon/evening, how are you, thanks, \
         thank you, goodbye, bye, etc.\n\n\
         Respond with ONLY a JSON object: {{\"is_travel_query\": bool, \"is_greeting\": bool, \
         \"reasoning\": string}}\n\n\
         Query: {}",
        text
    );

    let messages = vec![ApiMessage {
        role: "user".to_string(),
        content: MessageContent::Text(prompt),
    }];

    let response = api
        .chat(
            &messages,
            &[],
            "You are a strict classifier. Respond with a single JSON object and nothing else.",
        )
        .await
        .context("Failed to classify input")?;

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

    parse_check(&text)
}

/// Parse a TravelCheck from model output, tolerating surrounding prose
fn parse_check(text: &str) -> Result<TravelCheck> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => text,
    };
    serde_json::from_str(json).context("Classifier did not return valid TravelCheck JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_greetings() {
        assert!(classify_heuristic("hello").is_greeting);
        assert!(classify_heuristic("Good morning!").is_greeting);
        assert!(classify_heuristic("thank you").is_greeting);
        assert!(classify_heuristic("hey there").is_greeting);
    }

    #[test]
    fn test_heuristic_travel() {
        assert!(classify_heuristic("What's the weather in Rome?").is_travel_query);
        assert!(classify_heuristic("Find me a hotel").is_travel_query);
        assert!(classify_heuristic("Best restaurants in Lyon").is_travel_query);
        assert!(classify_heuristic("Plan my trip to Kyoto").is_travel_query);
    }

    #[test]
    fn test_heuristic_off_topic() {
        let check = classify_heuristic("Write me a Python script");
        assert!(!check.is_travel_query);
        assert!(!check.is_greeting);
    }

    #[tokio::test]
    async fn test_check_input_allows_travel() {
        let config = GuardrailConfig::default();
        let decision = check_input("weather in Oslo", None, &config).await.unwrap();
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[tokio::test]
    async fn test_check_input_allows_greeting() {
        let config = GuardrailConfig::default();
        let decision = check_input("hello", None, &config).await.unwrap();
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[tokio::test]
    async fn test_check_input_blocks_off_topic() {
        let config = GuardrailConfig::default();
        let decision = check_input("solve this equation for me", None, &config)
            .await
            .unwrap();
        assert!(matches!(decision, GuardrailDecision::Block { .. }));
    }

    #[tokio::test]
    async fn test_check_input_disabled() {
        let config = GuardrailConfig {
            enabled: false,
            ..Default::default()
        };
        let decision = check_input("solve this equation", None, &config).await.unwrap();
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn test_parse_check_plain_json() {
        let check = parse_check(r#"{"is_travel_query": true, "is_greeting": false, "reasoning": "asks about hotels"}"#).unwrap();
        assert!(check.is_travel_query);
        assert!(!check.is_greeting);
    }

    #[test]
    fn test_parse_check_with_surrounding_prose() {
        let check = parse_check(
            "Here is my assessment: {\"is_travel_query\": false, \"is_greeting\": true, \"reasoning\": \"says hi\"} Hope that helps.",
        )
        .unwrap();
        assert!(check.is_greeting);
    }

    #[test]
    fn test_parse_check_invalid() {
        assert!(parse_check("not json at all").is_err());
    }
}
