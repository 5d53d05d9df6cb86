//! Specialist agents and the assistant pipeline

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::context::build_system_prompt;
use crate::guardrail::{self, GuardrailConfig, GuardrailDecision};
use crate::router::{self, CLARIFICATION_MESSAGE, Route, RouterConfig};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::types::{AgentKind, ChatTurn, TravelReply, TravelRequest};

/// Reply sent when the pipeline fails unexpectedly
pub const ERROR_MESSAGE: &str =
    "I encountered an error while processing your request. Please try again.";

/// A specialist agent: instruction text plus its tool registry
pub struct Specialist {
    pub kind: AgentKind,
    pub instructions: String,
    pub tools: Arc<ToolRegistry>,
}

impl Specialist {
    /// Create a specialist of the given kind with the standard instructions
    pub fn new(kind: AgentKind, tools: Arc<ToolRegistry>) -> Self {
        Self {
            kind,
            instructions: instructions_for(kind).to_string(),
            tools,
        }
    }

    /// Override the instruction text
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

fn instructions_for(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Weather => {
            "You are a knowledgeable and helpful weather assistant. Answer questions about \
             the weather using the provided tools. Always invoke a relevant tool to gather \
             accurate, real-time information.\n\n\
             - Current conditions: use `check_weather(location)`.\n\
             - Best days to travel: use `get_best_trip_days(location)`.\n\
             - Severe weather events (rain, snow, heatwaves, storms): use \
             `get_weather_events(location)`.\n\n\
             Respond clearly and concisely, summarizing the tool output. Only if the question \
             is clearly unrelated to weather (hotels → booking, attractions → places, full \
             trip plans → planner), reply exactly: \"I'll transfer you to the [agent name] \
             agent who can help with [specific request].\" Never transfer for questions about \
             temperature, rain, snow, trip days, or weather alerts."
        }
        AgentKind::Booking => {
            "You are a professional accommodation booking assistant with conversation memory. \
             Help users find accommodations using the tools provided. Always try to invoke \
             a relevant tool.\n\n\
             - Search by location and dates: use `search_availability(...)`.\n\
             - Apply filters (star rating, price range, type): use \
             `search_specific_accommodations(...)`.\n\
             - Details for one property: use `get_accommodation_details(hotel_id)`.\n\n\
             Extract parameters from the request, and use the conversation history to fill in \
             missing details: previously mentioned destinations, travel dates, guest count, \
             and budget. Resolve references like \"there\" or \"my trip\" from history. \
             Respond with helpful, structured summaries of the results. Do not include \
             handoff messages in your response unless the request is entirely outside \
             accommodation booking."
        }
        AgentKind::Places => {
            "You are an expert local guide and places discovery assistant with conversation \
             memory. Help users discover interesting places and activities using the tools \
             provided.\n\n\
             - Search for restaurants, museums, landmarks and more: use \
             `search_places(location, place_type, radius, limit)`.\n\
             - Weather-appropriate suggestions: use \
             `recommend_places_by_weather(location, weather_condition)` \
             (sunny, rainy, cloudy, snowy, windy, hot, cold).\n\
             - Suggestions by travel distance: use \
             `recommend_places_by_distance(location, travel_mode)` \
             (walking, short_drive, day_trip, extended).\n\n\
             Use conversation history to fill in missing context (location, preferences, trip \
             style) and resolve references like \"there\" or \"that area\". Summarize results \
             in a clear, engaging way. Avoid handing off unless the query clearly falls \
             outside your scope."
        }
        AgentKind::Planner => {
            "You are a comprehensive trip planning expert with conversation memory. Design \
             detailed, personalized itineraries based on preferences, weather, and local \
             attractions using the tools provided.\n\n\
             - Complete multi-day itineraries: use `plan_complete_trip(...)`.\n\
             - Plans optimized for a preferred weather condition: use \
             `plan_weather_optimized_trip(...)`.\n\n\
             Extract location, start date, duration, budget, and style from the request, and \
             fill in missing trip details from the conversation history. Synthesize weather, \
             places, and accommodation data into a seamless itinerary. Avoid handing off \
             unless the request is clearly outside trip planning."
        }
    }
}

/// The assistant: guardrail, capability router, and specialist agents
pub struct Assistant {
    api: ApiClient,
    guardrail_config: GuardrailConfig,
    router_config: RouterConfig,
    specialists: HashMap<AgentKind, Specialist>,
}

impl Assistant {
    /// Create an assistant with no specialists registered yet
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            guardrail_config: GuardrailConfig::default(),
            router_config: RouterConfig::default(),
            specialists: HashMap::new(),
        }
    }

    /// Register a specialist agent
    pub fn with_specialist(mut self, specialist: Specialist) -> Self {
        self.specialists.insert(specialist.kind, specialist);
        self
    }

    /// Set the guardrail configuration
    pub fn with_guardrail_config(mut self, config: GuardrailConfig) -> Self {
        self.guardrail_config = config;
        self
    }

    /// Set the router configuration
    pub fn with_router_config(mut self, config: RouterConfig) -> Self {
        self.router_config = config;
        self
    }

    /// Number of registered specialists
    pub fn specialist_count(&self) -> usize {
        self.specialists.len()
    }

    /// Process a user request end to end: guardrail, routing, specialist
    /// dispatch, handoff fallback. Never returns an error to the caller —
    /// failures become the canned error reply.
    pub async fn process(&self, request: &TravelRequest, history: &[ChatTurn]) -> TravelReply {
        info!(
            "Processing request {} on session {}",
            request.id, request.session_id
        );

        match self.process_inner(request, history).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Error processing request {}: {:#}", request.id, e);
                TravelReply {
                    content: ERROR_MESSAGE.to_string(),
                    agent: None,
                    reply_to: Some(request.id.clone()),
                }
            }
        }
    }

    async fn process_inner(
        &self,
        request: &TravelRequest,
        history: &[ChatTurn],
    ) -> Result<TravelReply> {
        let decision =
            guardrail::check_input(&request.content, Some(&self.api), &self.guardrail_config)
                .await
                .context("Guardrail check failed")?;

        if let GuardrailDecision::Block { reasoning } = decision {
            info!("Guardrail blocked request {}: {}", request.id, reasoning);
            return Ok(TravelReply {
                content: guardrail::REFUSAL_MESSAGE.to_string(),
                agent: None,
                reply_to: Some(request.id.clone()),
            });
        }

        let route = router::route_request(&request.content, Some(&self.api), &self.router_config)
            .await
            .context("Routing failed")?;

        let kind = match route {
            Route::Dispatch(kind) => kind,
            Route::Clarify => {
                debug!("No capability matched request {}", request.id);
                return Ok(TravelReply {
                    content: CLARIFICATION_MESSAGE.to_string(),
                    agent: None,
                    reply_to: Some(request.id.clone()),
                });
            }
        };

        let reply = self.dispatch(kind, request, history).await?;

        // One handoff bounce: a specialist may decline with a transfer phrase
        if let Some(target) = router::detect_handoff(&reply.content)
            && target != kind
            && self.specialists.contains_key(&target)
        {
            info!("Specialist {} handed request {} to {}", kind, request.id, target);
            return self.dispatch(target, request, history).await;
        }

        Ok(reply)
    }

    async fn dispatch(
        &self,
        kind: AgentKind,
        request: &TravelRequest,
        history: &[ChatTurn],
    ) -> Result<TravelReply> {
        let specialist = self
            .specialists
            .get(&kind)
            .with_context(|| format!("No {} specialist registered", kind))?;

        debug!("Dispatching request {} to {} agent", request.id, kind);

        let system_prompt = build_system_prompt(&specialist.instructions, history);
        let tool_definitions = specialist.tools.list_tools();

        let (content, usage) = self
            .api
            .run_tool_loop(
                &request.content,
                &system_prompt,
                &tool_definitions,
                specialist.tools.as_ref(),
            )
            .await
            .with_context(|| format!("{} agent failed", kind))?;

        info!(
            "{} agent answered request {} ({} chars, {} tokens)",
            kind,
            request.id,
            content.len(),
            usage.total_tokens()
        );

        Ok(TravelReply {
            content,
            agent: Some(kind),
            reply_to: Some(request.id.clone()),
        })
    }
}
