//! Tool handlers wrapping the domain services
//!
//! Tool names, descriptions, and input schemas are the contract with the
//! agents. Service errors are relayed as tool output text so the agent can
//! explain them to the traveler; only missing required parameters abort a
//! call.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use wayfare_core::tools::{ToolHandler, ToolRegistry, json_schema};

use crate::booking::{
    BookingService, DEFAULT_ADULTS, DEFAULT_ROOMS, DEFAULT_ROWS, StayFilters, StaySearch,
};
use crate::http::ServiceError;
use crate::places::{DEFAULT_RADIUS_M, DEFAULT_RESULTS_LIMIT, PlaceQuery, PlacesService};
use crate::planner::PlannerService;
use crate::weather::WeatherService;

fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing '{}' parameter", key))
}

fn optional_str(input: &Value, key: &str) -> Option<String> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

fn optional_u64(input: &Value, key: &str) -> Option<u64> {
    input.get(key).and_then(|v| v.as_u64())
}

fn optional_f64(input: &Value, key: &str) -> Option<f64> {
    input.get(key).and_then(|v| v.as_f64())
}

/// Render a service result as tool output: formatted reports pass through,
/// errors become messages the agent can relay
fn relay(context: &str, result: Result<String, ServiceError>) -> Result<String> {
    match result {
        Ok(output) => Ok(output),
        Err(e) => Ok(e.user_message(context)),
    }
}

// ── Weather tools ──

pub struct CheckWeatherTool {
    service: Arc<WeatherService>,
}

#[async_trait]
impl ToolHandler for CheckWeatherTool {
    fn name(&self) -> &str {
        "check_weather"
    }

    fn description(&self) -> &str {
        "Check the current weather and short-term forecast for a location."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Location to check (city name, address, etc.)"
                }
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        relay("weather data fetch", self.service.current_weather(location).await)
    }
}

pub struct BestTripDaysTool {
    service: Arc<WeatherService>,
}

#[async_trait]
impl ToolHandler for BestTripDaysTool {
    fn name(&self) -> &str {
        "get_best_trip_days"
    }

    fn description(&self) -> &str {
        "Find the best days for a trip in the next week based on weather conditions."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Location to check"
                }
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        relay(
            "weather forecast data fetch",
            self.service.trip_recommendations(location).await,
        )
    }
}

pub struct WeatherEventsTool {
    service: Arc<WeatherService>,
}

#[async_trait]
impl ToolHandler for WeatherEventsTool {
    fn name(&self) -> &str {
        "get_weather_events"
    }

    fn description(&self) -> &str {
        "Get severe weather events (heavy rain, strong winds, thunderstorms, snow) \
         predicted for a location in the next few days."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Location to check"
                }
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        relay(
            "weather events data fetch",
            self.service.severe_weather_events(location).await,
        )
    }
}

/// Registry with all weather tools
pub fn weather_registry(service: Arc<WeatherService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CheckWeatherTool {
        service: service.clone(),
    }));
    registry.register(Arc::new(BestTripDaysTool {
        service: service.clone(),
    }));
    registry.register(Arc::new(WeatherEventsTool { service }));
    registry
}

// ── Booking tools ──

fn stay_search_from(input: &Value) -> StaySearch {
    let defaults = StaySearch::default();
    StaySearch {
        checkin: optional_str(input, "checkin").unwrap_or(defaults.checkin),
        checkout: optional_str(input, "checkout").unwrap_or(defaults.checkout),
        adults: optional_u64(input, "adults").unwrap_or(DEFAULT_ADULTS as u64) as u32,
        rooms: optional_u64(input, "rooms").unwrap_or(DEFAULT_ROOMS as u64) as u32,
        rows: optional_u64(input, "rows").unwrap_or(DEFAULT_ROWS as u64) as u32,
    }
}

pub struct SearchAvailabilityTool {
    service: Arc<BookingService>,
}

#[async_trait]
impl ToolHandler for SearchAvailabilityTool {
    fn name(&self) -> &str {
        "search_availability"
    }

    fn description(&self) -> &str {
        "Search for accommodation availability based on location and dates."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Location to search (city name, address, etc.)"
                },
                "checkin": {
                    "type": "string",
                    "description": "Check-in date in YYYY-MM-DD format"
                },
                "checkout": {
                    "type": "string",
                    "description": "Checkout date in YYYY-MM-DD format"
                },
                "adults": {
                    "type": "integer",
                    "description": "Number of adults (default: 2)"
                },
                "rooms": {
                    "type": "integer",
                    "description": "Number of rooms (default: 1)"
                },
                "rows": {
                    "type": "integer",
                    "description": "Number of results to return (default: 20, max: 100)"
                }
            }),
            vec!["location", "checkin", "checkout"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        let search = stay_search_from(&input);
        relay(
            "accommodation search",
            self.service.search_availability(location, &search).await,
        )
    }
}

pub struct SearchSpecificAccommodationsTool {
    service: Arc<BookingService>,
}

#[async_trait]
impl ToolHandler for SearchSpecificAccommodationsTool {
    fn name(&self) -> &str {
        "search_specific_accommodations"
    }

    fn description(&self) -> &str {
        "Search for accommodations with specific criteria like star rating, price range, \
         and accommodation type (hotel, apartment, resort, villa, hostel, \
         bed_and_breakfast, guesthouse)."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Location to search"
                },
                "checkin": {
                    "type": "string",
                    "description": "Check-in date in YYYY-MM-DD format"
                },
                "checkout": {
                    "type": "string",
                    "description": "Checkout date in YYYY-MM-DD format"
                },
                "star_rating": {
                    "type": "integer",
                    "description": "Hotel star rating (1-5)"
                },
                "price_min": {
                    "type": "number",
                    "description": "Minimum price per night"
                },
                "price_max": {
                    "type": "number",
                    "description": "Maximum price per night"
                },
                "accommodation_type": {
                    "type": "string",
                    "description": "Type of accommodation (hotel, apartment, resort, villa, hostel, bed_and_breakfast, guesthouse)"
                },
                "adults": {
                    "type": "integer",
                    "description": "Number of adults (default: 2)"
                },
                "rooms": {
                    "type": "integer",
                    "description": "Number of rooms (default: 1)"
                },
                "rows": {
                    "type": "integer",
                    "description": "Number of results to return (default: 20, max: 100)"
                }
            }),
            vec!["location", "checkin", "checkout"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        let search = stay_search_from(&input);
        let filters = StayFilters {
            star_rating: optional_u64(&input, "star_rating").map(|v| v as u8),
            price_min: optional_f64(&input, "price_min"),
            price_max: optional_f64(&input, "price_max"),
            accommodation_type: optional_str(&input, "accommodation_type"),
        };
        relay(
            "accommodation search",
            self.service.search_filtered(location, &search, &filters).await,
        )
    }
}

pub struct AccommodationDetailsTool {
    service: Arc<BookingService>,
}

#[async_trait]
impl ToolHandler for AccommodationDetailsTool {
    fn name(&self) -> &str {
        "get_accommodation_details"
    }

    fn description(&self) -> &str {
        "Get detailed information about a specific accommodation, including amenities, \
         contact details, reviews, and the booking URL."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "hotel_id": {
                    "type": "string",
                    "description": "Unique hotel identifier from search results"
                }
            }),
            vec!["hotel_id"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let hotel_id = required_str(&input, "hotel_id")?;
        relay(
            "accommodation details fetch",
            self.service.accommodation_details(hotel_id).await,
        )
    }
}

/// Registry with all booking tools
pub fn booking_registry(service: Arc<BookingService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchAvailabilityTool {
        service: service.clone(),
    }));
    registry.register(Arc::new(SearchSpecificAccommodationsTool {
        service: service.clone(),
    }));
    registry.register(Arc::new(AccommodationDetailsTool { service }));
    registry
}

// ── Places tools ──

pub struct SearchPlacesTool {
    service: Arc<PlacesService>,
}

#[async_trait]
impl ToolHandler for SearchPlacesTool {
    fn name(&self) -> &str {
        "search_places"
    }

    fn description(&self) -> &str {
        "Search for places like restaurants, museums, or landmarks around a location, \
         optionally filtered by type, rating, and price level."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Location to search around"
                },
                "place_type": {
                    "type": "string",
                    "description": "Type of place (e.g. restaurant, museum, park, tourist_attraction)"
                },
                "radius": {
                    "type": "integer",
                    "description": "Search radius in meters (default: 5000, max: 50000)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results (default: 20, max: 60)"
                },
                "min_rating": {
                    "type": "number",
                    "description": "Minimum rating filter (0-5)"
                },
                "price_level": {
                    "type": "string",
                    "description": "Price level filter (free, inexpensive, moderate, expensive, very_expensive)"
                }
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        let query = PlaceQuery {
            place_type: optional_str(&input, "place_type"),
            radius_m: optional_u64(&input, "radius").unwrap_or(DEFAULT_RADIUS_M as u64) as u32,
            limit: optional_u64(&input, "limit").unwrap_or(DEFAULT_RESULTS_LIMIT as u64) as usize,
            min_rating: optional_f64(&input, "min_rating"),
            price_level: optional_str(&input, "price_level"),
        };
        relay("places search", self.service.search(location, &query).await)
    }
}

pub struct RecommendByWeatherTool {
    service: Arc<PlacesService>,
}

#[async_trait]
impl ToolHandler for RecommendByWeatherTool {
    fn name(&self) -> &str {
        "recommend_places_by_weather"
    }

    fn description(&self) -> &str {
        "Recommend places that fit a weather condition \
         (sunny, rainy, cloudy, snowy, windy, hot, cold)."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Location to search around"
                },
                "weather_condition": {
                    "type": "string",
                    "description": "Weather condition (sunny, rainy, cloudy, snowy, windy, hot, cold)"
                },
                "max_distance": {
                    "type": "integer",
                    "description": "Maximum distance in meters (default: 5000)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of recommendations (default: 20)"
                }
            }),
            vec!["location", "weather_condition"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        let condition = required_str(&input, "weather_condition")?;
        let max_distance = optional_u64(&input, "max_distance").unwrap_or(DEFAULT_RADIUS_M as u64) as u32;
        let limit = optional_u64(&input, "limit").unwrap_or(DEFAULT_RESULTS_LIMIT as u64) as usize;
        relay(
            "places recommendation",
            self.service
                .recommend_by_weather(location, condition, max_distance, limit)
                .await,
        )
    }
}

pub struct RecommendByDistanceTool {
    service: Arc<PlacesService>,
}

#[async_trait]
impl ToolHandler for RecommendByDistanceTool {
    fn name(&self) -> &str {
        "recommend_places_by_distance"
    }

    fn description(&self) -> &str {
        "Recommend places within reach of a travel mode \
         (walking, short_drive, day_trip, extended)."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Starting location"
                },
                "travel_mode": {
                    "type": "string",
                    "description": "Travel mode (walking, short_drive, day_trip, extended)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of recommendations (default: 20)"
                }
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        let mode = optional_str(&input, "travel_mode").unwrap_or_else(|| "walking".to_string());
        let limit = optional_u64(&input, "limit").unwrap_or(DEFAULT_RESULTS_LIMIT as u64) as usize;
        relay(
            "places recommendation",
            self.service.recommend_by_distance(location, &mode, limit).await,
        )
    }
}

/// Registry with all places tools
pub fn places_registry(service: Arc<PlacesService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchPlacesTool {
        service: service.clone(),
    }));
    registry.register(Arc::new(RecommendByWeatherTool {
        service: service.clone(),
    }));
    registry.register(Arc::new(RecommendByDistanceTool { service }));
    registry
}

// ── Trip planner tools ──

pub struct PlanCompleteTripTool {
    service: Arc<PlannerService>,
}

#[async_trait]
impl ToolHandler for PlanCompleteTripTool {
    fn name(&self) -> &str {
        "plan_complete_trip"
    }

    fn description(&self) -> &str {
        "Plan a complete trip with a daily itinerary and an accommodation suggestion. \
         Without a start date, the best weather window in the next two weeks is chosen."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Destination city or location name"
                },
                "start_date": {
                    "type": "string",
                    "description": "Trip start date in YYYY-MM-DD format (omit for weather-based date selection)"
                },
                "duration": {
                    "type": ["integer", "string"],
                    "description": "Trip duration in days (1-30) or a preset (weekend, short, week, extended, month)"
                },
                "trip_style": {
                    "type": "string",
                    "description": "Trip style (relaxed, balanced, adventure, cultural, food_focused)"
                },
                "budget": {
                    "type": "string",
                    "description": "Budget category (budget, mid_range, luxury)"
                },
                "include_accommodation": {
                    "type": "boolean",
                    "description": "Whether to include an accommodation suggestion (default: true)"
                }
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        let start_date = optional_str(&input, "start_date");
        let trip_style = optional_str(&input, "trip_style").unwrap_or_else(|| "balanced".to_string());
        let budget = optional_str(&input, "budget").unwrap_or_else(|| "mid_range".to_string());
        let include_accommodation = input
            .get("include_accommodation")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        relay(
            "trip planning",
            self.service
                .plan_complete_trip(
                    location,
                    start_date.as_deref(),
                    input.get("duration"),
                    &trip_style,
                    &budget,
                    include_accommodation,
                )
                .await,
        )
    }
}

pub struct PlanWeatherOptimizedTripTool {
    service: Arc<PlannerService>,
}

#[async_trait]
impl ToolHandler for PlanWeatherOptimizedTripTool {
    fn name(&self) -> &str {
        "plan_weather_optimized_trip"
    }

    fn description(&self) -> &str {
        "Plan a trip optimized for a preferred weather condition, scheduling activities \
         that fit that weather for each part of the day."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "location": {
                    "type": "string",
                    "description": "Destination city or location name"
                },
                "weather_condition": {
                    "type": "string",
                    "description": "Preferred weather (sunny, clear, partly_cloudy, cloudy, overcast, rainy, snowy)"
                },
                "duration": {
                    "type": ["integer", "string"],
                    "description": "Trip duration in days (1-30) or a preset"
                },
                "trip_style": {
                    "type": "string",
                    "description": "Trip style (relaxed, balanced, adventure, cultural, food_focused)"
                }
            }),
            vec!["location", "weather_condition"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let location = required_str(&input, "location")?;
        let condition = required_str(&input, "weather_condition")?;
        let trip_style = optional_str(&input, "trip_style").unwrap_or_else(|| "balanced".to_string());

        relay(
            "trip planning",
            self.service
                .plan_weather_optimized_trip(location, condition, input.get("duration"), &trip_style)
                .await,
        )
    }
}

/// Registry with all trip planner tools
pub fn planner_registry(service: Arc<PlannerService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(PlanCompleteTripTool {
        service: service.clone(),
    }));
    registry.register(Arc::new(PlanWeatherOptimizedTripTool { service }));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Geocoder;
    use wayfare_core::tools::ToolExecutor;

    fn geocoder() -> Arc<Geocoder> {
        Arc::new(Geocoder::new())
    }

    #[test]
    fn test_weather_registry_names() {
        let registry = weather_registry(Arc::new(WeatherService::new(geocoder())));
        assert_eq!(registry.len(), 3);
        assert!(registry.get("check_weather").is_some());
        assert!(registry.get("get_best_trip_days").is_some());
        assert!(registry.get("get_weather_events").is_some());
    }

    #[test]
    fn test_booking_registry_names() {
        let registry = booking_registry(Arc::new(BookingService::new(None, geocoder())));
        assert_eq!(registry.len(), 3);
        assert!(registry.get("search_availability").is_some());
        assert!(registry.get("search_specific_accommodations").is_some());
        assert!(registry.get("get_accommodation_details").is_some());
    }

    #[test]
    fn test_places_registry_names() {
        let registry = places_registry(Arc::new(PlacesService::new(None, geocoder())));
        assert_eq!(registry.len(), 3);
        assert!(registry.get("search_places").is_some());
    }

    #[test]
    fn test_planner_registry_names() {
        let geocoder = geocoder();
        let weather = Arc::new(WeatherService::new(geocoder.clone()));
        let places = Arc::new(PlacesService::new(None, geocoder.clone()));
        let booking = Arc::new(BookingService::new(None, geocoder.clone()));
        let planner = Arc::new(PlannerService::new(weather, places, booking, geocoder));
        let registry = planner_registry(planner);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("plan_complete_trip").is_some());
        assert!(registry.get("plan_weather_optimized_trip").is_some());
    }

    #[tokio::test]
    async fn test_missing_required_parameter() {
        let registry = weather_registry(Arc::new(WeatherService::new(geocoder())));
        let result = registry.execute("check_weather", serde_json::json!({})).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("location"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_relayed_as_output() {
        // No Booking.com key configured: the tool reports it as output text,
        // not a hard failure, so the agent can tell the user
        let registry = booking_registry(Arc::new(BookingService::new(None, geocoder())));
        let output = registry
            .execute(
                "search_specific_accommodations",
                serde_json::json!({
                    "location": "Lisbon",
                    "checkin": "2099-01-01",
                    "checkout": "2099-01-05"
                }),
            )
            .await
            .unwrap();
        assert!(output.contains("Booking.com API key"));
    }

    #[tokio::test]
    async fn test_invalid_travel_mode_is_relayed() {
        let registry = places_registry(Arc::new(PlacesService::new(
            Some("test-key".to_string()),
            geocoder(),
        )));
        let output = registry
            .execute(
                "recommend_places_by_distance",
                serde_json::json!({"location": "Lisbon", "travel_mode": "teleport"}),
            )
            .await
            .unwrap();
        assert!(output.contains("not supported"));
    }

    #[test]
    fn test_stay_search_from_input() {
        let input = serde_json::json!({
            "checkin": "2026-09-01",
            "checkout": "2026-09-04",
            "adults": 3
        });
        let search = stay_search_from(&input);
        assert_eq!(search.checkin, "2026-09-01");
        assert_eq!(search.adults, 3);
        assert_eq!(search.rooms, DEFAULT_ROOMS);
    }

    #[test]
    fn test_schemas_mark_required_fields() {
        let tool = SearchAvailabilityTool {
            service: Arc::new(BookingService::new(None, geocoder())),
        };
        let schema = tool.input_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["location", "checkin", "checkout"]);
    }
}
