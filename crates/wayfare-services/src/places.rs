//! Places service — nearby search and recommendations via the Google Places
//! API. Requires `GOOGLE_PLACES_API_KEY`.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::geo::{Coordinates, Geocoder, haversine_km};
use crate::http::{ServiceError, UpstreamClient};

pub const GOOGLE_PLACES_API_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

const NEARBY_SEARCH_ENDPOINT: &str = "/nearbysearch/json";

const DEFAULT_LANGUAGE: &str = "en";

/// Search radius bounds in meters
pub const MAX_SEARCH_RADIUS_M: u32 = 50_000;
pub const DEFAULT_RADIUS_M: u32 = 5_000;

pub const DEFAULT_RESULTS_LIMIT: usize = 20;
const MAX_RESULTS_LIMIT: usize = 60;
const MIN_RESULTS_LIMIT: usize = 5;

/// Place types accepted by `search_places` (Google Places categories)
const PLACE_TYPES: &[&str] = &[
    // Attractions & entertainment
    "tourist_attraction",
    "amusement_park",
    "aquarium",
    "art_gallery",
    "museum",
    "zoo",
    "casino",
    "movie_theater",
    "night_club",
    // Food & dining
    "restaurant",
    "cafe",
    "bar",
    "bakery",
    "meal_takeaway",
    // Shopping
    "shopping_mall",
    "store",
    "clothing_store",
    "book_store",
    // Accommodation
    "lodging",
    // Transportation
    "airport",
    "bus_station",
    "subway_station",
    "train_station",
    // Nature & outdoor
    "park",
    "campground",
    "rv_park",
    // Religious & cultural
    "church",
    "hindu_temple",
    "mosque",
    "synagogue",
    // Health & services
    "hospital",
    "pharmacy",
    "bank",
    "atm",
    "gas_station",
];

const PRICE_LEVELS: &[(&str, u8)] = &[
    ("free", 0),
    ("inexpensive", 1),
    ("moderate", 2),
    ("expensive", 3),
    ("very_expensive", 4),
];

/// Weather condition → place types worth recommending
const WEATHER_PLACE_MAPPING: &[(&str, &[&str])] = &[
    ("sunny", &["park", "tourist_attraction", "zoo", "amusement_park"]),
    ("rainy", &["museum", "art_gallery", "shopping_mall", "movie_theater", "aquarium"]),
    ("cloudy", &["tourist_attraction", "museum", "restaurant", "cafe"]),
    ("snowy", &["museum", "shopping_mall", "restaurant", "cafe", "art_gallery"]),
    ("windy", &["museum", "shopping_mall", "restaurant", "cafe"]),
    ("hot", &["aquarium", "museum", "shopping_mall", "movie_theater", "cafe"]),
    ("cold", &["museum", "restaurant", "shopping_mall", "movie_theater", "bar"]),
];

/// How far a traveler is willing to go, and what fits in that range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Walking,
    ShortDrive,
    DayTrip,
    Extended,
}

impl TravelMode {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "walking" => Some(Self::Walking),
            "short_drive" => Some(Self::ShortDrive),
            "day_trip" => Some(Self::DayTrip),
            "extended" => Some(Self::Extended),
            _ => None,
        }
    }

    pub fn radius_m(self) -> u32 {
        match self {
            Self::Walking => 2_000,
            Self::ShortDrive => 10_000,
            Self::DayTrip => 50_000,
            Self::Extended => 100_000,
        }
    }

    fn place_types(self) -> &'static [&'static str] {
        match self {
            Self::Walking => &["restaurant", "cafe", "store", "park"],
            Self::ShortDrive => &["tourist_attraction", "museum", "shopping_mall"],
            Self::DayTrip => &["amusement_park", "zoo", "tourist_attraction", "park"],
            Self::Extended => &["tourist_attraction", "lodging", "airport"],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Walking => "Walking",
            Self::ShortDrive => "Short Drive",
            Self::DayTrip => "Day Trip",
            Self::Extended => "Extended",
        }
    }
}

fn travel_mode_names() -> &'static str {
    "walking, short_drive, day_trip, extended"
}

fn weather_place_types(condition: &str) -> Option<&'static [&'static str]> {
    let lower = condition.to_lowercase();
    WEATHER_PLACE_MAPPING
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, types)| *types)
}

fn weather_condition_names() -> String {
    WEATHER_PLACE_MAPPING
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Search parameters for `search_places`
#[derive(Debug, Clone)]
pub struct PlaceQuery {
    pub place_type: Option<String>,
    pub radius_m: u32,
    pub limit: usize,
    pub min_rating: Option<f64>,
    pub price_level: Option<String>,
}

impl Default for PlaceQuery {
    fn default() -> Self {
        Self {
            place_type: None,
            radius_m: DEFAULT_RADIUS_M,
            limit: DEFAULT_RESULTS_LIMIT,
            min_rating: None,
            price_level: None,
        }
    }
}

/// Service for place discovery and recommendations
pub struct PlacesService {
    api_key: Option<String>,
    geocoder: Arc<Geocoder>,
    client: UpstreamClient,
}

impl PlacesService {
    pub fn new(api_key: Option<String>, geocoder: Arc<Geocoder>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            geocoder,
            client: UpstreamClient::new(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn require_key(&self) -> Result<&str, ServiceError> {
        self.api_key.as_deref().ok_or(ServiceError::MissingApiKey {
            service: "Google Places API",
        })
    }

    /// Search for places around a location, formatted for the traveler
    pub async fn search(&self, location: &str, query: &PlaceQuery) -> Result<String, ServiceError> {
        self.require_key()?;
        validate_query(query)?;
        let coords = self.geocoder.resolve(location).await?;
        let places = self.search_data(coords, query).await?;
        Ok(format_places_results(location, &places, query.place_type.as_deref()))
    }

    /// Search for places and return structured data (used by the planner)
    pub async fn search_data(
        &self,
        coords: Coordinates,
        query: &PlaceQuery,
    ) -> Result<Vec<Value>, ServiceError> {
        let key = self.require_key()?.to_string();
        validate_query(query)?;

        let mut params = vec![
            ("location", format!("{},{}", coords.latitude, coords.longitude)),
            ("radius", query.radius_m.min(MAX_SEARCH_RADIUS_M).to_string()),
            ("key", key),
            ("language", DEFAULT_LANGUAGE.to_string()),
        ];

        if let Some(place_type) = &query.place_type {
            params.push(("type", place_type.clone()));
        }
        if let Some(level) = query
            .price_level
            .as_deref()
            .and_then(|l| PRICE_LEVELS.iter().find(|(n, _)| *n == l))
        {
            params.push(("maxprice", level.1.to_string()));
            params.push(("minprice", "0".to_string()));
        }

        let url = format!("{}{}", GOOGLE_PLACES_API_BASE_URL, NEARBY_SEARCH_ENDPOINT);
        let response = self.client.get_json(&url, &params).await?;

        let mut places = response
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        if let Some(min_rating) = query.min_rating {
            places.retain(|p| rating_of(p).unwrap_or(0.0) >= min_rating);
        }

        places.truncate(query.limit);
        debug!("Places search returned {} results", places.len());
        Ok(places)
    }

    /// Recommend places that fit a weather condition
    pub async fn recommend_by_weather(
        &self,
        location: &str,
        weather_condition: &str,
        max_distance_m: u32,
        limit: usize,
    ) -> Result<String, ServiceError> {
        self.require_key()?;

        let Some(recommended_types) = weather_place_types(weather_condition) else {
            return Err(ServiceError::InvalidInput(format!(
                "Weather condition '{}' not supported. Available: {}",
                weather_condition,
                weather_condition_names()
            )));
        };

        let coords = self.geocoder.resolve(location).await?;
        let mut recommendations = Vec::new();

        for place_type in recommended_types {
            let query = PlaceQuery {
                place_type: Some(place_type.to_string()),
                radius_m: max_distance_m,
                limit: 3, // top few per category
                ..Default::default()
            };
            match self.search_data(coords, &query).await {
                Ok(places) => {
                    for mut place in places {
                        if let Some(obj) = place.as_object_mut() {
                            obj.insert("category".to_string(), Value::from(*place_type));
                        }
                        recommendations.push(place);
                    }
                }
                Err(e) => debug!("Skipping category {}: {}", place_type, e),
            }
        }

        sort_by_rating(&mut recommendations);
        recommendations.truncate(limit);
        Ok(format_category_recommendations(
            &recommendations,
            &format!(
                "Places recommended for {} weather in {}",
                weather_condition, location
            ),
            &format!(
                "No places found for {} weather in {}",
                weather_condition, location
            ),
            false,
        ))
    }

    /// Recommend places within reach of a travel mode
    pub async fn recommend_by_distance(
        &self,
        location: &str,
        travel_mode: &str,
        limit: usize,
    ) -> Result<String, ServiceError> {
        self.require_key()?;

        let Some(mode) = TravelMode::from_string(travel_mode) else {
            return Err(ServiceError::InvalidInput(format!(
                "Travel mode '{}' not supported. Available: {}",
                travel_mode,
                travel_mode_names()
            )));
        };

        let coords = self.geocoder.resolve(location).await?;
        let mut recommendations = Vec::new();

        for place_type in mode.place_types() {
            let query = PlaceQuery {
                place_type: Some(place_type.to_string()),
                radius_m: mode.radius_m().min(MAX_SEARCH_RADIUS_M),
                limit: 2,
                ..Default::default()
            };
            match self.search_data(coords, &query).await {
                Ok(places) => {
                    for mut place in places {
                        let distance = place_coordinates(&place)
                            .map(|p| haversine_km(coords, p))
                            .unwrap_or(0.0);
                        if let Some(obj) = place.as_object_mut() {
                            obj.insert("category".to_string(), Value::from(*place_type));
                            obj.insert(
                                "distance_km".to_string(),
                                Value::from((distance * 10.0).round() / 10.0),
                            );
                        }
                        recommendations.push(place);
                    }
                }
                Err(e) => debug!("Skipping category {}: {}", place_type, e),
            }
        }

        sort_by_rating(&mut recommendations);
        recommendations.truncate(limit);
        Ok(format_category_recommendations(
            &recommendations,
            &format!("Places recommended for {} from {}", mode.label(), location),
            &format!("No places found for {} from {}", mode.label(), location),
            true,
        ))
    }
}

/// Validate search parameters against the type table and bounds
pub(crate) fn validate_query(query: &PlaceQuery) -> Result<(), ServiceError> {
    if let Some(place_type) = &query.place_type
        && !PLACE_TYPES.contains(&place_type.as_str())
    {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid place type '{}'. Available types: {}",
            place_type,
            PLACE_TYPES.join(", ")
        )));
    }

    if query.radius_m > MAX_SEARCH_RADIUS_M {
        return Err(ServiceError::InvalidInput(format!(
            "Radius must be between 0 and {} meters",
            MAX_SEARCH_RADIUS_M
        )));
    }

    if !(MIN_RESULTS_LIMIT..=MAX_RESULTS_LIMIT).contains(&query.limit) {
        return Err(ServiceError::InvalidInput(format!(
            "Limit must be between {} and {}",
            MIN_RESULTS_LIMIT, MAX_RESULTS_LIMIT
        )));
    }

    if let Some(rating) = query.min_rating
        && !(0.0..=5.0).contains(&rating)
    {
        return Err(ServiceError::InvalidInput(
            "Minimum rating must be between 0 and 5".to_string(),
        ));
    }

    if let Some(level) = &query.price_level
        && !PRICE_LEVELS.iter().any(|(n, _)| n == level)
    {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid price level '{}'. Available levels: {}",
            level,
            PRICE_LEVELS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
        )));
    }

    Ok(())
}

fn rating_of(place: &Value) -> Option<f64> {
    place.get("rating").and_then(|r| r.as_f64())
}

fn place_coordinates(place: &Value) -> Option<Coordinates> {
    let location = place.get("geometry")?.get("location")?;
    Some(Coordinates::new(
        location.get("lat")?.as_f64()?,
        location.get("lng")?.as_f64()?,
    ))
}

fn sort_by_rating(places: &mut [Value]) {
    places.sort_by(|a, b| {
        rating_of(b)
            .unwrap_or(0.0)
            .partial_cmp(&rating_of(a).unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn str_or_na(value: &Value, key: &str) -> String {
    value
        .get(key)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "N/A".to_string())
}

fn format_places_results(location: &str, places: &[Value], place_type: Option<&str>) -> String {
    let type_filter = place_type.map(|t| format!(" ({})", t)).unwrap_or_default();

    if places.is_empty() {
        return format!("No places found for {}{}", location, type_filter);
    }

    let mut out = format!("Places search results for {}{}:\n\n", location, type_filter);
    for (i, place) in places.iter().enumerate() {
        let types = place
            .get("types")
            .and_then(|t| t.as_array())
            .map(|t| {
                t.iter()
                    .take(3)
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        out.push_str(&format!("{}. {}\n", i + 1, str_or_na(place, "name")));
        out.push_str(&format!("   Rating: {}/5.0\n", str_or_na(place, "rating")));
        out.push_str(&format!(
            "   Price Level: {}/4\n",
            str_or_na(place, "price_level")
        ));
        out.push_str(&format!("   Address: {}\n", str_or_na(place, "vicinity")));
        out.push_str(&format!("   Types: {}\n", types));
        out.push_str(&format!("   Place ID: {}\n\n", str_or_na(place, "place_id")));
    }

    out
}

fn format_category_recommendations(
    recommendations: &[Value],
    header: &str,
    empty_message: &str,
    with_distance: bool,
) -> String {
    if recommendations.is_empty() {
        return empty_message.to_string();
    }

    let mut out = format!("{}:\n", header);
    let mut current_category = String::new();
    let mut count = 0usize;

    for place in recommendations {
        let category = place
            .get("category")
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .replace('_', " ");

        if category != current_category {
            out.push_str(&format!("\n{}:\n", title_case(&category)));
            current_category = category;
            count = 0;
        }

        count += 1;
        if with_distance {
            out.push_str(&format!(
                "  {}. {} (Rating: {}/5.0, Distance: {}km)\n",
                count,
                str_or_na(place, "name"),
                str_or_na(place, "rating"),
                str_or_na(place, "distance_km")
            ));
        } else {
            out.push_str(&format!(
                "  {}. {} (Rating: {}/5.0)\n",
                count,
                str_or_na(place, "name"),
                str_or_na(place, "rating")
            ));
        }
        out.push_str(&format!("     {}\n", str_or_na(place, "vicinity")));
    }

    out
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query_defaults_ok() {
        assert!(validate_query(&PlaceQuery::default()).is_ok());
    }

    #[test]
    fn test_validate_query_bad_type() {
        let query = PlaceQuery {
            place_type: Some("space_elevator".to_string()),
            ..Default::default()
        };
        let err = validate_query(&query).unwrap_err();
        assert!(err.to_string().contains("Invalid place type"));
    }

    #[test]
    fn test_validate_query_radius() {
        let query = PlaceQuery {
            radius_m: 60_000,
            ..Default::default()
        };
        assert!(validate_query(&query).is_err());
    }

    #[test]
    fn test_validate_query_limit_bounds() {
        let too_small = PlaceQuery {
            limit: 2,
            ..Default::default()
        };
        assert!(validate_query(&too_small).is_err());

        let too_big = PlaceQuery {
            limit: 100,
            ..Default::default()
        };
        assert!(validate_query(&too_big).is_err());
    }

    #[test]
    fn test_validate_query_rating_and_price() {
        let bad_rating = PlaceQuery {
            min_rating: Some(6.0),
            ..Default::default()
        };
        assert!(validate_query(&bad_rating).is_err());

        let bad_price = PlaceQuery {
            price_level: Some("exorbitant".to_string()),
            ..Default::default()
        };
        assert!(validate_query(&bad_price).is_err());

        let good = PlaceQuery {
            min_rating: Some(4.0),
            price_level: Some("moderate".to_string()),
            ..Default::default()
        };
        assert!(validate_query(&good).is_ok());
    }

    #[test]
    fn test_travel_modes() {
        assert_eq!(TravelMode::from_string("walking"), Some(TravelMode::Walking));
        assert_eq!(TravelMode::from_string("DAY_TRIP"), Some(TravelMode::DayTrip));
        assert_eq!(TravelMode::from_string("teleport"), None);
        assert_eq!(TravelMode::Walking.radius_m(), 2_000);
        assert!(TravelMode::Extended.radius_m() > TravelMode::DayTrip.radius_m());
    }

    #[test]
    fn test_weather_place_types() {
        assert!(weather_place_types("sunny").unwrap().contains(&"park"));
        assert!(weather_place_types("RAINY").unwrap().contains(&"museum"));
        assert!(weather_place_types("foggy").is_none());
    }

    #[test]
    fn test_missing_api_key() {
        let service = PlacesService::new(None, Arc::new(Geocoder::new()));
        assert!(!service.has_api_key());
        let err = service.require_key().unwrap_err();
        assert!(err.to_string().contains("Google Places API"));
    }

    #[test]
    fn test_sort_by_rating() {
        let mut places = vec![
            serde_json::json!({"name": "B", "rating": 3.9}),
            serde_json::json!({"name": "A", "rating": 4.7}),
            serde_json::json!({"name": "C"}),
        ];
        sort_by_rating(&mut places);
        assert_eq!(places[0]["name"], "A");
        assert_eq!(places[2]["name"], "C");
    }

    #[test]
    fn test_place_coordinates() {
        let place = serde_json::json!({
            "geometry": {"location": {"lat": 38.7, "lng": -9.1}}
        });
        let coords = place_coordinates(&place).unwrap();
        assert!((coords.latitude - 38.7).abs() < 1e-9);
        assert!(place_coordinates(&serde_json::json!({})).is_none());
    }

    #[test]
    fn test_format_places_results() {
        let places = vec![serde_json::json!({
            "name": "Oceanário",
            "rating": 4.7,
            "price_level": 2,
            "vicinity": "Esplanada Dom Carlos I",
            "types": ["aquarium", "tourist_attraction", "point_of_interest", "extra"],
            "place_id": "p-1"
        })];
        let out = format_places_results("Lisbon", &places, Some("aquarium"));
        assert!(out.contains("Places search results for Lisbon (aquarium)"));
        assert!(out.contains("1. Oceanário"));
        assert!(out.contains("Rating: 4.7/5.0"));
        // Only the first three types are shown
        assert!(out.contains("aquarium, tourist_attraction, point_of_interest"));
        assert!(!out.contains("extra"));
    }

    #[test]
    fn test_format_places_results_empty() {
        let out = format_places_results("Lisbon", &[], None);
        assert_eq!(out, "No places found for Lisbon");
    }

    #[test]
    fn test_format_category_recommendations_groups() {
        let recs = vec![
            serde_json::json!({"name": "Park One", "rating": 4.5, "vicinity": "North", "category": "park"}),
            serde_json::json!({"name": "Park Two", "rating": 4.2, "vicinity": "South", "category": "park"}),
            serde_json::json!({"name": "MAAT", "rating": 4.4, "vicinity": "Belém", "category": "art_gallery"}),
        ];
        let out = format_category_recommendations(
            &recs,
            "Places recommended for sunny weather in Lisbon",
            "No places found for sunny weather in Lisbon",
            false,
        );
        assert!(out.contains("Park:"));
        assert!(out.contains("Art Gallery:"));
        assert!(out.contains("  1. Park One"));
        assert!(out.contains("  2. Park Two"));
        assert!(out.contains("  1. MAAT"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("art gallery"), "Art Gallery");
        assert_eq!(title_case("park"), "Park");
    }
}
