//! Booking service — accommodation search and details via the Booking.com
//! demand API. Requires `BOOKING_API_KEY`.

use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::geo::{Coordinates, Geocoder};
use crate::http::{ServiceError, UpstreamClient};

pub const BOOKING_API_BASE_URL: &str = "https://demandapi.booking.com/3.1";

const SEARCH_ENDPOINT: &str = "/accommodations/search";
const DETAILS_ENDPOINT: &str = "/accommodations/details";
const REVIEWS_ENDPOINT: &str = "/accommodations/reviews";

const SEARCH_EXTRAS: &str = "extra_charges,products";

const DEFAULT_PLATFORM: &str = "desktop";
const DEFAULT_COUNTRY: &str = "us";
const DEFAULT_CURRENCY: &str = "USD";

pub const DEFAULT_ADULTS: u32 = 2;
pub const DEFAULT_ROOMS: u32 = 1;
pub const DEFAULT_ROWS: u32 = 20;
pub const DEFAULT_STAY_NIGHTS: i64 = 1;
const MAX_ROWS: u32 = 100;
const MIN_ROWS: u32 = 10;

const MAX_DAYS_IN_FUTURE: i64 = 500;
const MAX_STAY_DURATION: i64 = 90;
const MIN_PRICE: f64 = 0.0;
const MAX_PRICE: f64 = 10_000.0;

/// Accommodation type names accepted by the search filter, with their
/// Booking.com type ids
const ACCOMMODATION_TYPES: &[(&str, u32)] = &[
    ("hotel", 204),
    ("apartment", 201),
    ("resort", 219),
    ("villa", 212),
    ("hostel", 203),
    ("bed_and_breakfast", 202),
    ("guesthouse", 216),
];

fn accommodation_type_id(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    ACCOMMODATION_TYPES
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, id)| *id)
}

fn accommodation_type_names() -> String {
    ACCOMMODATION_TYPES
        .iter()
        .map(|(n, _)| *n)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Core stay parameters for a search
#[derive(Debug, Clone)]
pub struct StaySearch {
    /// Check-in date, `YYYY-MM-DD`
    pub checkin: String,
    /// Checkout date, `YYYY-MM-DD`
    pub checkout: String,
    pub adults: u32,
    pub rooms: u32,
    pub rows: u32,
}

impl Default for StaySearch {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        Self {
            checkin: today.format("%Y-%m-%d").to_string(),
            checkout: (today + Duration::days(DEFAULT_STAY_NIGHTS))
                .format("%Y-%m-%d")
                .to_string(),
            adults: DEFAULT_ADULTS,
            rooms: DEFAULT_ROOMS,
            rows: DEFAULT_ROWS,
        }
    }
}

/// Optional accommodation filters
#[derive(Debug, Clone, Default)]
pub struct StayFilters {
    pub star_rating: Option<u8>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub accommodation_type: Option<String>,
}

impl StayFilters {
    fn is_empty(&self) -> bool {
        self.star_rating.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.accommodation_type.is_none()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(stars) = self.star_rating {
            parts.push(format!("{} stars", stars));
        }
        if let Some(min) = self.price_min {
            parts.push(format!("min price: ${}", min));
        }
        if let Some(max) = self.price_max {
            parts.push(format!("max price: ${}", max));
        }
        if let Some(t) = &self.accommodation_type {
            parts.push(format!("type: {}", t));
        }
        parts.join(", ")
    }
}

/// Service for accommodation search and details
pub struct BookingService {
    api_key: Option<String>,
    geocoder: Arc<Geocoder>,
    client: UpstreamClient,
}

impl BookingService {
    pub fn new(api_key: Option<String>, geocoder: Arc<Geocoder>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            geocoder,
            client: UpstreamClient::new(),
        }
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn require_key(&self) -> Result<&str, ServiceError> {
        self.api_key.as_deref().ok_or(ServiceError::MissingApiKey {
            service: "Booking.com",
        })
    }

    /// Search accommodations by location and dates, formatted for the traveler
    pub async fn search_availability(
        &self,
        location: &str,
        search: &StaySearch,
    ) -> Result<String, ServiceError> {
        self.require_key()?;
        validate_dates(&search.checkin, &search.checkout)?;
        let coords = self.geocoder.resolve(location).await?;
        let results = self.search_data(coords, search, &StayFilters::default()).await?;
        Ok(format_search_results(location, &results, &StayFilters::default()))
    }

    /// Search with star-rating / price / type filters, formatted
    pub async fn search_filtered(
        &self,
        location: &str,
        search: &StaySearch,
        filters: &StayFilters,
    ) -> Result<String, ServiceError> {
        self.require_key()?;
        validate_dates(&search.checkin, &search.checkout)?;
        validate_filters(filters)?;
        let coords = self.geocoder.resolve(location).await?;
        let results = self.search_data(coords, search, filters).await?;
        Ok(format_search_results(location, &results, filters))
    }

    /// Search accommodations and return structured data (used by the planner)
    pub async fn search_data(
        &self,
        coords: Coordinates,
        search: &StaySearch,
        filters: &StayFilters,
    ) -> Result<Vec<Value>, ServiceError> {
        let key = self.require_key()?.to_string();
        validate_dates(&search.checkin, &search.checkout)?;

        let mut query = vec![
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("checkin", search.checkin.clone()),
            ("checkout", search.checkout.clone()),
            ("adults", search.adults.to_string()),
            ("rooms", search.rooms.to_string()),
            ("rows", search.rows.clamp(MIN_ROWS, MAX_ROWS).to_string()),
            ("extras", SEARCH_EXTRAS.to_string()),
            ("platform", DEFAULT_PLATFORM.to_string()),
            ("country", DEFAULT_COUNTRY.to_string()),
            ("currency", DEFAULT_CURRENCY.to_string()),
        ];

        if let Some(stars) = filters.star_rating {
            query.push(("star_rating", stars.to_string()));
        }
        if let Some(min) = filters.price_min {
            query.push(("price_min", min.to_string()));
        }
        if let Some(max) = filters.price_max {
            query.push(("price_max", max.to_string()));
        }
        if let Some(type_id) = filters
            .accommodation_type
            .as_deref()
            .and_then(accommodation_type_id)
        {
            query.push(("accommodation_type", type_id.to_string()));
        }

        let url = format!("{}{}", BOOKING_API_BASE_URL, SEARCH_ENDPOINT);
        let response = self.client.get_json_auth(&url, &query, &key).await?;

        let results = response
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        debug!("Booking search returned {} results", results.len());
        Ok(results)
    }

    /// Detailed information (including reviews) for one accommodation
    pub async fn accommodation_details(&self, hotel_id: &str) -> Result<String, ServiceError> {
        let key = self.require_key()?.to_string();

        let query = [
            ("hotel_id", hotel_id.to_string()),
            ("platform", DEFAULT_PLATFORM.to_string()),
            ("country", DEFAULT_COUNTRY.to_string()),
            ("currency", DEFAULT_CURRENCY.to_string()),
        ];

        let details_url = format!("{}{}", BOOKING_API_BASE_URL, DETAILS_ENDPOINT);
        let details = self.client.get_json_auth(&details_url, &query, &key).await?;

        // Reviews are best-effort; details alone are still useful
        let reviews_url = format!("{}{}", BOOKING_API_BASE_URL, REVIEWS_ENDPOINT);
        let reviews = self.client.get_json_auth(&reviews_url, &query, &key).await.ok();

        Ok(format_accommodation_details(&details, reviews.as_ref()))
    }
}

/// Validate check-in / checkout dates
pub(crate) fn validate_dates(checkin: &str, checkout: &str) -> Result<(), ServiceError> {
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            ServiceError::InvalidInput("Invalid date format. Please use YYYY-MM-DD format".to_string())
        })
    };

    let checkin_date = parse(checkin)?;
    let checkout_date = parse(checkout)?;
    let today = Utc::now().date_naive();

    if checkin_date < today {
        return Err(ServiceError::InvalidInput(
            "Check-in date cannot be in the past".to_string(),
        ));
    }

    if checkout_date <= checkin_date {
        return Err(ServiceError::InvalidInput(
            "Checkout date must be after check-in date".to_string(),
        ));
    }

    if checkin_date > today + Duration::days(MAX_DAYS_IN_FUTURE) {
        return Err(ServiceError::InvalidInput(format!(
            "Check-in date cannot be more than {} days in the future",
            MAX_DAYS_IN_FUTURE
        )));
    }

    if (checkout_date - checkin_date).num_days() > MAX_STAY_DURATION {
        return Err(ServiceError::InvalidInput(format!(
            "Stay duration cannot exceed {} days",
            MAX_STAY_DURATION
        )));
    }

    Ok(())
}

/// Validate the optional search filters
pub(crate) fn validate_filters(filters: &StayFilters) -> Result<(), ServiceError> {
    if let Some(stars) = filters.star_rating
        && !(1..=5).contains(&stars)
    {
        return Err(ServiceError::InvalidInput(
            "Star rating must be between 1 and 5".to_string(),
        ));
    }

    for price in [filters.price_min, filters.price_max].into_iter().flatten() {
        if !(MIN_PRICE..=MAX_PRICE).contains(&price) {
            return Err(ServiceError::InvalidInput(format!(
                "Price must be between {} and {}",
                MIN_PRICE, MAX_PRICE
            )));
        }
    }

    if let (Some(min), Some(max)) = (filters.price_min, filters.price_max)
        && min >= max
    {
        return Err(ServiceError::InvalidInput(
            "Minimum price must be less than maximum price".to_string(),
        ));
    }

    if let Some(t) = &filters.accommodation_type
        && accommodation_type_id(t).is_none()
    {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid accommodation type. Available types: {}",
            accommodation_type_names()
        )));
    }

    Ok(())
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

fn format_search_results(location: &str, results: &[Value], filters: &StayFilters) -> String {
    let filter_str = if filters.is_empty() {
        String::new()
    } else {
        format!(" (filters: {})", filters.describe())
    };

    if results.is_empty() {
        return if filters.is_empty() {
            format!("No accommodations found for {}", location)
        } else {
            format!(
                "No accommodations found for {} with the specified criteria",
                location
            )
        };
    }

    let mut out = format!("Accommodation search results for {}{}:\n\n", location, filter_str);

    for (i, accommodation) in results.iter().take(10).enumerate() {
        let price = accommodation.get("price").cloned().unwrap_or(Value::Null);
        out.push_str(&format!("{}. {}\n", i + 1, str_or_na(accommodation, "name")));
        if !filters.is_empty() {
            out.push_str(&format!(
                "   Type: {}\n",
                str_or_na(accommodation, "accommodation_type_name")
            ));
        }
        out.push_str(&format!(
            "   Star Rating: {} stars\n",
            str_or_na(accommodation, "star_rating")
        ));
        out.push_str(&format!(
            "   Price: {} {} per night\n",
            str_or_na(&price, "amount"),
            str_or_na(&price, "currency")
        ));
        out.push_str(&format!(
            "   Hotel ID: {}\n\n",
            str_or_na(accommodation, "hotel_id")
        ));
    }

    if results.len() > 10 {
        out.push_str(&format!("... and {} more results\n", results.len() - 10));
    }

    out
}

fn format_accommodation_details(details: &Value, reviews: Option<&Value>) -> String {
    let Some(accommodation) = details.get("result").filter(|v| !v.is_null()) else {
        return "No accommodation details found".to_string();
    };

    let mut out = String::from("Accommodation Details:\n\n");
    out.push_str(&format!("Name: {}\n", str_or_na(accommodation, "name")));
    out.push_str(&format!(
        "Star Rating: {} stars\n",
        str_or_na(accommodation, "star_rating")
    ));
    out.push_str(&format!(
        "Type: {}\n",
        str_or_na(accommodation, "accommodation_type_name")
    ));

    if let Some(address) = accommodation.get("address") {
        out.push_str(&format!(
            "Address: {}, {}, {}\n",
            str_or_na(address, "address_line_1"),
            str_or_na(address, "city"),
            str_or_na(address, "country")
        ));
    }

    if let Some(phone) = accommodation
        .get("contact")
        .and_then(|c| c.get("phone"))
        .and_then(|p| p.as_str())
    {
        out.push_str(&format!("Phone: {}\n", phone));
    }

    if let Some(description) = accommodation
        .get("description")
        .and_then(|d| d.get("short_description"))
        .and_then(|d| d.as_str())
    {
        out.push_str(&format!("Description: {}\n", description));
    }

    if let Some(amenities) = accommodation.get("amenities").and_then(|a| a.as_array()) {
        let names: Vec<&str> = amenities
            .iter()
            .take(10)
            .filter_map(|a| a.get("name").and_then(|n| n.as_str()))
            .collect();
        if !names.is_empty() {
            out.push_str(&format!("Amenities: {}\n", names.join(", ")));
        }
    }

    if let Some(photos) = accommodation.get("photos").and_then(|p| p.as_array())
        && !photos.is_empty()
    {
        out.push_str(&format!("Photos: {} photos available\n", photos.len()));
    }

    if let Some(url) = accommodation.get("url").and_then(|u| u.as_str()) {
        out.push_str(&format!("Booking URL: {}\n", url));
    }

    if let Some(result) = reviews.and_then(|r| r.get("result")) {
        let avg = result.get("average_score").and_then(|v| v.as_f64());
        let count = result.get("review_count").and_then(|v| v.as_u64());
        if let (Some(avg), Some(count)) = (avg, count) {
            out.push_str(&format!("Reviews: {}/10 based on {} reviews\n", avg, count));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn future(days: i64) -> String {
        (Utc::now().date_naive() + Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    #[test]
    fn test_validate_dates_ok() {
        assert!(validate_dates(&future(7), &future(10)).is_ok());
    }

    #[test]
    fn test_validate_dates_past_checkin() {
        let err = validate_dates(&future(-1), &future(2)).unwrap_err();
        assert!(err.to_string().contains("past"));
    }

    #[test]
    fn test_validate_dates_checkout_before_checkin() {
        let err = validate_dates(&future(10), &future(10)).unwrap_err();
        assert!(err.to_string().contains("after check-in"));
    }

    #[test]
    fn test_validate_dates_too_far_out() {
        let err = validate_dates(&future(600), &future(601)).unwrap_err();
        assert!(err.to_string().contains("500 days"));
    }

    #[test]
    fn test_validate_dates_stay_too_long() {
        let err = validate_dates(&future(1), &future(100)).unwrap_err();
        assert!(err.to_string().contains("90 days"));
    }

    #[test]
    fn test_validate_dates_bad_format() {
        let err = validate_dates("08/10/2026", &future(3)).unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_validate_filters() {
        assert!(validate_filters(&StayFilters::default()).is_ok());

        let bad_stars = StayFilters {
            star_rating: Some(6),
            ..Default::default()
        };
        assert!(validate_filters(&bad_stars).is_err());

        let inverted_prices = StayFilters {
            price_min: Some(200.0),
            price_max: Some(100.0),
            ..Default::default()
        };
        assert!(validate_filters(&inverted_prices).is_err());

        let bad_type = StayFilters {
            accommodation_type: Some("treehouse".to_string()),
            ..Default::default()
        };
        let err = validate_filters(&bad_type).unwrap_err();
        assert!(err.to_string().contains("hotel"));
    }

    #[test]
    fn test_accommodation_type_lookup() {
        assert_eq!(accommodation_type_id("hotel"), Some(204));
        assert_eq!(accommodation_type_id("Apartment"), Some(201));
        assert_eq!(accommodation_type_id("castle"), None);
    }

    #[test]
    fn test_missing_api_key() {
        let service = BookingService::new(None, Arc::new(Geocoder::new()));
        assert!(!service.has_api_key());
        let err = service.require_key().unwrap_err();
        assert!(err.to_string().contains("Booking.com"));
    }

    #[test]
    fn test_empty_api_key_treated_as_missing() {
        let service = BookingService::new(Some(String::new()), Arc::new(Geocoder::new()));
        assert!(!service.has_api_key());
    }

    #[test]
    fn test_format_search_results() {
        let results = vec![serde_json::json!({
            "name": "Hotel Aurora",
            "star_rating": 4,
            "price": {"amount": 120, "currency": "USD"},
            "hotel_id": "h-123"
        })];
        let out = format_search_results("Lisbon", &results, &StayFilters::default());
        assert!(out.contains("1. Hotel Aurora"));
        assert!(out.contains("Star Rating: 4 stars"));
        assert!(out.contains("120 USD per night"));
        assert!(out.contains("Hotel ID: h-123"));
    }

    #[test]
    fn test_format_search_results_empty() {
        let out = format_search_results("Lisbon", &[], &StayFilters::default());
        assert_eq!(out, "No accommodations found for Lisbon");
    }

    #[test]
    fn test_format_search_results_with_filters() {
        let filters = StayFilters {
            star_rating: Some(4),
            price_max: Some(150.0),
            ..Default::default()
        };
        let out = format_search_results("Lisbon", &[], &filters);
        assert!(out.contains("with the specified criteria"));

        let results = vec![serde_json::json!({"name": "Hotel Aurora"})];
        let out = format_search_results("Lisbon", &results, &filters);
        assert!(out.contains("filters: 4 stars, max price: $150"));
    }

    #[test]
    fn test_format_details() {
        let details = serde_json::json!({
            "result": {
                "name": "Hotel Aurora",
                "star_rating": 4,
                "accommodation_type_name": "Hotel",
                "address": {"address_line_1": "Rua A 1", "city": "Lisbon", "country": "Portugal"},
                "amenities": [{"name": "WiFi"}, {"name": "Pool"}],
                "url": "https://booking.example/h-123"
            }
        });
        let reviews = serde_json::json!({
            "result": {"average_score": 8.4, "review_count": 212}
        });
        let out = format_accommodation_details(&details, Some(&reviews));
        assert!(out.contains("Name: Hotel Aurora"));
        assert!(out.contains("Address: Rua A 1, Lisbon, Portugal"));
        assert!(out.contains("Amenities: WiFi, Pool"));
        assert!(out.contains("Reviews: 8.4/10 based on 212 reviews"));
    }

    #[test]
    fn test_format_details_missing() {
        let out = format_accommodation_details(&serde_json::json!({}), None);
        assert_eq!(out, "No accommodation details found");
    }

    #[test]
    fn test_stay_search_default_dates() {
        let search = StaySearch::default();
        assert!(validate_dates(&search.checkin, &search.checkout).is_ok());
        assert_eq!(search.adults, DEFAULT_ADULTS);
        assert_eq!(search.rows, DEFAULT_ROWS);
    }
}
