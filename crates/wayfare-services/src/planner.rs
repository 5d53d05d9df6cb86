//! Trip planner service — multi-day itineraries composed from weather,
//! places, and booking data.
//!
//! Given a destination and preferences, the planner picks dates (the best
//! weather window when none are given), fills each day with morning /
//! afternoon / evening activities from places data, and attaches an
//! accommodation suggestion when a booking key is configured.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::booking::{BookingService, StayFilters, StaySearch};
use crate::geo::{Coordinates, Geocoder};
use crate::http::ServiceError;
use crate::places::{PlaceQuery, PlacesService};
use crate::weather::{DailyForecast, WeatherService, score_day};

pub const DEFAULT_TRIP_DURATION: u32 = 3;
pub const MIN_TRIP_DURATION: u32 = 1;
pub const MAX_TRIP_DURATION: u32 = 30;

/// Days of forecast considered when choosing trip dates
const FORECAST_WINDOW_DAYS: u8 = 14;

/// Minimum place rating considered for an itinerary slot
const MIN_ACTIVITY_RATING: f64 = 3.5;

const TRIP_DURATIONS: &[(&str, u32)] = &[
    ("weekend", 2),
    ("short", 3),
    ("week", 7),
    ("extended", 14),
    ("month", 30),
];

fn duration_preset_names() -> String {
    TRIP_DURATIONS
        .iter()
        .map(|(n, _)| *n)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pace and preferences for an itinerary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStyle {
    Relaxed,
    Balanced,
    Adventure,
    Cultural,
    FoodFocused,
}

impl TripStyle {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relaxed" => Some(Self::Relaxed),
            "balanced" => Some(Self::Balanced),
            "adventure" => Some(Self::Adventure),
            "cultural" => Some(Self::Cultural),
            "food_focused" => Some(Self::FoodFocused),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Relaxed => "Relaxed",
            Self::Balanced => "Balanced",
            Self::Adventure => "Adventure",
            Self::Cultural => "Cultural",
            Self::FoodFocused => "Food Focused",
        }
    }

    fn activities_per_day(self) -> usize {
        match self {
            Self::Relaxed => 2,
            Self::Balanced | Self::Cultural => 3,
            Self::Adventure | Self::FoodFocused => 4,
        }
    }

    fn travel_radius_m(self) -> u32 {
        match self {
            Self::Relaxed => 10_000,
            Self::Balanced | Self::FoodFocused => 15_000,
            Self::Cultural => 20_000,
            Self::Adventure => 25_000,
        }
    }

    fn preferred_types(self) -> &'static [&'static str] {
        match self {
            Self::Relaxed => &["restaurant", "cafe", "park", "museum"],
            Self::Balanced => &["tourist_attraction", "restaurant", "museum", "park", "shopping_mall"],
            Self::Adventure => &["tourist_attraction", "amusement_park", "zoo", "park"],
            Self::Cultural => &["museum", "art_gallery", "church", "tourist_attraction", "restaurant"],
            Self::FoodFocused => &["restaurant", "cafe", "bakery", "bar"],
        }
    }
}

fn trip_style_names() -> &'static str {
    "relaxed, balanced, adventure, cultural, food_focused"
}

/// Spending level for an itinerary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Budget,
    MidRange,
    Luxury,
}

impl Budget {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "budget" => Some(Self::Budget),
            "mid_range" | "moderate" => Some(Self::MidRange),
            "luxury" => Some(Self::Luxury),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Budget => "Budget",
            Self::MidRange => "Mid Range",
            Self::Luxury => "Luxury",
        }
    }

    fn daily_budget_usd(self) -> u32 {
        match self {
            Self::Budget => 50,
            Self::MidRange => 150,
            Self::Luxury => 500,
        }
    }
}

fn budget_names() -> &'static str {
    "budget, mid_range, luxury"
}

/// Activity types per time of day for a requested weather condition
const WEATHER_DAY_SCHEDULES: &[(&str, &[(&str, &[&str])])] = &[
    (
        "sunny",
        &[
            ("morning", &["park", "tourist_attraction", "zoo"]),
            ("afternoon", &["zoo", "amusement_park", "tourist_attraction"]),
            ("evening", &["restaurant", "bar"]),
        ],
    ),
    (
        "clear",
        &[
            ("morning", &["park", "tourist_attraction", "zoo"]),
            ("afternoon", &["amusement_park", "tourist_attraction", "park"]),
            ("evening", &["restaurant", "bar"]),
        ],
    ),
    (
        "partly_cloudy",
        &[
            ("morning", &["museum", "tourist_attraction", "park"]),
            ("afternoon", &["shopping_mall", "tourist_attraction", "cafe"]),
            ("evening", &["restaurant", "movie_theater", "bar"]),
        ],
    ),
    (
        "cloudy",
        &[
            ("morning", &["museum", "art_gallery", "shopping_mall"]),
            ("afternoon", &["tourist_attraction", "cafe"]),
            ("evening", &["restaurant", "bar"]),
        ],
    ),
    (
        "overcast",
        &[
            ("morning", &["museum", "shopping_mall", "art_gallery"]),
            ("afternoon", &["cafe", "shopping_mall"]),
            ("evening", &["restaurant", "movie_theater"]),
        ],
    ),
    (
        "rainy",
        &[
            ("morning", &["museum", "shopping_mall", "art_gallery"]),
            ("afternoon", &["movie_theater", "aquarium"]),
            ("evening", &["restaurant", "bar"]),
        ],
    ),
    (
        "snowy",
        &[
            ("morning", &["museum", "shopping_mall"]),
            ("afternoon", &["cafe", "art_gallery"]),
            ("evening", &["restaurant", "bar"]),
        ],
    ),
];

fn weather_day_schedule(condition: &str) -> Option<&'static [(&'static str, &'static [&'static str])]> {
    let lower = condition.to_lowercase();
    WEATHER_DAY_SCHEDULES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, schedule)| *schedule)
}

fn weather_condition_names() -> String {
    WEATHER_DAY_SCHEDULES
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// How well a daily weather code matches a requested condition (0–100)
pub(crate) fn condition_match_score(condition: &str, code: u16) -> i32 {
    match condition.to_lowercase().as_str() {
        "sunny" | "clear" => match code {
            0..=1 => 100,
            2 => 60,
            3 => 30,
            _ => 0,
        },
        "partly_cloudy" => match code {
            2 => 100,
            1 | 3 => 60,
            0 => 40,
            _ => 10,
        },
        "cloudy" | "overcast" => match code {
            3 => 100,
            2 => 60,
            45..=48 => 50,
            0..=1 => 20,
            _ => 10,
        },
        "rainy" => match code {
            61..=67 | 80..=82 => 100,
            51..=57 => 70,
            95..=99 => 50,
            _ => 0,
        },
        "snowy" => match code {
            71..=77 | 85..=86 => 100,
            _ => 0,
        },
        _ => 0,
    }
}

/// Parse a trip duration from tool input: a number of days or a preset name
pub fn parse_duration(value: Option<&Value>) -> Option<u32> {
    let Some(value) = value else {
        return Some(DEFAULT_TRIP_DURATION);
    };

    match value {
        Value::Null => Some(DEFAULT_TRIP_DURATION),
        Value::Number(n) => {
            let days = n.as_u64()? as u32;
            (MIN_TRIP_DURATION..=MAX_TRIP_DURATION).contains(&days).then_some(days)
        }
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            if let Ok(days) = s.parse::<u32>() {
                return (MIN_TRIP_DURATION..=MAX_TRIP_DURATION)
                    .contains(&days)
                    .then_some(days);
            }
            TRIP_DURATIONS.iter().find(|(n, _)| *n == s).map(|(_, d)| *d)
        }
        _ => None,
    }
}

/// One scheduled activity in an itinerary
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub name: String,
    pub category: String,
    pub time_of_day: &'static str,
    pub rating: Option<f64>,
    pub address: Option<String>,
}

/// One planned day
#[derive(Debug, Clone, Serialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone)]
struct AccommodationSuggestion {
    name: String,
    price_per_night: Option<f64>,
    currency: String,
    checkin: String,
    checkout: String,
    nights: u32,
}

/// Comprehensive trip planning over the other domain services
pub struct PlannerService {
    weather: Arc<WeatherService>,
    places: Arc<PlacesService>,
    booking: Arc<BookingService>,
    geocoder: Arc<Geocoder>,
}

impl PlannerService {
    pub fn new(
        weather: Arc<WeatherService>,
        places: Arc<PlacesService>,
        booking: Arc<BookingService>,
        geocoder: Arc<Geocoder>,
    ) -> Self {
        Self {
            weather,
            places,
            booking,
            geocoder,
        }
    }

    /// Plan a complete trip. Without a start date the best weather window in
    /// the next two weeks is chosen.
    pub async fn plan_complete_trip(
        &self,
        location: &str,
        start_date: Option<&str>,
        duration: Option<&Value>,
        trip_style: &str,
        budget: &str,
        include_accommodation: bool,
    ) -> Result<String, ServiceError> {
        let coords = self.geocoder.resolve(location).await?;

        let days = parse_duration(duration).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Invalid duration. Use number of days ({}-{}) or preset ({})",
                MIN_TRIP_DURATION,
                MAX_TRIP_DURATION,
                duration_preset_names()
            ))
        })?;

        let style = TripStyle::from_string(trip_style).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Invalid trip style '{}'. Available: {}",
                trip_style,
                trip_style_names()
            ))
        })?;

        let budget = Budget::from_string(budget).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Invalid budget category '{}'. Available: {}",
                budget,
                budget_names()
            ))
        })?;

        let dates = match start_date {
            Some(start) => {
                let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").map_err(|_| {
                    ServiceError::InvalidInput("Invalid date format or date range".to_string())
                })?;
                consecutive_dates(start, days)
            }
            None => self.select_optimal_dates(coords, days).await,
        };

        let mut daily_plans = Vec::with_capacity(dates.len());
        for date in &dates {
            daily_plans.push(self.plan_single_day(coords, *date, style).await);
        }

        let accommodation = if include_accommodation && self.booking.has_api_key() {
            self.accommodation_suggestion(coords, dates[0], days).await
        } else {
            None
        };

        Ok(format_trip_plan(
            location,
            &dates,
            &daily_plans,
            accommodation.as_ref(),
            style,
            budget,
        ))
    }

    /// Plan a trip optimized for a specific weather condition
    pub async fn plan_weather_optimized_trip(
        &self,
        location: &str,
        weather_condition: &str,
        duration: Option<&Value>,
        trip_style: &str,
    ) -> Result<String, ServiceError> {
        let coords = self.geocoder.resolve(location).await?;

        let days = parse_duration(duration).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Invalid duration. Use number of days ({}-{}) or preset ({})",
                MIN_TRIP_DURATION,
                MAX_TRIP_DURATION,
                duration_preset_names()
            ))
        })?;

        let style = TripStyle::from_string(trip_style).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Invalid trip style '{}'. Available: {}",
                trip_style,
                trip_style_names()
            ))
        })?;

        let Some(schedule) = weather_day_schedule(weather_condition) else {
            return Err(ServiceError::InvalidInput(format!(
                "Weather condition '{}' not supported. Available: {}",
                weather_condition,
                weather_condition_names()
            )));
        };

        let dates = self
            .find_weather_matching_dates(coords, weather_condition, days)
            .await;

        let mut daily_plans = Vec::with_capacity(dates.len());
        for date in &dates {
            daily_plans.push(self.plan_weather_day(coords, *date, schedule, style).await);
        }

        Ok(format_weather_trip_plan(
            location,
            &dates,
            &daily_plans,
            weather_condition,
            style,
        ))
    }

    /// Pick the best consecutive weather window in the next two weeks.
    /// Falls back to starting tomorrow when no forecast is available.
    async fn select_optimal_dates(&self, coords: Coordinates, days: u32) -> Vec<NaiveDate> {
        let fallback = consecutive_dates(Utc::now().date_naive() + Duration::days(1), days);

        let forecast = match self.weather.daily_forecast(coords, FORECAST_WINDOW_DAYS).await {
            Ok(daily) => daily,
            Err(e) => {
                debug!("Forecast unavailable, starting trip tomorrow: {}", e);
                return fallback;
            }
        };

        let scored = score_forecast_days(&forecast, |d| {
            score_day(d.max_temp, d.min_temp, d.precip_sum, d.precip_prob, d.wind, d.code)
        });
        best_consecutive_window(&scored, days as usize).unwrap_or(fallback)
    }

    /// Find consecutive days whose forecast best matches a condition.
    /// Falls back to starting the day after tomorrow.
    async fn find_weather_matching_dates(
        &self,
        coords: Coordinates,
        condition: &str,
        days: u32,
    ) -> Vec<NaiveDate> {
        let fallback = consecutive_dates(Utc::now().date_naive() + Duration::days(2), days);

        let forecast = match self.weather.daily_forecast(coords, FORECAST_WINDOW_DAYS).await {
            Ok(daily) => daily,
            Err(e) => {
                debug!("Forecast unavailable for weather matching: {}", e);
                return fallback;
            }
        };

        let scored = score_forecast_days(&forecast, |d| condition_match_score(condition, d.code));
        best_consecutive_window(&scored, days as usize).unwrap_or(fallback)
    }

    async fn plan_single_day(
        &self,
        coords: Coordinates,
        date: NaiveDate,
        style: TripStyle,
    ) -> DayPlan {
        let preferred = style.preferred_types();
        let mut activities = Vec::new();

        // Morning slot prefers an easy start
        let morning_type = preferred
            .iter()
            .copied()
            .find(|t| ["cafe", "museum", "park", "tourist_attraction"].contains(t));
        if let Some(morning_type) = morning_type
            && let Some(activity) = self.activity_for(coords, morning_type, style, "morning").await
        {
            activities.push(activity);
        }

        // Afternoon slots cycle through the style's preferred types
        let afternoon_slots = (style.activities_per_day().saturating_sub(1)).min(2);
        for i in 0..afternoon_slots {
            let place_type = preferred[i % preferred.len()];
            if let Some(activity) = self.activity_for(coords, place_type, style, "afternoon").await {
                activities.push(activity);
            }
        }

        // Evening is dinner
        if let Some(activity) = self.activity_for(coords, "restaurant", style, "evening").await {
            activities.push(activity);
        }

        DayPlan { date, activities }
    }

    async fn plan_weather_day(
        &self,
        coords: Coordinates,
        date: NaiveDate,
        schedule: &[(&'static str, &[&str])],
        style: TripStyle,
    ) -> DayPlan {
        let mut activities = Vec::new();

        for &(period, types) in schedule {
            if let Some(&place_type) = types.first()
                && let Some(activity) = self.activity_for(coords, place_type, style, period).await
            {
                activities.push(activity);
            }
        }

        DayPlan { date, activities }
    }

    /// Find one well-rated place of a type for a time slot. Failures (missing
    /// key, no results, upstream errors) leave the slot empty.
    async fn activity_for(
        &self,
        coords: Coordinates,
        place_type: &str,
        style: TripStyle,
        time_of_day: &'static str,
    ) -> Option<Activity> {
        let query = PlaceQuery {
            place_type: Some(place_type.to_string()),
            radius_m: style.travel_radius_m(),
            limit: 5,
            min_rating: Some(MIN_ACTIVITY_RATING),
            ..Default::default()
        };

        let places = match self.places.search_data(coords, &query).await {
            Ok(places) => places,
            Err(e) => {
                debug!("No {} for the {} slot: {}", place_type, time_of_day, e);
                return None;
            }
        };

        let place = places.first()?;
        Some(Activity {
            name: place
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("Unnamed place")
                .to_string(),
            category: place_type.to_string(),
            time_of_day,
            rating: place.get("rating").and_then(|r| r.as_f64()),
            address: place
                .get("vicinity")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }

    async fn accommodation_suggestion(
        &self,
        coords: Coordinates,
        start: NaiveDate,
        nights: u32,
    ) -> Option<AccommodationSuggestion> {
        let checkin = start.format("%Y-%m-%d").to_string();
        let checkout = (start + Duration::days(nights as i64))
            .format("%Y-%m-%d")
            .to_string();

        let search = StaySearch {
            checkin: checkin.clone(),
            checkout: checkout.clone(),
            rows: 10,
            ..Default::default()
        };

        let results = match self
            .booking
            .search_data(coords, &search, &StayFilters::default())
            .await
        {
            Ok(results) => results,
            Err(e) => {
                debug!("No accommodation suggestion: {}", e);
                return None;
            }
        };

        let first = results.first()?;
        Some(AccommodationSuggestion {
            name: first
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("Accommodation")
                .to_string(),
            price_per_night: first
                .get("price")
                .and_then(|p| p.get("amount"))
                .and_then(|a| a.as_f64()),
            currency: first
                .get("price")
                .and_then(|p| p.get("currency"))
                .and_then(|c| c.as_str())
                .unwrap_or("USD")
                .to_string(),
            checkin,
            checkout,
            nights,
        })
    }
}

fn consecutive_dates(start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..days as i64).map(|i| start + Duration::days(i)).collect()
}

/// One forecast day's weather inputs for scoring
struct DayWeather {
    max_temp: f64,
    min_temp: f64,
    precip_sum: f64,
    precip_prob: f64,
    wind: f64,
    code: u16,
}

/// Score every parseable forecast day with the provided function
fn score_forecast_days(
    daily: &DailyForecast,
    score: impl Fn(&DayWeather) -> i32,
) -> Vec<(NaiveDate, i32)> {
    daily
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, date_str)| {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
            let get = |v: &Vec<Option<f64>>, default: f64| {
                v.get(i).copied().flatten().unwrap_or(default)
            };
            let day = DayWeather {
                max_temp: get(&daily.temperature_2m_max, 20.0),
                min_temp: get(&daily.temperature_2m_min, 10.0),
                precip_sum: get(&daily.precipitation_sum, 0.0),
                precip_prob: get(&daily.precipitation_probability_max, 0.0),
                wind: get(&daily.wind_speed_10m_max, 0.0),
                code: daily.weather_code.get(i).copied().flatten().unwrap_or(0),
            };

            Some((date, score(&day)))
        })
        .collect()
}

/// Best consecutive window of `len` days by total score. Input days must be
/// in chronological order (forecast order); gaps break a window.
fn best_consecutive_window(scored: &[(NaiveDate, i32)], len: usize) -> Option<Vec<NaiveDate>> {
    if len == 0 || scored.len() < len {
        return None;
    }

    let mut best: Option<(i64, usize)> = None;

    for start in 0..=(scored.len() - len) {
        let window = &scored[start..start + len];
        let consecutive = window
            .windows(2)
            .all(|pair| (pair[1].0 - pair[0].0).num_days() == 1);
        if !consecutive {
            continue;
        }

        let total: i64 = window.iter().map(|(_, s)| *s as i64).sum();
        if best.map(|(b, _)| total > b).unwrap_or(true) {
            best = Some((total, start));
        }
    }

    best.map(|(_, start)| scored[start..start + len].iter().map(|(d, _)| *d).collect())
}

fn format_trip_plan(
    location: &str,
    dates: &[NaiveDate],
    daily_plans: &[DayPlan],
    accommodation: Option<&AccommodationSuggestion>,
    style: TripStyle,
    budget: Budget,
) -> String {
    let start = dates[0].format("%B %d, %Y");
    let end = dates[dates.len() - 1].format("%B %d, %Y");

    let mut out = format!("TRIP PLAN FOR {}\n", location.to_uppercase());
    out.push_str(&format!("Dates: {} - {} ({} days)\n", start, end, dates.len()));
    out.push_str(&format!("Style: {}\n", style.label()));
    out.push_str(&format!(
        "Budget: {} (about ${}/day)\n\n",
        budget.label(),
        budget.daily_budget_usd()
    ));

    if let Some(acc) = accommodation {
        out.push_str("ACCOMMODATION:\n");
        out.push_str(&format!("  Check-in: {}\n", acc.checkin));
        out.push_str(&format!("  Check-out: {}\n", acc.checkout));
        out.push_str(&format!("  Duration: {} nights\n", acc.nights));
        match acc.price_per_night {
            Some(price) => out.push_str(&format!(
                "  Suggested: {} ({} {} per night, {} {} total)\n\n",
                acc.name,
                price,
                acc.currency,
                price * acc.nights as f64,
                acc.currency
            )),
            None => out.push_str(&format!("  Suggested: {}\n\n", acc.name)),
        }
    }

    out.push_str("DAILY ITINERARY:\n\n");
    out.push_str(&format_daily_plans(daily_plans, None));

    let total_activities: usize = daily_plans.iter().map(|d| d.activities.len()).sum();
    out.push_str("TRIP PLANNING NOTES:\n");
    out.push_str(&format!("- Plan includes {} total activities\n", total_activities));
    out.push_str(&format!(
        "- Activities are chosen for a {} travel style\n",
        style.label().to_lowercase()
    ));
    out.push_str("- Check weather conditions before departure\n");
    out.push_str("- Book accommodations and activities in advance\n");

    out
}

fn format_weather_trip_plan(
    location: &str,
    dates: &[NaiveDate],
    daily_plans: &[DayPlan],
    weather_condition: &str,
    style: TripStyle,
) -> String {
    let start = dates[0].format("%B %d, %Y");
    let end = dates[dates.len() - 1].format("%B %d, %Y");

    let mut out = format!("WEATHER-OPTIMIZED TRIP PLAN FOR {}\n", location.to_uppercase());
    out.push_str(&format!("Dates: {} - {} ({} days)\n", start, end, dates.len()));
    out.push_str(&format!("Optimized for: {} weather\n", weather_condition));
    out.push_str(&format!("Style: {}\n\n", style.label()));

    out.push_str("WEATHER-SPECIFIC ITINERARY:\n\n");
    out.push_str(&format_daily_plans(daily_plans, Some(weather_condition)));

    out.push_str("WEATHER PLANNING NOTES:\n");
    out.push_str(&format!(
        "- All activities chosen for {} conditions\n",
        weather_condition
    ));
    out.push_str("- Check the forecast 24-48 hours before each activity\n");
    out.push_str(&format!(
        "- Pack appropriate clothing for {} weather\n",
        weather_condition
    ));

    out
}

fn format_daily_plans(daily_plans: &[DayPlan], expected_weather: Option<&str>) -> String {
    let mut out = String::new();

    for (i, day) in daily_plans.iter().enumerate() {
        out.push_str(&format!(
            "Day {} - {}, {}:\n",
            i + 1,
            day.date.format("%A"),
            day.date.format("%Y-%m-%d")
        ));
        if let Some(condition) = expected_weather {
            out.push_str(&format!("  Expected weather: {}\n", condition));
        }

        if day.activities.is_empty() {
            out.push_str("  No activities planned for this day\n\n");
            continue;
        }

        for activity in &day.activities {
            out.push_str(&format!("  [{}] {}\n", activity.time_of_day, activity.name));
            out.push_str(&format!(
                "     Type: {}\n",
                activity.category.replace('_', " ")
            ));
            if let Some(rating) = activity.rating {
                out.push_str(&format!("     Rating: {}/5.0\n", rating));
            }
            if let Some(address) = &activity.address {
                out.push_str(&format!("     Address: {}\n", address));
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_duration_default() {
        assert_eq!(parse_duration(None), Some(DEFAULT_TRIP_DURATION));
        assert_eq!(parse_duration(Some(&Value::Null)), Some(DEFAULT_TRIP_DURATION));
    }

    #[test]
    fn test_parse_duration_numbers() {
        assert_eq!(parse_duration(Some(&serde_json::json!(5))), Some(5));
        assert_eq!(parse_duration(Some(&serde_json::json!(30))), Some(30));
        assert_eq!(parse_duration(Some(&serde_json::json!(0))), None);
        assert_eq!(parse_duration(Some(&serde_json::json!(31))), None);
    }

    #[test]
    fn test_parse_duration_strings() {
        assert_eq!(parse_duration(Some(&serde_json::json!("7"))), Some(7));
        assert_eq!(parse_duration(Some(&serde_json::json!("weekend"))), Some(2));
        assert_eq!(parse_duration(Some(&serde_json::json!("WEEK"))), Some(7));
        assert_eq!(parse_duration(Some(&serde_json::json!("forever"))), None);
    }

    #[test]
    fn test_trip_style_parsing() {
        assert_eq!(TripStyle::from_string("balanced"), Some(TripStyle::Balanced));
        assert_eq!(TripStyle::from_string("Food_Focused"), Some(TripStyle::FoodFocused));
        assert_eq!(TripStyle::from_string("chaotic"), None);
    }

    #[test]
    fn test_trip_style_configs() {
        assert_eq!(TripStyle::Relaxed.activities_per_day(), 2);
        assert_eq!(TripStyle::Adventure.activities_per_day(), 4);
        assert!(TripStyle::Adventure.travel_radius_m() > TripStyle::Relaxed.travel_radius_m());
        assert!(TripStyle::Cultural.preferred_types().contains(&"museum"));
    }

    #[test]
    fn test_budget_parsing() {
        assert_eq!(Budget::from_string("luxury"), Some(Budget::Luxury));
        // "moderate" is a common synonym in requests
        assert_eq!(Budget::from_string("moderate"), Some(Budget::MidRange));
        assert_eq!(Budget::from_string("infinite"), None);
        assert!(Budget::Luxury.daily_budget_usd() > Budget::Budget.daily_budget_usd());
    }

    #[test]
    fn test_condition_match_score() {
        assert_eq!(condition_match_score("sunny", 0), 100);
        assert_eq!(condition_match_score("sunny", 61), 0);
        assert_eq!(condition_match_score("rainy", 63), 100);
        assert_eq!(condition_match_score("rainy", 0), 0);
        assert_eq!(condition_match_score("snowy", 73), 100);
        assert_eq!(condition_match_score("snowy", 61), 0);
        assert_eq!(condition_match_score("martian", 0), 0);
    }

    #[test]
    fn test_weather_day_schedule() {
        let schedule = weather_day_schedule("rainy").unwrap();
        let periods: Vec<&str> = schedule.iter().map(|(p, _)| *p).collect();
        assert_eq!(periods, vec!["morning", "afternoon", "evening"]);
        assert!(weather_day_schedule("hail").is_none());
    }

    #[test]
    fn test_consecutive_dates() {
        let dates = consecutive_dates(date("2026-08-10"), 3);
        assert_eq!(dates, vec![date("2026-08-10"), date("2026-08-11"), date("2026-08-12")]);
    }

    #[test]
    fn test_best_consecutive_window_picks_highest_sum() {
        let scored = vec![
            (date("2026-08-10"), 40),
            (date("2026-08-11"), 90),
            (date("2026-08-12"), 95),
            (date("2026-08-13"), 30),
        ];
        let window = best_consecutive_window(&scored, 2).unwrap();
        assert_eq!(window, vec![date("2026-08-11"), date("2026-08-12")]);
    }

    #[test]
    fn test_best_consecutive_window_skips_gaps() {
        let scored = vec![
            (date("2026-08-10"), 90),
            // gap: the 11th is missing
            (date("2026-08-12"), 95),
            (date("2026-08-13"), 95),
        ];
        let window = best_consecutive_window(&scored, 2).unwrap();
        assert_eq!(window, vec![date("2026-08-12"), date("2026-08-13")]);
    }

    #[test]
    fn test_best_consecutive_window_too_short() {
        let scored = vec![(date("2026-08-10"), 90)];
        assert!(best_consecutive_window(&scored, 2).is_none());
        assert!(best_consecutive_window(&[], 1).is_none());
    }

    #[test]
    fn test_score_forecast_days_skips_bad_dates() {
        let daily = DailyForecast {
            time: vec!["2026-08-10".into(), "not-a-date".into()],
            temperature_2m_max: vec![Some(22.0), Some(22.0)],
            temperature_2m_min: vec![Some(14.0), Some(14.0)],
            precipitation_sum: vec![Some(0.0), Some(0.0)],
            precipitation_probability_max: vec![Some(0.0), Some(0.0)],
            wind_speed_10m_max: vec![Some(10.0), Some(10.0)],
            weather_code: vec![Some(1), Some(1)],
        };
        let scored = score_forecast_days(&daily, |d| {
            score_day(d.max_temp, d.min_temp, d.precip_sum, d.precip_prob, d.wind, d.code)
        });
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].0, date("2026-08-10"));
    }

    #[test]
    fn test_format_trip_plan() {
        let dates = vec![date("2026-08-10"), date("2026-08-11")];
        let plans = vec![
            DayPlan {
                date: dates[0],
                activities: vec![Activity {
                    name: "Café Nicola".to_string(),
                    category: "cafe".to_string(),
                    time_of_day: "morning",
                    rating: Some(4.3),
                    address: Some("Praça Dom Pedro IV".to_string()),
                }],
            },
            DayPlan {
                date: dates[1],
                activities: vec![],
            },
        ];

        let out = format_trip_plan(
            "Lisbon",
            &dates,
            &plans,
            None,
            TripStyle::Balanced,
            Budget::MidRange,
        );

        assert!(out.starts_with("TRIP PLAN FOR LISBON"));
        assert!(out.contains("(2 days)"));
        assert!(out.contains("Day 1 - Monday, 2026-08-10:"));
        assert!(out.contains("[morning] Café Nicola"));
        assert!(out.contains("Rating: 4.3/5.0"));
        assert!(out.contains("No activities planned for this day"));
        assert!(out.contains("Plan includes 1 total activities"));
        assert!(!out.contains("ACCOMMODATION"));
    }

    #[test]
    fn test_format_trip_plan_with_accommodation() {
        let dates = vec![date("2026-08-10")];
        let plans = vec![DayPlan {
            date: dates[0],
            activities: vec![],
        }];
        let acc = AccommodationSuggestion {
            name: "Hotel Aurora".to_string(),
            price_per_night: Some(120.0),
            currency: "USD".to_string(),
            checkin: "2026-08-10".to_string(),
            checkout: "2026-08-11".to_string(),
            nights: 1,
        };

        let out = format_trip_plan(
            "Lisbon",
            &dates,
            &plans,
            Some(&acc),
            TripStyle::Relaxed,
            Budget::Luxury,
        );
        assert!(out.contains("ACCOMMODATION:"));
        assert!(out.contains("Hotel Aurora (120 USD per night, 120 USD total)"));
    }

    #[test]
    fn test_format_weather_trip_plan() {
        let dates = vec![date("2026-08-10")];
        let plans = vec![DayPlan {
            date: dates[0],
            activities: vec![Activity {
                name: "MAAT".to_string(),
                category: "art_gallery".to_string(),
                time_of_day: "morning",
                rating: None,
                address: None,
            }],
        }];

        let out = format_weather_trip_plan("Lisbon", &dates, &plans, "rainy", TripStyle::Cultural);
        assert!(out.starts_with("WEATHER-OPTIMIZED TRIP PLAN FOR LISBON"));
        assert!(out.contains("Optimized for: rainy weather"));
        assert!(out.contains("Expected weather: rainy"));
        assert!(out.contains("Type: art gallery"));
    }
}
