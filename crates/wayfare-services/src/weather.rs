//! Weather service — current conditions, trip-day scoring, severe events
//!
//! Backed by the Open-Meteo forecast API (no API key). Day scoring and event
//! detection are pure functions over the deserialized forecast.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::geo::{Coordinates, Geocoder};
use crate::http::{ServiceError, UpstreamClient};

/// Open-Meteo forecast endpoint
pub const WEATHER_API_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

const CURRENT_WEATHER_PARAMS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,wind_speed_10m,wind_direction_10m";

const DAILY_FORECAST_PARAMS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,wind_speed_10m_max";

const DETAILED_DAILY_PARAMS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum,\
     precipitation_probability_max,wind_speed_10m_max,weather_code";

const HOURLY_PARAMS: &str = "temperature_2m,precipitation,weather_code,wind_speed_10m";

// Day-score penalties. A day starts at 100 and loses points for conditions
// a traveler would rather avoid.
const TEMP_EXTREME_MAX: f64 = 30.0;
const TEMP_EXTREME_MIN: f64 = 5.0;
const TEMP_EXTREME_PENALTY: f64 = 30.0;
const TEMP_MODERATE_MAX: f64 = 25.0;
const TEMP_MODERATE_MIN: f64 = 10.0;
const TEMP_MODERATE_PENALTY: f64 = 15.0;
const WIND_SEVERE_KMH: f64 = 40.0;
const WIND_SEVERE_PENALTY: f64 = 25.0;
const WIND_MODERATE_KMH: f64 = 30.0;
const WIND_MODERATE_PENALTY: f64 = 15.0;
const CODE_SNOW_MIN: u16 = 70;
const CODE_SNOW_PENALTY: f64 = 40.0;
const CODE_RAIN_MIN: u16 = 50;
const CODE_RAIN_PENALTY: f64 = 30.0;
const CODE_DRIZZLE_MIN: u16 = 30;
const CODE_DRIZZLE_PENALTY: f64 = 20.0;

// Severe event thresholds
const HEAVY_RAIN_MM_PER_HOUR: f64 = 5.0;
const STRONG_WIND_KMH: f64 = 40.0;
const CODE_THUNDERSTORM_MIN: u16 = 90;

/// Days of hourly data scanned for severe events
pub const DEFAULT_FORECAST_DAYS: u8 = 3;

/// Forecast days shown in reports
const MAX_DISPLAY_DAYS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub current: Option<CurrentConditions>,
    pub daily: Option<DailyForecast>,
    pub hourly: Option<HourlyForecast>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<u16>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<u16>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

fn code_at(values: &[Option<u16>], i: usize) -> u16 {
    values.get(i).copied().flatten().unwrap_or(0)
}

/// A forecast day with its suitability score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDay {
    pub date: String,
    pub score: i32,
    pub max_temp: f64,
    pub precip: f64,
}

/// A detected severe weather event
#[derive(Debug, Clone)]
pub struct WeatherEvent {
    pub time: String,
    pub label: &'static str,
    pub value: String,
}

/// Score a day 0–100 for trip suitability
pub fn score_day(
    max_temp: f64,
    min_temp: f64,
    precip_sum: f64,
    precip_prob: f64,
    wind: f64,
    weather_code: u16,
) -> i32 {
    let mut score = 100.0_f64;

    if max_temp > TEMP_EXTREME_MAX || min_temp < TEMP_EXTREME_MIN {
        score -= TEMP_EXTREME_PENALTY;
    } else if max_temp > TEMP_MODERATE_MAX || min_temp < TEMP_MODERATE_MIN {
        score -= TEMP_MODERATE_PENALTY;
    }

    score -= (precip_sum * 10.0).min(50.0);
    score -= (precip_prob / 2.0).min(30.0);

    if wind > WIND_SEVERE_KMH {
        score -= WIND_SEVERE_PENALTY;
    } else if wind > WIND_MODERATE_KMH {
        score -= WIND_MODERATE_PENALTY;
    }

    if weather_code >= CODE_SNOW_MIN {
        score -= CODE_SNOW_PENALTY;
    } else if weather_code >= CODE_RAIN_MIN {
        score -= CODE_RAIN_PENALTY;
    } else if weather_code >= CODE_DRIZZLE_MIN {
        score -= CODE_DRIZZLE_PENALTY;
    }

    score.max(0.0) as i32
}

/// Score every forecast day, best first
pub fn score_days(daily: &DailyForecast) -> Vec<ScoredDay> {
    let mut days: Vec<ScoredDay> = daily
        .time
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let max_temp = at(&daily.temperature_2m_max, i).unwrap_or(20.0);
            let min_temp = at(&daily.temperature_2m_min, i).unwrap_or(10.0);
            let precip_sum = at(&daily.precipitation_sum, i).unwrap_or(0.0);
            let precip_prob = at(&daily.precipitation_probability_max, i).unwrap_or(0.0);
            let wind = at(&daily.wind_speed_10m_max, i).unwrap_or(0.0);
            let code = code_at(&daily.weather_code, i);

            ScoredDay {
                date: date.clone(),
                score: score_day(max_temp, min_temp, precip_sum, precip_prob, wind, code),
                max_temp,
                precip: precip_sum,
            }
        })
        .collect();

    days.sort_by(|a, b| b.score.cmp(&a.score));
    days
}

/// Scan hourly data for severe weather events
pub fn detect_events(hourly: &HourlyForecast) -> Vec<WeatherEvent> {
    let mut events = Vec::new();

    for (i, time) in hourly.time.iter().enumerate() {
        let precip = at(&hourly.precipitation, i).unwrap_or(0.0);
        let wind = at(&hourly.wind_speed_10m, i).unwrap_or(0.0);
        let code = code_at(&hourly.weather_code, i);

        if precip >= HEAVY_RAIN_MM_PER_HOUR {
            events.push(WeatherEvent {
                time: time.clone(),
                label: "Heavy Rain",
                value: format!("{}mm/h", precip),
            });
        }

        if wind >= STRONG_WIND_KMH {
            events.push(WeatherEvent {
                time: time.clone(),
                label: "Strong Winds",
                value: format!("{}km/h", wind),
            });
        }

        if code >= CODE_THUNDERSTORM_MIN {
            events.push(WeatherEvent {
                time: time.clone(),
                label: "Thunderstorm",
                value: format!("Weather code {}", code),
            });
        } else if code >= CODE_SNOW_MIN {
            events.push(WeatherEvent {
                time: time.clone(),
                label: "Snow",
                value: format!("Weather code {}", code),
            });
        }
    }

    events
}

/// Service for weather-related operations
pub struct WeatherService {
    geocoder: Arc<Geocoder>,
    client: UpstreamClient,
}

impl WeatherService {
    pub fn new(geocoder: Arc<Geocoder>) -> Self {
        Self {
            geocoder,
            client: UpstreamClient::new(),
        }
    }

    /// Current weather and short forecast for a location
    pub async fn current_weather(&self, location: &str) -> Result<String, ServiceError> {
        let coords = self.geocoder.resolve(location).await?;

        let query = [
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("current", CURRENT_WEATHER_PARAMS.to_string()),
            ("daily", DAILY_FORECAST_PARAMS.to_string()),
            ("timezone", "auto".to_string()),
        ];

        let forecast = self.fetch(&query).await?;
        Ok(format_weather_report(location, &forecast))
    }

    /// Best days for a trip in the next week, scored by weather
    pub async fn trip_recommendations(&self, location: &str) -> Result<String, ServiceError> {
        let coords = self.geocoder.resolve(location).await?;

        let query = [
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("daily", DETAILED_DAILY_PARAMS.to_string()),
            ("timezone", "auto".to_string()),
        ];

        let forecast = self.fetch(&query).await?;
        let daily = forecast.daily.unwrap_or_default();
        let days = score_days(&daily);
        Ok(format_trip_recommendations(location, &days))
    }

    /// Severe weather events expected in the next few days
    pub async fn severe_weather_events(&self, location: &str) -> Result<String, ServiceError> {
        let coords = self.geocoder.resolve(location).await?;

        let query = [
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("hourly", HOURLY_PARAMS.to_string()),
            ("daily", "weather_code,precipitation_probability_max".to_string()),
            ("forecast_days", DEFAULT_FORECAST_DAYS.to_string()),
            ("timezone", "auto".to_string()),
        ];

        let forecast = self.fetch(&query).await?;
        let hourly = forecast.hourly.unwrap_or_default();
        let events = detect_events(&hourly);
        Ok(format_weather_events(location, &events))
    }

    /// Raw daily forecast for the given number of days (used by the planner)
    pub async fn daily_forecast(
        &self,
        coords: Coordinates,
        days: u8,
    ) -> Result<DailyForecast, ServiceError> {
        let query = [
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("daily", DETAILED_DAILY_PARAMS.to_string()),
            ("forecast_days", days.to_string()),
            ("timezone", "auto".to_string()),
        ];

        let forecast = self.fetch(&query).await?;
        Ok(forecast.daily.unwrap_or_default())
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<ForecastResponse, ServiceError> {
        let value = self.client.get_json(WEATHER_API_BASE_URL, query).await?;
        let forecast: ForecastResponse = serde_json::from_value(value)
            .map_err(|e| ServiceError::Payload(format!("forecast response: {}", e)))?;
        debug!(
            "Fetched forecast (current: {}, daily days: {})",
            forecast.current.is_some(),
            forecast.daily.as_ref().map(|d| d.time.len()).unwrap_or(0)
        );
        Ok(forecast)
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "N/A".to_string(),
    }
}

fn format_weather_report(location: &str, forecast: &ForecastResponse) -> String {
    let mut report = format!("Weather for {}:\n", location);

    if let Some(current) = &forecast.current {
        report.push_str(&format!(
            "Current Temperature: {} °C\n",
            fmt_opt(current.temperature_2m)
        ));
        report.push_str(&format!(
            "Feels Like: {} °C\n",
            fmt_opt(current.apparent_temperature)
        ));
        report.push_str(&format!(
            "Humidity: {} %\n",
            fmt_opt(current.relative_humidity_2m)
        ));
        report.push_str(&format!(
            "Precipitation: {} mm\n",
            fmt_opt(current.precipitation)
        ));
        report.push_str(&format!(
            "Wind Speed: {} km/h\n",
            fmt_opt(current.wind_speed_10m)
        ));
        report.push_str(&format!(
            "Wind Direction: {} °\n",
            fmt_opt(current.wind_direction_10m)
        ));
    }

    if let Some(daily) = &forecast.daily
        && !daily.time.is_empty()
    {
        report.push_str("\nForecast for the next days:\n");
        for i in 0..daily.time.len().min(MAX_DISPLAY_DAYS) {
            report.push_str(&format!(
                "{}: {}-{} °C, Precipitation: {} mm, Wind: {} km/h\n",
                daily.time[i],
                fmt_opt(at(&daily.temperature_2m_min, i)),
                fmt_opt(at(&daily.temperature_2m_max, i)),
                fmt_opt(at(&daily.precipitation_sum, i)),
                fmt_opt(at(&daily.wind_speed_10m_max, i)),
            ));
        }
    }

    report
}

fn format_trip_recommendations(location: &str, days: &[ScoredDay]) -> String {
    if days.is_empty() {
        return format!("No forecast data available for {}", location);
    }

    let mut result = format!("Best days for a trip to {} in the next week:\n", location);
    for (i, day) in days.iter().take(MAX_DISPLAY_DAYS).enumerate() {
        result.push_str(&format!(
            "{}. {}: Score {}/100, Max temp: {}°C, Precipitation: {}mm\n",
            i + 1,
            day.date,
            day.score,
            day.max_temp,
            day.precip
        ));
    }

    result.push_str("\nDays to avoid:\n");
    for day in days.iter().rev().take(2).rev() {
        result.push_str(&format!(
            "{}: Score {}/100, Max temp: {}°C, Precipitation: {}mm\n",
            day.date, day.score, day.max_temp, day.precip
        ));
    }

    result
}

fn format_weather_events(location: &str, events: &[WeatherEvent]) -> String {
    if events.is_empty() {
        return format!(
            "No severe weather events predicted for {} in the next {} days.",
            location, DEFAULT_FORECAST_DAYS
        );
    }

    let mut result = format!(
        "Severe weather events for {} in the next {} days:\n",
        location, DEFAULT_FORECAST_DAYS
    );

    // Group events by day for readability
    let mut by_day: BTreeMap<&str, Vec<&WeatherEvent>> = BTreeMap::new();
    for event in events {
        let day = event.time.split('T').next().unwrap_or(&event.time);
        by_day.entry(day).or_default().push(event);
    }

    for (day, day_events) in by_day {
        result.push_str(&format!("\n{}:\n", day));
        for event in day_events {
            let time = event.time.split('T').nth(1).unwrap_or("");
            result.push_str(&format!("  {}: {} - {}\n", time, event.label, event.value));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_day_perfect() {
        // Mild temperatures, no rain, calm wind, clear sky
        assert_eq!(score_day(22.0, 14.0, 0.0, 0.0, 10.0, 0), 100);
    }

    #[test]
    fn test_score_day_temperature_penalties() {
        assert_eq!(score_day(32.0, 15.0, 0.0, 0.0, 0.0, 0), 70); // extreme heat
        assert_eq!(score_day(27.0, 15.0, 0.0, 0.0, 0.0, 0), 85); // moderately hot
        assert_eq!(score_day(20.0, 2.0, 0.0, 0.0, 0.0, 0), 70); // extreme cold
    }

    #[test]
    fn test_score_day_precipitation_capped() {
        // 10mm of rain would be -100, capped at -50
        assert_eq!(score_day(20.0, 15.0, 10.0, 0.0, 0.0, 0), 50);
        // 100% probability caps at -30 (100/2 = 50 → capped)
        assert_eq!(score_day(20.0, 15.0, 0.0, 100.0, 0.0, 0), 70);
    }

    #[test]
    fn test_score_day_wind_penalties() {
        assert_eq!(score_day(20.0, 15.0, 0.0, 0.0, 45.0, 0), 75);
        assert_eq!(score_day(20.0, 15.0, 0.0, 0.0, 35.0, 0), 85);
    }

    #[test]
    fn test_score_day_weather_code_penalties() {
        assert_eq!(score_day(20.0, 15.0, 0.0, 0.0, 0.0, 75), 60); // snow
        assert_eq!(score_day(20.0, 15.0, 0.0, 0.0, 0.0, 61), 70); // rain
        assert_eq!(score_day(20.0, 15.0, 0.0, 0.0, 0.0, 45), 80); // drizzle/fog band
    }

    #[test]
    fn test_score_day_floors_at_zero() {
        assert_eq!(score_day(40.0, -10.0, 20.0, 100.0, 80.0, 99), 0);
    }

    #[test]
    fn test_score_days_sorted_best_first() {
        let daily = DailyForecast {
            time: vec!["2026-08-10".into(), "2026-08-11".into(), "2026-08-12".into()],
            temperature_2m_max: vec![Some(22.0), Some(35.0), Some(24.0)],
            temperature_2m_min: vec![Some(14.0), Some(20.0), Some(15.0)],
            precipitation_sum: vec![Some(0.0), Some(8.0), Some(1.0)],
            precipitation_probability_max: vec![Some(5.0), Some(90.0), Some(20.0)],
            wind_speed_10m_max: vec![Some(12.0), Some(45.0), Some(18.0)],
            weather_code: vec![Some(1), Some(63), Some(2)],
        };

        let days = score_days(&daily);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, "2026-08-10");
        assert_eq!(days[2].date, "2026-08-11");
        assert!(days[0].score > days[1].score);
        assert!(days[1].score >= days[2].score);
    }

    #[test]
    fn test_detect_events() {
        let hourly = HourlyForecast {
            time: vec![
                "2026-08-10T09:00".into(),
                "2026-08-10T10:00".into(),
                "2026-08-11T12:00".into(),
            ],
            precipitation: vec![Some(6.5), Some(0.0), Some(0.0)],
            weather_code: vec![Some(63), Some(95), Some(71)],
            wind_speed_10m: vec![Some(20.0), Some(42.0), Some(10.0)],
        };

        let events = detect_events(&hourly);
        let labels: Vec<&str> = events.iter().map(|e| e.label).collect();
        assert!(labels.contains(&"Heavy Rain"));
        assert!(labels.contains(&"Strong Winds"));
        assert!(labels.contains(&"Thunderstorm"));
        assert!(labels.contains(&"Snow"));
    }

    #[test]
    fn test_detect_events_quiet_forecast() {
        let hourly = HourlyForecast {
            time: vec!["2026-08-10T09:00".into()],
            precipitation: vec![Some(0.2)],
            weather_code: vec![Some(2)],
            wind_speed_10m: vec![Some(15.0)],
        };
        assert!(detect_events(&hourly).is_empty());
    }

    #[test]
    fn test_format_weather_events_empty() {
        let report = format_weather_events("Lisbon", &[]);
        assert!(report.contains("No severe weather events"));
        assert!(report.contains("Lisbon"));
    }

    #[test]
    fn test_format_weather_events_grouped_by_day() {
        let events = vec![
            WeatherEvent {
                time: "2026-08-10T09:00".into(),
                label: "Heavy Rain",
                value: "6.5mm/h".into(),
            },
            WeatherEvent {
                time: "2026-08-11T12:00".into(),
                label: "Snow",
                value: "Weather code 71".into(),
            },
        ];
        let report = format_weather_events("Oslo", &events);
        assert!(report.contains("2026-08-10:"));
        assert!(report.contains("2026-08-11:"));
        assert!(report.contains("09:00: Heavy Rain - 6.5mm/h"));
    }

    #[test]
    fn test_format_trip_recommendations() {
        let days = vec![
            ScoredDay {
                date: "2026-08-10".into(),
                score: 95,
                max_temp: 22.0,
                precip: 0.0,
            },
            ScoredDay {
                date: "2026-08-12".into(),
                score: 80,
                max_temp: 24.0,
                precip: 1.0,
            },
            ScoredDay {
                date: "2026-08-11".into(),
                score: 20,
                max_temp: 35.0,
                precip: 8.0,
            },
        ];
        let report = format_trip_recommendations("Lisbon", &days);
        assert!(report.starts_with("Best days for a trip to Lisbon"));
        assert!(report.contains("1. 2026-08-10: Score 95/100"));
        assert!(report.contains("Days to avoid:"));
    }

    #[test]
    fn test_forecast_deserialization() {
        let json = r#"{
            "current": {"temperature_2m": 21.5, "relative_humidity_2m": 60.0,
                        "apparent_temperature": 22.0, "precipitation": 0.0,
                        "wind_speed_10m": 12.0, "wind_direction_10m": 180.0},
            "daily": {"time": ["2026-08-10"], "temperature_2m_max": [25.0],
                      "temperature_2m_min": [16.0], "precipitation_sum": [0.0],
                      "wind_speed_10m_max": [14.0]}
        }"#;
        let forecast: ForecastResponse = serde_json::from_str(json).unwrap();
        assert!(forecast.current.is_some());
        let report = format_weather_report("Lisbon", &forecast);
        assert!(report.contains("Current Temperature: 21.5 °C"));
        assert!(report.contains("2026-08-10: 16-25 °C"));
    }
}
