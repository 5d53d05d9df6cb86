//! Geocoding via the Open-Meteo geocoding API
//!
//! All domain services accept free-form location strings ("Lisbon", "Sialkot")
//! and resolve them to coordinates here. Lookups are LRU-cached; geocoding is
//! by far the hottest upstream call in a conversation.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::debug;

use crate::http::{ServiceError, UpstreamClient};

/// Open-Meteo geocoding endpoint (no API key required)
pub const GEOCODING_API_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

/// Mean Earth radius used for distance calculations
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Number of geocoding results kept in the cache
const CACHE_SIZE: usize = 256;

/// A resolved geographic position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether the position is on the globe
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "coordinates ({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two points in kilometers (haversine)
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

/// Location-string → coordinates resolver with an LRU cache
pub struct Geocoder {
    client: UpstreamClient,
    cache: Mutex<LruCache<String, Coordinates>>,
}

impl Geocoder {
    pub fn new() -> Self {
        Self {
            client: UpstreamClient::new(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_SIZE).expect("cache size is nonzero"),
            )),
        }
    }

    /// Resolve a location name to coordinates (top geocoding result).
    ///
    /// Returns [`ServiceError::LocationNotFound`] when the API has no match.
    pub async fn resolve(&self, location: &str) -> Result<Coordinates, ServiceError> {
        let key = location.trim().to_lowercase();
        if key.is_empty() {
            return Err(ServiceError::LocationNotFound(location.to_string()));
        }

        if let Some(coords) = self.cache.lock().expect("geocoder cache poisoned").get(&key) {
            debug!("Geocoder cache hit for '{}'", key);
            return Ok(*coords);
        }

        let query = [
            ("name", location.to_string()),
            ("count", "1".to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];

        let value = self.client.get_json(GEOCODING_API_URL, &query).await?;
        let response: GeocodingResponse = serde_json::from_value(value)
            .map_err(|e| ServiceError::Payload(format!("geocoding response: {}", e)))?;

        let Some(first) = response.results.first() else {
            return Err(ServiceError::LocationNotFound(location.to_string()));
        };

        let coords = Coordinates::new(first.latitude, first.longitude);
        if !coords.is_valid() {
            return Err(ServiceError::Payload(format!(
                "geocoding returned out-of-range coordinates for '{}'",
                location
            )));
        }

        self.cache
            .lock()
            .expect("geocoder cache poisoned")
            .put(key, coords);
        Ok(coords)
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(38.72, -9.14).is_valid());
        assert!(Coordinates::new(-90.0, 180.0).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -181.0).is_valid());
    }

    #[test]
    fn test_coordinates_display() {
        let c = Coordinates::new(38.7223, -9.1393);
        assert_eq!(c.to_string(), "coordinates (38.7223, -9.1393)");
    }

    #[test]
    fn test_haversine_zero_distance() {
        let lisbon = Coordinates::new(38.7223, -9.1393);
        assert!(haversine_km(lisbon, lisbon) < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Lisbon → Porto is roughly 274 km as the crow flies
        let lisbon = Coordinates::new(38.7223, -9.1393);
        let porto = Coordinates::new(41.1579, -8.6291);
        let d = haversine_km(lisbon, porto);
        assert!((250.0..300.0).contains(&d), "unexpected distance: {}", d);
    }

    #[test]
    fn test_geocoding_response_parsing() {
        let json = r#"{"results":[{"latitude":38.7223,"longitude":-9.1393,"name":"Lisbon"}]}"#;
        let parsed: GeocodingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert!((parsed.results[0].latitude - 38.7223).abs() < 1e-9);
    }

    #[test]
    fn test_geocoding_response_empty() {
        let parsed: GeocodingResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_empty_location() {
        let geocoder = Geocoder::new();
        let err = geocoder.resolve("   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::LocationNotFound(_)));
    }
}
