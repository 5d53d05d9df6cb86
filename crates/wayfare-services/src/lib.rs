//! wayfare-services — domain tool servers for the wayfare travel assistant
//!
//! Four domains, each exposable as a standalone HTTP tool server:
//! - weather: Open-Meteo current conditions, trip-day scoring, severe events
//! - booking: Booking.com accommodation search and details
//! - places: Google Places nearby search and recommendations
//! - planner: multi-day itineraries composed from the other three
//!
//! Shared plumbing: Open-Meteo geocoding with an LRU cache, an upstream JSON
//! client with a common error taxonomy, and the tool-server HTTP surface.

pub mod booking;
pub mod geo;
pub mod http;
pub mod places;
pub mod planner;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod weather;

pub use booking::{BookingService, StayFilters, StaySearch};
pub use geo::{Coordinates, Geocoder, haversine_km};
pub use http::{ServiceError, UpstreamClient};
pub use places::{PlaceQuery, PlacesService, TravelMode};
pub use planner::{Budget, PlannerService, TripStyle};
pub use server::ToolServer;
pub use tools::{booking_registry, places_registry, planner_registry, weather_registry};
pub use weather::WeatherService;
