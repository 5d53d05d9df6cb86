//! Shared upstream HTTP helpers and the services error taxonomy

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default timeout for upstream API requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from domain services.
///
/// The first three variants carry messages meant to be relayed verbatim to
/// the traveler (via the agent); the rest describe transport-level failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("API key is required for {service} operations. Please configure your {service} API key.")]
    MissingApiKey { service: &'static str },

    #[error("Could not find coordinates for {0}")]
    LocationNotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("HTTP error {status}")]
    Status { status: u16 },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response payload: {0}")]
    Payload(String),
}

impl ServiceError {
    /// Whether the error text is already a complete, user-facing message
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey { .. } | Self::LocationNotFound(_) | Self::InvalidInput(_)
        )
    }

    /// Render the error the way tool output expects it: user-facing messages
    /// pass through, transport errors get a context prefix.
    pub fn user_message(&self, context: &str) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            format!("Error in {}: {}", context, self)
        }
    }
}

/// Thin JSON HTTP client shared by all domain services
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    /// GET a JSON document
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ServiceError> {
        self.get_json_inner(url, query, None).await
    }

    /// GET a JSON document with a bearer token
    pub async fn get_json_auth(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: &str,
    ) -> Result<Value, ServiceError> {
        self.get_json_inner(url, query, Some(bearer)).await
    }

    async fn get_json_inner(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<Value, ServiceError> {
        debug!("GET {} ({} params)", url, query.len());

        let mut request = self.client.get(url).query(query);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
            });
        }

        let value = response.json().await?;
        Ok(value)
    }
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_message() {
        let err = ServiceError::MissingApiKey {
            service: "Booking.com",
        };
        assert_eq!(
            err.to_string(),
            "API key is required for Booking.com operations. Please configure your Booking.com API key."
        );
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_user_message_passthrough() {
        let err = ServiceError::LocationNotFound("Atlantis".to_string());
        assert_eq!(err.user_message("weather data fetch"), "Could not find coordinates for Atlantis");
    }

    #[test]
    fn test_user_message_with_context() {
        let err = ServiceError::Status { status: 502 };
        assert_eq!(
            err.user_message("weather data fetch"),
            "Error in weather data fetch: HTTP error 502"
        );
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_invalid_input_is_bare() {
        let err = ServiceError::InvalidInput("Star rating must be between 1 and 5".to_string());
        assert_eq!(err.user_message("booking search"), "Star rating must be between 1 and 5");
    }
}
