//! Configuration — TOML file plus environment overrides
//!
//! The environment always wins over the file, so containerized deployments
//! can configure everything through `WEATHER_SERVER_URL`, `BOOKING_API_KEY`,
//! and friends without shipping a config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WayfareConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub servers: ServersConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub places: PlacesConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Anthropic API key; usually provided via ANTHROPIC_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Classify ambiguous routing/guardrail cases with the LLM
    #[serde(default)]
    pub llm_classification: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            llm_classification: false,
        }
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("llm_classification", &self.llm_classification)
            .finish()
    }
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// Tool server base URLs, one per specialist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersConfig {
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    #[serde(default = "default_booking_url")]
    pub booking_url: String,
    #[serde(default = "default_places_url")]
    pub places_url: String,
    #[serde(default = "default_planner_url")]
    pub planner_url: String,
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            weather_url: default_weather_url(),
            booking_url: default_booking_url(),
            places_url: default_places_url(),
            planner_url: default_planner_url(),
        }
    }
}

pub const DEFAULT_BOOKING_PORT: u16 = 5001;
pub const DEFAULT_PLACES_PORT: u16 = 5002;
pub const DEFAULT_PLANNER_PORT: u16 = 5003;
pub const DEFAULT_WEATHER_PORT: u16 = 5004;
pub const DEFAULT_GATEWAY_PORT: u16 = 7860;

fn default_weather_url() -> String {
    format!("http://localhost:{}", DEFAULT_WEATHER_PORT)
}
fn default_booking_url() -> String {
    format!("http://localhost:{}", DEFAULT_BOOKING_PORT)
}
fn default_places_url() -> String {
    format!("http://localhost:{}", DEFAULT_PLACES_PORT)
}
fn default_planner_url() -> String {
    format!("http://localhost:{}", DEFAULT_PLANNER_PORT)
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Booking.com API key; usually provided via BOOKING_API_KEY
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for BookingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// Google Places API key; usually provided via GOOGLE_PLACES_API_KEY
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for PlacesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Bearer token required for API access; empty disables auth
    #[serde(default)]
    pub auth_token: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_host(),
            auth_token: String::new(),
        }
    }
}

fn default_gateway_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Default config file location
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wayfare")
        .join("config.toml")
}

impl WayfareConfig {
    /// Load configuration: defaults ← config file ← environment
    pub fn load(path_override: &Option<PathBuf>) -> Result<Self> {
        let path = path_override.clone().unwrap_or_else(config_path);

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply the deployment environment variables on top of the file config
    pub fn apply_env_overrides(&mut self) {
        let override_string = |target: &mut String, var: &str| {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                *target = value;
            }
        };

        override_string(&mut self.agent.api_key, "ANTHROPIC_API_KEY");
        override_string(&mut self.booking.api_key, "BOOKING_API_KEY");
        override_string(&mut self.places.api_key, "GOOGLE_PLACES_API_KEY");
        override_string(&mut self.servers.weather_url, "WEATHER_SERVER_URL");
        override_string(&mut self.servers.booking_url, "BOOKING_SERVER_URL");
        override_string(&mut self.servers.places_url, "PLACES_SERVER_URL");
        override_string(&mut self.servers.planner_url, "PLANNER_SERVER_URL");
    }

    /// API key as an Option (empty string means unset)
    pub fn booking_api_key(&self) -> Option<String> {
        some_if_nonempty(&self.booking.api_key)
    }

    pub fn places_api_key(&self) -> Option<String> {
        some_if_nonempty(&self.places.api_key)
    }
}

fn some_if_nonempty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "<unset>".to_string()
    } else if secret.len() > 7 {
        format!("{}...{}", &secret[..3], &secret[secret.len() - 4..])
    } else {
        "***".to_string()
    }
}
