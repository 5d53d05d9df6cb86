use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wayfare_core::guardrail::GuardrailConfig;
use wayfare_core::router::RouterConfig;
use wayfare_core::types::AgentKind;
use wayfare_core::{ApiClient, Assistant, Specialist, ToolServerClient, registry_from_server};
use wayfare_gateway::GatewayServer;
use wayfare_services::{
    BookingService, Geocoder, PlacesService, PlannerService, ToolServer, WeatherService,
    booking_registry, places_registry, planner_registry, weather_registry,
};

mod config;

use config::{
    DEFAULT_BOOKING_PORT, DEFAULT_PLACES_PORT, DEFAULT_PLANNER_PORT, DEFAULT_WEATHER_PORT,
    WayfareConfig,
};

#[derive(Parser)]
#[command(name = "wayfare")]
#[command(version)]
#[command(about = "wayfare, a multi-agent AI travel assistant")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the weather tool server
    Weather {
        #[arg(long, default_value_t = DEFAULT_WEATHER_PORT)]
        port: u16,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run the booking tool server (requires BOOKING_API_KEY)
    Booking {
        #[arg(long, default_value_t = DEFAULT_BOOKING_PORT)]
        port: u16,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run the places tool server (requires GOOGLE_PLACES_API_KEY)
    Places {
        #[arg(long, default_value_t = DEFAULT_PLACES_PORT)]
        port: u16,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run the trip planner tool server
    Planner {
        #[arg(long, default_value_t = DEFAULT_PLANNER_PORT)]
        port: u16,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run all four tool servers in one process
    AllServers {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run the chat gateway (the main application)
    Gateway {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Send a one-shot message through the assistant pipeline
    Ask {
        /// The message to send
        message: String,
    },

    /// Show the resolved configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = WayfareConfig::load(&cli.config)?;

    match cli.command {
        Commands::Weather { port, host } => cmd_weather(&host, port).await,
        Commands::Booking { port, host } => cmd_booking(&config, &host, port).await,
        Commands::Places { port, host } => cmd_places(&config, &host, port).await,
        Commands::Planner { port, host } => cmd_planner(&config, &host, port).await,
        Commands::AllServers { host } => cmd_all_servers(&config, &host).await,
        Commands::Gateway { port } => cmd_gateway(&config, port).await,
        Commands::Ask { message } => cmd_ask(&config, &message).await,
        Commands::Config => cmd_config(&config),
    }
}

fn weather_server() -> ToolServer {
    let geocoder = Arc::new(Geocoder::new());
    let service = Arc::new(WeatherService::new(geocoder));
    ToolServer::new("weather", Arc::new(weather_registry(service)))
}

fn booking_server(config: &WayfareConfig) -> ToolServer {
    let geocoder = Arc::new(Geocoder::new());
    let service = Arc::new(BookingService::new(config.booking_api_key(), geocoder));
    if !service.has_api_key() {
        warn!("BOOKING_API_KEY is not set; booking tools will report a configuration error");
    }
    ToolServer::new("booking", Arc::new(booking_registry(service)))
}

fn places_server(config: &WayfareConfig) -> ToolServer {
    let geocoder = Arc::new(Geocoder::new());
    let service = Arc::new(PlacesService::new(config.places_api_key(), geocoder));
    if !service.has_api_key() {
        warn!("GOOGLE_PLACES_API_KEY is not set; places tools will report a configuration error");
    }
    ToolServer::new("places", Arc::new(places_registry(service)))
}

fn planner_server(config: &WayfareConfig) -> ToolServer {
    let geocoder = Arc::new(Geocoder::new());
    let weather = Arc::new(WeatherService::new(geocoder.clone()));
    let places = Arc::new(PlacesService::new(config.places_api_key(), geocoder.clone()));
    let booking = Arc::new(BookingService::new(config.booking_api_key(), geocoder.clone()));
    let planner = Arc::new(PlannerService::new(weather, places, booking, geocoder));
    ToolServer::new("planner", Arc::new(planner_registry(planner)))
}

async fn cmd_weather(host: &str, port: u16) -> Result<()> {
    weather_server().run(host, port).await
}

async fn cmd_booking(config: &WayfareConfig, host: &str, port: u16) -> Result<()> {
    booking_server(config).run(host, port).await
}

async fn cmd_places(config: &WayfareConfig, host: &str, port: u16) -> Result<()> {
    places_server(config).run(host, port).await
}

async fn cmd_planner(config: &WayfareConfig, host: &str, port: u16) -> Result<()> {
    planner_server(config).run(host, port).await
}

async fn cmd_all_servers(config: &WayfareConfig, host: &str) -> Result<()> {
    let servers = [
        (booking_server(config), DEFAULT_BOOKING_PORT),
        (places_server(config), DEFAULT_PLACES_PORT),
        (planner_server(config), DEFAULT_PLANNER_PORT),
        (weather_server(), DEFAULT_WEATHER_PORT),
    ];

    let mut handles = Vec::new();
    for (server, port) in servers {
        let name = server.name().to_string();
        handles.push(server.spawn(host.to_string(), port));
        println!("- {} server: http://{}:{}", name, host, port);
        // Stagger startup so bind failures surface one at a time
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }

    println!("All servers started. Press Ctrl+C to stop.");
    signal::ctrl_c().await?;
    println!("\nShutting down all servers...");

    for handle in handles {
        handle.abort();
    }
    Ok(())
}

/// Wire up the assistant: LLM client plus one specialist per tool server
async fn build_assistant(config: &WayfareConfig) -> Assistant {
    let api = ApiClient::new(config.agent.api_key.clone(), Some(config.agent.model.clone()))
        .with_max_tokens(config.agent.max_tokens);

    if config.agent.api_key.is_empty() {
        warn!("ANTHROPIC_API_KEY is not set; agent requests will fail");
    }

    let mut assistant = Assistant::new(api)
        .with_router_config(RouterConfig {
            use_llm_classification: config.agent.llm_classification,
            enabled: true,
        })
        .with_guardrail_config(GuardrailConfig {
            enabled: true,
            use_llm_classification: config.agent.llm_classification,
        });

    let servers = [
        (AgentKind::Weather, config.servers.weather_url.as_str()),
        (AgentKind::Booking, config.servers.booking_url.as_str()),
        (AgentKind::Places, config.servers.places_url.as_str()),
        (AgentKind::Planner, config.servers.planner_url.as_str()),
    ];

    for (kind, url) in servers {
        let client = Arc::new(ToolServerClient::new(kind.to_string(), url));
        let registry = registry_from_server(client).await;
        assistant = assistant.with_specialist(Specialist::new(kind, Arc::new(registry)));
    }

    info!("Assistant ready with {} specialists", assistant.specialist_count());
    assistant
}

async fn cmd_gateway(config: &WayfareConfig, port_override: Option<u16>) -> Result<()> {
    let assistant = Arc::new(build_assistant(config).await);
    let port = port_override.unwrap_or(config.gateway.port);
    let bind = format!("{}:{}", config.gateway.host, port).parse()?;

    let server = GatewayServer::new(bind, assistant, config.gateway.auth_token.clone());
    server.run().await
}

async fn cmd_ask(config: &WayfareConfig, message: &str) -> Result<()> {
    let assistant = build_assistant(config).await;
    let request = wayfare_core::types::TravelRequest::new("cli", message);
    let reply = assistant.process(&request, &[]).await;

    if let Some(agent) = reply.agent {
        println!("[{}] {}", agent, reply.content);
    } else {
        println!("{}", reply.content);
    }
    Ok(())
}

fn cmd_config(config: &WayfareConfig) -> Result<()> {
    println!("{:#?}", config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_ports() {
        let cli = Cli::parse_from(["wayfare", "weather"]);
        match cli.command {
            Commands::Weather { port, host } => {
                assert_eq!(port, 5004);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("expected weather command"),
        }

        let cli = Cli::parse_from(["wayfare", "booking"]);
        match cli.command {
            Commands::Booking { port, .. } => assert_eq!(port, 5001),
            _ => panic!("expected booking command"),
        }
    }

    #[test]
    fn test_servers_build() {
        let config = WayfareConfig::default();
        assert_eq!(weather_server().name(), "weather");
        assert_eq!(booking_server(&config).name(), "booking");
        assert_eq!(places_server(&config).name(), "places");
        assert_eq!(planner_server(&config).name(), "planner");
    }

    #[tokio::test]
    async fn test_build_assistant_without_servers() {
        // No tool servers running: specialists still register, with empty
        // registries, and the assistant stays usable
        let config = WayfareConfig {
            servers: config::ServersConfig {
                weather_url: "http://127.0.0.1:9".to_string(),
                booking_url: "http://127.0.0.1:9".to_string(),
                places_url: "http://127.0.0.1:9".to_string(),
                planner_url: "http://127.0.0.1:9".to_string(),
            },
            ..Default::default()
        };
        let assistant = build_assistant(&config).await;
        assert_eq!(assistant.specialist_count(), 4);
    }
}
