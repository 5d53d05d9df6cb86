//! wayfare-gateway — HTTP chat gateway for the wayfare travel assistant
//!
//! The main application: clients POST chat messages, the assistant pipeline
//! routes them to specialist agents, and per-session history provides
//! conversation memory.

pub mod auth;
pub mod protocol;
pub mod server;
pub mod session;

pub use server::GatewayServer;
pub use session::SessionManager;
