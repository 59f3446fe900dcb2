//! # mqgate-server
//!
//! Wires the gateway together:
//!
//! - one listener per transport kind: plain TCP for native byte-stream
//!   clients, an Axum WebSocket endpoint for framed clients
//! - per-WebSocket-connection frame-stream bridging into the protocol
//!   engine
//! - the observer endpoint and the engine-event → fan-out pump
//! - configuration (defaults → JSON file deep-merge → `MQGATE_*` env
//!   overrides), health endpoint, tracing init, and ordered graceful
//!   shutdown (listeners first, then the engine)

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod loader;
pub mod logging;
pub mod server;
pub mod shutdown;
pub mod tcp;
pub mod ws;

pub use config::{GatewayConfig, ListenerConfig};
pub use loader::{LoaderError, load_config, load_config_from_path};
pub use logging::init_tracing;
pub use server::{AppState, GatewayServer, RunningGateway, ServerError};
pub use shutdown::ShutdownCoordinator;
