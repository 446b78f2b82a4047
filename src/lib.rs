//! Minecraft Java server answering handshakes and server-list pings.
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod telemetry;
pub mod utils;
