use net::{ProtoError, ProtocolState};

use crate::registry::RegistryError;

/// Reasons a single connection ends early. None of these reach the accept
/// loop.
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("Read timeout")]
    Timeout(#[from] tokio::time::error::Elapsed),
    #[error("Networking error - {0}")]
    Io(#[from] std::io::Error),
    #[error("Client disconnected")]
    Disconnected,
    #[error("Malformed packet - {0}")]
    Protocol(#[from] ProtoError),
    #[error("Protocol version mismatch (client {client}, server {server})")]
    VersionMismatch { client: u32, server: u32 },
    #[error("Unhandled packet {id:#04x} in state {}", state.as_str())]
    UnhandledPacket { state: ProtocolState, id: u32 },
    #[error("Unhandled state {}", .0.as_str())]
    UnhandledState(ProtocolState),
    #[error("Registry error - {0}")]
    Registry(#[from] RegistryError),
    #[error("Server shutting down")]
    ShuttingDown,
}

impl ConnectionError {
    /// Short label used for metric attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Io(_) => "io",
            Self::Disconnected => "disconnected",
            Self::Protocol(_) => "malformed",
            Self::VersionMismatch { .. } => "version_mismatch",
            Self::UnhandledPacket { .. } => "unhandled_packet",
            Self::UnhandledState(_) => "unhandled_state",
            Self::Registry(_) => "registry",
            Self::ShuttingDown => "shutdown",
        }
    }
}
