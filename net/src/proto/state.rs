use super::error::{ProtoError, Result};

/// Connection phase; selects how packet IDs are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    Handshaking,
    Status,
    Login,
    Play,
}

impl ProtocolState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handshaking => "handshaking",
            Self::Status => "status",
            Self::Login => "login",
            Self::Play => "play",
        }
    }
}

/// Next state value in the handshake packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeNextState {
    Status,
    Login,
    /// Server transfer (protocol 766+), continues as a login.
    Transfer,
}

impl HandshakeNextState {
    pub const fn target_state(self) -> ProtocolState {
        match self {
            Self::Status => ProtocolState::Status,
            Self::Login | Self::Transfer => ProtocolState::Login,
        }
    }
}

impl TryFrom<u32> for HandshakeNextState {
    type Error = ProtoError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::Status),
            2 => Ok(Self::Login),
            3 => Ok(Self::Transfer),
            other => Err(ProtoError::InvalidHandshakeState(other)),
        }
    }
}
