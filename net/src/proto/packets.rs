use std::net::Ipv4Addr;

use serde::Serialize;

use super::{
    error::{debug_log_error, ProtoError, Result},
    io::{read_bytes_bounded, read_u16_be, write_string_bounded},
    state::{HandshakeNextState, ProtocolState},
    types::{PacketDecode, PacketEncode, PacketFrame},
    varint::read_varint,
};

/// Longest dotted IPv4 text ("255.255.255.255").
const IPV4_TEXT_MAX: usize = 15;

/// Status request (C2S), empty body.
pub const STATUS_REQUEST_ID: u32 = 0x00;
/// Status ping (C2S), 8-byte opaque payload.
pub const STATUS_PING_ID: u32 = 0x01;

/// Handshake (C2S) packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakePacket {
    pub protocol_version: u32,
    /// IPv4 address the client dialed, host byte order. Zero when the client
    /// sent a hostname or anything else that is not dotted IPv4.
    pub server_address: u32,
    pub server_port: u16,
    pub next_state: HandshakeNextState,
}

/// Status response (S2C) packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    version_tail: String,
    pub protocol_version: u32,
    pub max_players: u32,
    pub online_players: u32,
    pub description: String,
    pub enforces_secure_chat: bool,
}

/// Serverbound packet decoded for a given protocol state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Handshake {
        frame: PacketFrame,
        handshake: HandshakePacket,
    },
    /// Any packet without a dedicated decoder; carries the full frame.
    Generic(PacketFrame),
}

impl Packet {
    /// Frames and decodes `raw` as a packet received in `state`.
    pub fn decode(state: ProtocolState, raw: &[u8]) -> Result<Self> {
        Self::from_frame(state, PacketFrame::decode(raw)?)
    }

    pub fn from_frame(state: ProtocolState, frame: PacketFrame) -> Result<Self> {
        match (state, frame.id) {
            (ProtocolState::Handshaking, HandshakePacket::ID) => {
                let handshake = decode_exact::<HandshakePacket>(frame.body())?;
                Ok(Packet::Handshake { frame, handshake })
            }
            _ => Ok(Packet::Generic(frame)),
        }
    }

    pub fn frame(&self) -> &PacketFrame {
        match self {
            Packet::Handshake { frame, .. } => frame,
            Packet::Generic(frame) => frame,
        }
    }

    pub fn id(&self) -> u32 {
        self.frame().id
    }

    pub fn length(&self) -> u32 {
        self.frame().length
    }
}

impl HandshakePacket {
    pub const ID: u32 = 0x00;

    pub fn server_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.server_address)
    }
}

impl<'a> PacketDecode<'a> for HandshakePacket {
    const ID: u32 = HandshakePacket::ID;

    fn decode_body(input: &mut &'a [u8]) -> Result<Self> {
        let protocol_version = read_varint(input)?;
        let address = read_bytes_bounded(input, 255)?;
        let server_address = parse_ipv4(address);
        let server_port = read_u16_be(input)?;
        let next_state = HandshakeNextState::try_from(read_varint(input)?)?;

        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }
}

/// Decodes a whole packet body; leftover bytes are an error.
fn decode_exact<'a, P: PacketDecode<'a>>(body: &'a [u8]) -> Result<P> {
    let mut input = body;
    let packet = match P::decode_body(&mut input) {
        Ok(value) => value,
        Err(err) => {
            debug_log_error("packet body decode failed", &err);
            return Err(err);
        }
    };

    if !input.is_empty() {
        let err = ProtoError::TrailingBytes(input.len());
        debug_log_error("packet body had trailing bytes", &err);
        return Err(err);
    }

    Ok(packet)
}

fn parse_ipv4(text: &[u8]) -> u32 {
    let text = &text[..text.len().min(IPV4_TEXT_MAX)];
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse::<Ipv4Addr>().ok())
        .map(u32::from)
        .unwrap_or(0)
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    version: StatusVersion<'a>,
    players: StatusPlayers,
    description: StatusDescription<'a>,
    #[serde(rename = "enforcesSecureChat")]
    enforces_secure_chat: bool,
}

#[derive(Serialize)]
struct StatusVersion<'a> {
    name: &'a str,
    protocol: u32,
}

#[derive(Serialize)]
struct StatusPlayers {
    max: u32,
    online: u32,
}

#[derive(Serialize)]
struct StatusDescription<'a> {
    text: &'a str,
}

impl StatusResponse {
    pub const ID: u32 = 0x00;

    /// Builds a response advertising `version_name`. The major version is
    /// always reported as `1`; only the text after the first character is
    /// kept.
    pub fn new(
        version_name: &str,
        protocol_version: u32,
        max_players: u32,
        online_players: u32,
        description: impl Into<String>,
        enforces_secure_chat: bool,
    ) -> Self {
        let mut chars = version_name.chars();
        chars.next();
        Self {
            version_tail: chars.as_str().to_owned(),
            protocol_version,
            max_players,
            online_players,
            description: description.into(),
            enforces_secure_chat,
        }
    }

    pub fn version_name(&self) -> String {
        format!("1{}", self.version_tail)
    }

    pub fn to_json(&self) -> Result<String> {
        let name = self.version_name();
        let document = StatusDocument {
            version: StatusVersion {
                name: &name,
                protocol: self.protocol_version,
            },
            players: StatusPlayers {
                max: self.max_players,
                online: self.online_players,
            },
            description: StatusDescription {
                text: &self.description,
            },
            enforces_secure_chat: self.enforces_secure_chat,
        };
        serde_json::to_string(&document).map_err(|err| ProtoError::Json(err.to_string()))
    }
}

impl PacketEncode for StatusResponse {
    const ID: u32 = StatusResponse::ID;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<()> {
        write_string_bounded(out, &self.to_json()?, 32_767)
    }
}
