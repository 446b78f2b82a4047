//! Minimal Minecraft protocol types for handshake and status.
pub mod proto;

pub use proto::{
    HandshakeNextState, HandshakePacket, Packet, PacketDecode, PacketDecoder,
    PacketEncode, PacketEncoder, PacketFrame, ProtoError, ProtocolState, StatusResponse,
    MAX_PACKET_SIZE, STATUS_PING_ID, STATUS_REQUEST_ID,
};
