//! Minecraft protocol framing for the handshake and status phases.

mod error;
mod io;
mod packets;
mod state;
mod types;
mod varint;


pub use error::{ProtoError, Result};
pub use io::{read_u16_be, read_u32_be, take, write_u16_be, write_u32_be};
pub use packets::{HandshakePacket, Packet, StatusResponse, STATUS_PING_ID, STATUS_REQUEST_ID};
pub use state::{HandshakeNextState, ProtocolState};
pub use types::{
    encode_raw_packet, PacketDecode, PacketDecoder, PacketEncode, PacketEncoder,
    PacketFrame, MAX_PACKET_SIZE,
};
pub use varint::{read_varint, read_varint_partial, varint_len, write_varint, MAX_VARINT_LEN};
