use super::{
    error::{debug_log_error, ProtoError, Result},
    varint::{read_varint, read_varint_partial, varint_len, write_varint},
};

/// Maximum packet length in bytes (protocol limit).
pub const MAX_PACKET_SIZE: usize = 2_097_152;

/// Clientbound packet body encoding.
///
/// Only packets the server actually sends implement this; a packet type
/// without an encoding simply has no impl.
pub trait PacketEncode {
    const ID: u32;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<()>;
}

/// Serverbound packet body decoding.
pub trait PacketDecode<'a>: Sized {
    const ID: u32;

    fn decode_body(input: &mut &'a [u8]) -> Result<Self>;
}

/// One complete length-prefixed frame as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFrame {
    pub id: u32,
    /// Declared length (packet id + body), excluding the prefix itself.
    pub length: u32,
    raw: Vec<u8>,
    body_start: usize,
}

impl PacketFrame {
    /// Decodes exactly one frame. `raw` must hold the length prefix and
    /// nothing past the declared length.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let mut input = raw;
        let length = read_varint(&mut input)?;
        let prefix_len = raw.len() - input.len();

        let declared = length as usize;
        if declared > MAX_PACKET_SIZE {
            return Err(ProtoError::PacketTooLarge { len: declared });
        }
        if input.len() < declared {
            return Err(ProtoError::UnexpectedEof);
        }
        if input.len() > declared {
            return Err(ProtoError::TrailingBytes(input.len() - declared));
        }

        Self::from_parts(raw.to_vec(), length, prefix_len)
    }

    fn from_parts(raw: Vec<u8>, length: u32, prefix_len: usize) -> Result<Self> {
        let mut packet = &raw[prefix_len..];
        let id = read_varint(&mut packet)?;
        let body_start = raw.len() - packet.len();
        Ok(Self {
            id,
            length,
            raw,
            body_start,
        })
    }

    /// The whole frame, length prefix included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Bytes following the packet id.
    pub fn body(&self) -> &[u8] {
        &self.raw[self.body_start..]
    }
}

/// Packet decoder for length-prefixed frames.
///
/// Bytes are queued as they arrive; a frame is handed out only once all of it
/// is buffered.
pub struct PacketDecoder {
    buf: Vec<u8>,
    pos: usize,
}

/// Packet encoder for length-prefixed frames.
pub struct PacketEncoder {
    buf: Vec<u8>,
    scratch: Vec<u8>,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
        }
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of queued bytes not yet handed out as frames.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn try_next_packet(&mut self) -> Result<Option<PacketFrame>> {
        let data = &self.buf[self.pos..];
        let (packet_len, len_len) = match read_varint_partial(data) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(err) => {
                debug_log_error("packet length varint decode failed", &err);
                return Err(err);
            }
        };

        let declared = packet_len as usize;
        if declared > MAX_PACKET_SIZE {
            let err = ProtoError::PacketTooLarge { len: declared };
            debug_log_error("packet too large", &err);
            return Err(err);
        }

        let total_len = len_len + declared;
        if data.len() < total_len {
            return Ok(None);
        }

        let raw = data[..total_len].to_vec();
        let frame = match PacketFrame::from_parts(raw, packet_len, len_len) {
            Ok(frame) => frame,
            Err(err) => {
                debug_log_error("packet id varint decode failed", &err);
                return Err(err);
            }
        };

        self.pos += total_len;
        self.compact_if_needed();

        Ok(Some(frame))
    }

    fn compact_if_needed(&mut self) {
        if self.pos == 0 {
            return;
        }

        if self.pos >= self.buf.len() / 2 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketEncoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn write_packet<P: PacketEncode>(&mut self, pkt: &P) -> Result<()> {
        self.scratch.clear();
        pkt.encode_body(&mut self.scratch)?;
        encode_raw_packet(&mut self.buf, P::ID, &self.scratch)
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

pub fn encode_raw_packet(out: &mut Vec<u8>, id: u32, body: &[u8]) -> Result<()> {
    let packet_len = varint_len(id) + body.len();
    if packet_len > MAX_PACKET_SIZE {
        return Err(ProtoError::PacketTooLarge { len: packet_len });
    }

    write_varint(out, packet_len as u32);
    write_varint(out, id);
    out.extend_from_slice(body);
    Ok(())
}
