/// Protocol decode/encode error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    #[error("unexpected end of packet")]
    UnexpectedEof,
    #[error("varint is longer than 5 bytes")]
    VarIntTooLarge,
    #[error("packet of {len} bytes exceeds protocol limit")]
    PacketTooLarge { len: usize },
    #[error("string of {actual} chars exceeds limit of {max}")]
    StringTooLong { max: usize, actual: usize },
    #[error("length {actual} exceeds limit of {max}")]
    LengthTooLarge { max: usize, actual: usize },
    #[error("{0} trailing bytes after packet")]
    TrailingBytes(usize),
    #[error("invalid handshake next state {0}")]
    InvalidHandshakeState(u32),
    #[error("json serialization failed: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, ProtoError>;

pub(crate) fn debug_log_error(context: &str, error: &ProtoError) {
    #[cfg(debug_assertions)]
    {
        log::error!("{}: {:?}", context, error);
    }
    let _ = context;
    let _ = error;
}
