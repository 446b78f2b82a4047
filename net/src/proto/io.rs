use super::{
    error::{ProtoError, Result},
    varint::{read_varint, write_varint},
};

#[inline]
pub fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if input.len() < len {
        return Err(ProtoError::UnexpectedEof);
    }

    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

#[inline]
pub fn read_u16_be(input: &mut &[u8]) -> Result<u16> {
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(take(input, 2)?);
    Ok(u16::from_be_bytes(bytes))
}

#[inline]
pub fn write_u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn read_u32_be(input: &mut &[u8]) -> Result<u32> {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(take(input, 4)?);
    Ok(u32::from_be_bytes(bytes))
}

#[inline]
pub fn write_u32_be(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Reads a VarInt-prefixed byte string without interpreting it.
///
/// The prefix is bounded by `max_chars * 4`, the widest UTF-8 encoding of
/// `max_chars` characters.
pub fn read_bytes_bounded<'a>(input: &mut &'a [u8], max_chars: usize) -> Result<&'a [u8]> {
    let byte_len = read_varint(input)? as usize;
    let max_bytes = max_chars.saturating_mul(4);
    if byte_len > max_bytes {
        return Err(ProtoError::LengthTooLarge {
            max: max_bytes,
            actual: byte_len,
        });
    }

    take(input, byte_len)
}

pub fn write_string_bounded(out: &mut Vec<u8>, value: &str, max_chars: usize) -> Result<()> {
    let char_count = value.encode_utf16().count();
    if char_count > max_chars {
        return Err(ProtoError::StringTooLong {
            max: max_chars,
            actual: char_count,
        });
    }

    let len = value.len();
    if len > i32::MAX as usize {
        return Err(ProtoError::LengthTooLarge {
            max: i32::MAX as usize,
            actual: len,
        });
    }

    write_varint(out, len as u32);
    out.extend_from_slice(value.as_bytes());
    Ok(())
}
