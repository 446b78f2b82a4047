use super::error::{ProtoError, Result};

/// Longest encoding of a 32-bit VarInt.
pub const MAX_VARINT_LEN: usize = 5;

#[inline]
pub fn read_varint(input: &mut &[u8]) -> Result<u32> {
    let Some((value, len)) = read_varint_partial(input)? else {
        return Err(ProtoError::UnexpectedEof);
    };
    *input = &input[len..];
    Ok(value)
}

/// Decodes a VarInt without consuming it. `None` means the input ends before
/// the final group.
#[inline]
pub fn read_varint_partial(input: &[u8]) -> Result<Option<(u32, usize)>> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        if i >= input.len() {
            return Ok(None);
        }

        let byte = input[i];
        // only the low 4 bits of the fifth group fit in a u32
        if i == MAX_VARINT_LEN - 1 && (byte & 0x70) != 0 {
            return Err(ProtoError::VarIntTooLarge);
        }
        value |= ((byte & 0x7f) as u32) << (i * 7);
        if (byte & 0x80) == 0 {
            return Ok(Some((value, i + 1)));
        }
    }

    Err(ProtoError::VarIntTooLarge)
}

#[inline]
pub fn write_varint(out: &mut Vec<u8>, value: u32) {
    let mut val = value;
    loop {
        if (val & 0xffffff80) == 0 {
            out.push(val as u8);
            return;
        }
        out.push((val as u8 & 0x7f) | 0x80);
        val >>= 7;
    }
}

#[inline]
pub const fn varint_len(value: u32) -> usize {
    if value < 0x80 {
        1
    } else if value < 0x4000 {
        2
    } else if value < 0x20_0000 {
        3
    } else if value < 0x1000_0000 {
        4
    } else {
        5
    }
}
