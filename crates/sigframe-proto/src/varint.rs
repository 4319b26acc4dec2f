//! Base-128 varints and frame size arithmetic.
//!
//! Values are split into 7-bit groups, least significant group first. Every
//! byte except the last carries the continuation bit (0x80). Encoding always
//! emits the minimal number of groups.
//!
//! # Invariants
//!
//! - `decode_varint(encode_varint(v)) == (v, varint_len(v))` for every `u64`.
//! - A varint never spans more than [`MAX_VARINT_LEN`] bytes.

use bytes::BufMut;

use crate::errors::{ProtocolError, Result};

/// Longest legal varint: ceil(64 / 7) bytes.
pub const MAX_VARINT_LEN: usize = 10;

/// Number of bytes `value` occupies when varint encoded.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Append the varint encoding of `value` to `dst`.
pub fn encode_varint(mut value: u64, dst: &mut impl BufMut) {
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Decode a varint starting at `pos`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// - `ProtocolError::MalformedVarint` if the continuation bit is still set at
///   the end of the buffer, after [`MAX_VARINT_LEN`] bytes, or if the tenth
///   byte carries bits beyond 64.
pub fn decode_varint(bytes: &[u8], pos: usize) -> Result<(u64, usize)> {
    let tail = bytes.get(pos..).unwrap_or_default();

    let mut value = 0u64;
    for (i, &byte) in tail.iter().take(MAX_VARINT_LEN).enumerate() {
        let shift = 7 * i as u32;
        let group = u64::from(byte & 0x7f);

        // Only one payload bit is left in the tenth byte
        if shift == 63 && group > 1 {
            return Err(ProtocolError::MalformedVarint { offset: pos });
        }

        value |= group << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(ProtocolError::MalformedVarint { offset: pos })
}

/// Total encoded size of a frame whose body is `body_len` bytes.
///
/// One byte of outer field header, the varint of the body length, and the
/// body itself.
pub fn frame_size(body_len: usize) -> usize {
    1 + varint_len(body_len as u64) + body_len
}

/// Recover the body length from a total frame size.
///
/// The total includes the width of the body length's own varint, so the
/// answer is a fixed point of `total - 1 - varint_len(body)`. Iterates until
/// the guess stabilises. Returns `None` for totals no body length can produce
/// (for example 130: a 127-byte body totals 129, a 128-byte body totals 131).
pub fn body_len_for_frame_size(total: usize) -> Option<usize> {
    let mut guess = total.checked_sub(1 + varint_len(total as u64))?;

    for _ in 0..MAX_VARINT_LEN {
        let next = total.checked_sub(1 + varint_len(guess as u64))?;
        if next == guess {
            return (frame_size(guess) == total).then_some(guess);
        }
        guess = next;
    }

    None
}
