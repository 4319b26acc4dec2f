//! Single protobuf-style field: header byte, wire type and payload.
//!
//! The backup format uses a closed subset of protobuf. Field numbers stay in
//! 1..=15 so every header fits in one byte, and only four wire types occur.
//!
//! Payload storage by wire type:
//! - `Varint`: the varint bytes exactly as they appeared on the wire
//! - `Fixed64` / `Fixed32`: the raw little-endian bytes from the wire
//! - `LengthDelimited`: the raw bytes, without the length prefix

use bytes::{BufMut, Bytes};

use crate::{
    errors::{ProtocolError, Result},
    varint::{decode_varint, encode_varint, varint_len},
};

/// Highest field number a one-byte header can carry.
pub const MAX_FIELD_NUMBER: u8 = 15;

/// How a field's payload is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint
    Varint = 0,
    /// Eight little-endian bytes
    Fixed64 = 1,
    /// Varint length followed by that many bytes
    LengthDelimited = 2,
    /// Four little-endian bytes
    Fixed32 = 5,
}

impl WireType {
    /// Parse the low three bits of a header byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    /// Raw wire type bits.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Build a one-byte field header.
pub fn field_header(number: u8, wire_type: WireType) -> u8 {
    debug_assert!((1..=MAX_FIELD_NUMBER).contains(&number), "field number out of range");
    (number << 3) | wire_type.to_u8()
}

/// Split a header byte found at `offset` into field number and wire type.
///
/// # Errors
///
/// - `ProtocolError::InvalidFieldHeader` if the high bit is set (multi-byte
///   header) or the field number is 0
/// - `ProtocolError::UnsupportedWireType` for group or unassigned wire types
pub fn parse_field_header(byte: u8, offset: usize) -> Result<(u8, WireType)> {
    if byte & 0x80 != 0 {
        return Err(ProtocolError::InvalidFieldHeader { byte, offset });
    }

    let number = (byte & 0x78) >> 3;
    if number == 0 {
        return Err(ProtocolError::InvalidFieldHeader { byte, offset });
    }

    let wire_type = WireType::from_u8(byte & 0x07)
        .ok_or(ProtocolError::UnsupportedWireType { wire_type: byte & 0x07, offset })?;

    Ok((number, wire_type))
}

/// One decoded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    number: u8,
    wire_type: WireType,
    data: Bytes,
}

impl RawField {
    /// Varint field holding `value`.
    pub fn varint(number: u8, value: u64) -> Self {
        let mut wire = Vec::with_capacity(varint_len(value));
        encode_varint(value, &mut wire);
        Self {
            number,
            wire_type: WireType::Varint,
            data: Bytes::from(wire),
        }
    }

    /// Length-delimited field holding raw bytes.
    pub fn bytes(number: u8, data: impl Into<Bytes>) -> Self {
        Self { number, wire_type: WireType::LengthDelimited, data: data.into() }
    }

    /// Length-delimited field holding a UTF-8 string.
    pub fn string(number: u8, value: &str) -> Self {
        Self::bytes(number, Bytes::copy_from_slice(value.as_bytes()))
    }

    /// Fixed32 field holding an IEEE-754 single.
    pub fn float(number: u8, value: f32) -> Self {
        Self {
            number,
            wire_type: WireType::Fixed32,
            data: Bytes::copy_from_slice(&value.to_le_bytes()),
        }
    }

    /// Fixed64 field holding an IEEE-754 double.
    pub fn double(number: u8, value: f64) -> Self {
        Self {
            number,
            wire_type: WireType::Fixed64,
            data: Bytes::copy_from_slice(&value.to_le_bytes()),
        }
    }

    /// Field number (1..=15).
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Wire type the field was encoded with.
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Stored payload bytes (see module docs for the per-wire-type layout).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read as an unsigned 64-bit integer (varint or fixed64).
    pub fn as_u64(&self) -> Result<u64> {
        match self.wire_type {
            WireType::Varint => Ok(decode_varint(&self.data, 0)?.0),
            WireType::Fixed64 => Ok(u64::from_le_bytes(self.fixed::<8>()?)),
            other => Err(ProtocolError::WireTypeMismatch {
                field: self.number,
                expected: WireType::Varint,
                actual: other,
            }),
        }
    }

    /// Read as an unsigned 32-bit integer (varint or fixed32).
    ///
    /// A varint whose value needs more than four bytes is a size mismatch, not
    /// a silent truncation.
    pub fn as_u32(&self) -> Result<u32> {
        if self.wire_type == WireType::Fixed32 {
            return Ok(u32::from_le_bytes(self.fixed::<4>()?));
        }

        let value = self.as_u64()?;
        u32::try_from(value).map_err(|_| ProtocolError::FieldSizeMismatch {
            field: self.number,
            expected: 4,
            actual: (64 - value.leading_zeros() as usize).div_ceil(8),
        })
    }

    /// Read a varint as a boolean (any non-zero value is true).
    pub fn as_bool(&self) -> Result<bool> {
        self.expect_wire(WireType::Varint)?;
        Ok(self.as_u64()? != 0)
    }

    /// Read a length-delimited field as raw bytes.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        self.expect_wire(WireType::LengthDelimited)?;
        Ok(&self.data)
    }

    /// Read a length-delimited field as UTF-8.
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(self.as_bytes()?)
            .map_err(|_| ProtocolError::InvalidUtf8 { field: self.number })
    }

    /// Read a fixed32 field as a single-precision float.
    pub fn as_f32(&self) -> Result<f32> {
        self.expect_wire(WireType::Fixed32)?;
        Ok(f32::from_le_bytes(self.fixed::<4>()?))
    }

    /// Read a fixed64 field as a double-precision float.
    pub fn as_f64(&self) -> Result<f64> {
        self.expect_wire(WireType::Fixed64)?;
        Ok(f64::from_le_bytes(self.fixed::<8>()?))
    }

    /// Size of this field on the wire, header byte included.
    pub fn encoded_len(&self) -> usize {
        1 + match self.wire_type {
            WireType::Varint | WireType::Fixed64 | WireType::Fixed32 => self.data.len(),
            WireType::LengthDelimited => varint_len(self.data.len() as u64) + self.data.len(),
        }
    }

    /// Append the wire encoding to `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(field_header(self.number, self.wire_type));
        match self.wire_type {
            WireType::Varint | WireType::Fixed64 | WireType::Fixed32 => dst.put_slice(&self.data),
            WireType::LengthDelimited => {
                encode_varint(self.data.len() as u64, dst);
                dst.put_slice(&self.data);
            },
        }
    }

    /// Decode one field starting at `pos`.
    ///
    /// Returns the field and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - Header errors from [`parse_field_header`]
    /// - `ProtocolError::MalformedVarint` for a bad value or length varint
    /// - `ProtocolError::FrameTruncated` if a payload runs past the buffer
    pub fn decode(bytes: &[u8], pos: usize) -> Result<(Self, usize)> {
        let Some(&head) = bytes.get(pos) else {
            return Err(ProtocolError::FrameTruncated { expected: pos + 1, actual: bytes.len() });
        };
        let (number, wire_type) = parse_field_header(head, pos)?;
        let body = pos + 1;

        let (data, consumed) = match wire_type {
            WireType::Varint => {
                let (_, used) = decode_varint(bytes, body)?;
                (Bytes::copy_from_slice(take(bytes, body, used)?), used)
            },
            WireType::Fixed64 => (Bytes::copy_from_slice(take(bytes, body, 8)?), 8),
            WireType::Fixed32 => (Bytes::copy_from_slice(take(bytes, body, 4)?), 4),
            WireType::LengthDelimited => {
                let (len, used) = decode_varint(bytes, body)?;
                let len = usize::try_from(len).map_err(|_| ProtocolError::FrameTruncated {
                    expected: usize::MAX,
                    actual: bytes.len().saturating_sub(body + used),
                })?;
                (Bytes::copy_from_slice(take(bytes, body + used, len)?), used + len)
            },
        };

        Ok((Self { number, wire_type, data }, 1 + consumed))
    }

    fn expect_wire(&self, expected: WireType) -> Result<()> {
        if self.wire_type == expected {
            Ok(())
        } else {
            Err(ProtocolError::WireTypeMismatch {
                field: self.number,
                expected,
                actual: self.wire_type,
            })
        }
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        <[u8; N]>::try_from(self.data.as_ref()).map_err(|_| ProtocolError::FieldSizeMismatch {
            field: self.number,
            expected: N,
            actual: self.data.len(),
        })
    }
}

/// Borrow `len` bytes at `pos`, or report how many were missing.
fn take(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    pos.checked_add(len).and_then(|end| bytes.get(pos..end)).ok_or(
        ProtocolError::FrameTruncated { expected: len, actual: bytes.len().saturating_sub(pos) },
    )
}
