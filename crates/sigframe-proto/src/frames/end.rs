use bytes::BufMut;

use crate::{
    FrameKind, WireType,
    errors::{ProtocolError, Result},
    field::field_header,
    varint::{decode_varint, encode_varint, varint_len},
};

/// Terminal frame. Unlike every other variant it is a bare varint, not a
/// length-delimited message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndFrame {
    value: u64,
}

impl EndFrame {
    /// The only value a well-formed end marker carries.
    pub const MARKER: u64 = 1;

    /// Well-formed end marker.
    pub fn new() -> Self {
        Self { value: Self::MARKER }
    }

    /// Raw marker value as decoded.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// The marker must equal [`Self::MARKER`].
    pub fn validate(&self) -> Result<()> {
        if self.value == Self::MARKER {
            Ok(())
        } else {
            Err(ProtocolError::ValidationFailed {
                kind: FrameKind::End,
                reason: "end marker is not 1",
            })
        }
    }

    pub(crate) fn encoded_len(self) -> usize {
        1 + varint_len(self.value)
    }

    pub(crate) fn encode(self, dst: &mut impl BufMut) {
        dst.put_u8(field_header(FrameKind::End.to_u8(), WireType::Varint));
        encode_varint(self.value, dst);
    }

    /// Decode the marker varint following the header byte.
    pub(crate) fn decode(bytes: &[u8], wire_type: WireType) -> Result<Self> {
        if wire_type != WireType::Varint {
            return Err(ProtocolError::UnexpectedWireType { kind: FrameKind::End, wire_type });
        }

        let (value, used) = decode_varint(bytes, 1)?;
        let trailing = bytes.len() - 1 - used;
        if trailing != 0 {
            return Err(ProtocolError::TrailingBytes { trailing });
        }

        Ok(Self { value })
    }
}

impl Default for EndFrame {
    fn default() -> Self {
        Self::new()
    }
}
