//! Frame enum, variant dispatch and the plaintext frame encoding.
//!
//! Plaintext layout of one frame:
//! `[field header: frame type, length-delimited][varint body length][fields]`
//!
//! The end marker is the only exception: `[field header: 6, varint][varint 1]`.
//!
//! # Invariants
//!
//! - `Frame::decode(&frame.to_bytes()) == frame` for every frame built from
//!   this crate's constructors.
//! - Decoding consumes the whole buffer; trailing bytes are an error.

use std::fmt;

use bytes::BufMut;

use crate::{
    AttachmentPayload, AttachmentReader, AttachmentSlot, FieldList, WireType,
    attachment::AttachmentError,
    errors::{ProtocolError, Result},
    field::{field_header, parse_field_header},
    frames::{
        AttachmentFrame, AvatarFrame, DatabaseVersionFrame, EndFrame, HeaderFrame,
        KeyValueFrame, SharedPrefFrame, SqlStatementFrame, StickerFrame,
    },
    varint::{body_len_for_frame_size, decode_varint, encode_varint, frame_size},
};

static NO_FIELDS: FieldList = FieldList::new();

/// Frame type number (outer field number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FrameKind {
    /// Stream header (plaintext)
    Header = 1,
    /// SQL statement with parameters
    SqlStatement = 2,
    /// Shared-preferences entry
    SharedPreference = 3,
    /// Message attachment descriptor
    Attachment = 4,
    /// Database schema version
    DatabaseVersion = 5,
    /// End marker
    End = 6,
    /// Avatar descriptor
    Avatar = 7,
    /// Sticker descriptor
    Sticker = 8,
    /// Key-value store entry
    KeyValue = 9,
}

impl FrameKind {
    /// Every frame type, in wire-number order.
    pub const ALL: [Self; 9] = [
        Self::Header,
        Self::SqlStatement,
        Self::SharedPreference,
        Self::Attachment,
        Self::DatabaseVersion,
        Self::End,
        Self::Avatar,
        Self::Sticker,
        Self::KeyValue,
    ];

    /// Parse a frame type number.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.to_u8() == value)
    }

    /// Frame type number.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Lowercase name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::SqlStatement => "sql statement",
            Self::SharedPreference => "shared preference",
            Self::Attachment => "attachment",
            Self::DatabaseVersion => "database version",
            Self::End => "end",
            Self::Avatar => "avatar",
            Self::Sticker => "sticker",
            Self::KeyValue => "key-value",
        }
    }

    /// True for frames whose payload follows them in the stream.
    pub fn carries_attachment(self) -> bool {
        matches!(self, Self::Attachment | Self::Sticker | Self::Avatar)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded backup frame.
///
/// Closed set of variants; every method matches exhaustively so a new
/// variant cannot be left out of encoding or validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Stream header
    Header(HeaderFrame),
    /// Schema version
    DatabaseVersion(DatabaseVersionFrame),
    /// Shared-preferences entry
    SharedPreference(SharedPrefFrame),
    /// Key-value entry
    KeyValue(KeyValueFrame),
    /// SQL statement
    SqlStatement(SqlStatementFrame),
    /// Attachment descriptor
    Attachment(AttachmentFrame),
    /// Sticker descriptor
    Sticker(StickerFrame),
    /// Avatar descriptor
    Avatar(AvatarFrame),
    /// End marker
    End(EndFrame),
}

impl Frame {
    /// Variant tag.
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Header(_) => FrameKind::Header,
            Self::DatabaseVersion(_) => FrameKind::DatabaseVersion,
            Self::SharedPreference(_) => FrameKind::SharedPreference,
            Self::KeyValue(_) => FrameKind::KeyValue,
            Self::SqlStatement(_) => FrameKind::SqlStatement,
            Self::Attachment(_) => FrameKind::Attachment,
            Self::Sticker(_) => FrameKind::Sticker,
            Self::Avatar(_) => FrameKind::Avatar,
            Self::End(_) => FrameKind::End,
        }
    }

    /// Field list (empty for the end marker).
    pub fn fields(&self) -> &FieldList {
        match self {
            Self::Header(f) => f.fields(),
            Self::DatabaseVersion(f) => f.fields(),
            Self::SharedPreference(f) => f.fields(),
            Self::KeyValue(f) => f.fields(),
            Self::SqlStatement(f) => f.fields(),
            Self::Attachment(f) => f.fields(),
            Self::Sticker(f) => f.fields(),
            Self::Avatar(f) => f.fields(),
            Self::End(_) => &NO_FIELDS,
        }
    }

    /// Check the variant's structural rules.
    ///
    /// # Errors
    ///
    /// `ProtocolError::ValidationFailed` (or a typed-read error) describing
    /// the first rule that failed.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Header(f) => f.validate(),
            Self::DatabaseVersion(f) => f.validate(),
            Self::SharedPreference(f) => f.validate(),
            Self::KeyValue(f) => f.validate(),
            Self::SqlStatement(f) => f.validate(),
            Self::Attachment(f) => f.validate(),
            Self::Sticker(f) => f.validate(),
            Self::Avatar(f) => f.validate(),
            Self::End(f) => f.validate(),
        }
    }

    /// Shorthand for `validate().is_ok()`.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Total plaintext size, outer header and length varint included.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::End(end) => end.encoded_len(),
            other => frame_size(other.fields().encoded_len()),
        }
    }

    /// Serialize into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        if let Self::End(end) = self {
            end.encode(dst);
            return;
        }

        let body_len = self.fields().encoded_len();
        debug_assert_eq!(body_len_for_frame_size(frame_size(body_len)), Some(body_len));

        dst.put_u8(field_header(self.kind().to_u8(), WireType::LengthDelimited));
        encode_varint(body_len as u64, dst);
        self.fields().encode(dst);
    }

    /// Serialize into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        debug_assert_eq!(buf.len(), self.encoded_len());
        buf
    }

    /// Decode one plaintext frame.
    ///
    /// Does not validate; callers decide what to do with frames that fail
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTruncated` for an empty buffer or a body length
    ///   that overruns it
    /// - `ProtocolError::UnknownFrameType` for an unassigned frame number
    /// - `ProtocolError::UnexpectedWireType` for a wrongly typed outer field
    /// - `ProtocolError::TrailingBytes` if the buffer continues past the body
    /// - Field errors from [`FieldList::decode`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(&head) = bytes.first() else {
            return Err(ProtocolError::FrameTruncated { expected: 1, actual: 0 });
        };

        let (number, wire_type) = parse_field_header(head, 0)?;
        let kind =
            FrameKind::from_u8(number).ok_or(ProtocolError::UnknownFrameType { frame_type: number })?;

        if kind == FrameKind::End {
            return EndFrame::decode(bytes, wire_type).map(Self::End);
        }
        if wire_type != WireType::LengthDelimited {
            return Err(ProtocolError::UnexpectedWireType { kind, wire_type });
        }

        let (body_len, used) = decode_varint(bytes, 1)?;
        let start = 1 + used;
        let available = bytes.len() - start;
        let body_len = usize::try_from(body_len)
            .ok()
            .filter(|len| *len <= available)
            .ok_or(ProtocolError::FrameTruncated {
                expected: usize::try_from(body_len).unwrap_or(usize::MAX),
                actual: available,
            })?;

        if body_len < available {
            return Err(ProtocolError::TrailingBytes { trailing: available - body_len });
        }

        let fields = FieldList::decode(&bytes[start..])?;
        Ok(match kind {
            FrameKind::Header => Self::Header(HeaderFrame::from_fields(fields)),
            FrameKind::SqlStatement => Self::SqlStatement(SqlStatementFrame::from_fields(fields)),
            FrameKind::SharedPreference => {
                Self::SharedPreference(SharedPrefFrame::from_fields(fields))
            },
            FrameKind::Attachment => Self::Attachment(AttachmentFrame::from_fields(fields)),
            FrameKind::DatabaseVersion => {
                Self::DatabaseVersion(DatabaseVersionFrame::from_fields(fields))
            },
            FrameKind::Avatar => Self::Avatar(AvatarFrame::from_fields(fields)),
            FrameKind::Sticker => Self::Sticker(StickerFrame::from_fields(fields)),
            FrameKind::KeyValue => Self::KeyValue(KeyValueFrame::from_fields(fields)),
            FrameKind::End => unreachable!("end marker handled above"),
        })
    }

    /// Attachment payload state for attachment, sticker and avatar frames.
    pub fn attachment_slot(&self) -> Option<&AttachmentSlot> {
        match self {
            Self::Attachment(f) => Some(f.slot()),
            Self::Sticker(f) => Some(f.slot()),
            Self::Avatar(f) => Some(f.slot()),
            _ => None,
        }
    }

    /// Mutable attachment payload state.
    pub fn attachment_slot_mut(&mut self) -> Option<&mut AttachmentSlot> {
        match self {
            Self::Attachment(f) => Some(f.slot_mut()),
            Self::Sticker(f) => Some(f.slot_mut()),
            Self::Avatar(f) => Some(f.slot_mut()),
            _ => None,
        }
    }

    /// Payload size: the loaded buffer's length if present, otherwise the
    /// declared LENGTH field. Zero for frames without a payload or without a
    /// readable length.
    pub fn attachment_size(&self) -> u32 {
        if let Some(len) = self.attachment_slot().and_then(AttachmentSlot::cached_len) {
            return u32::try_from(len).unwrap_or(u32::MAX);
        }

        self.declared_length().unwrap_or(0)
    }

    /// LENGTH field of an attachment, sticker or avatar frame.
    ///
    /// `None` for other variants and for a missing or unreadable field.
    pub fn declared_length(&self) -> Option<u32> {
        let declared = match self {
            Self::Attachment(f) => f.length(),
            Self::Sticker(f) => f.length(),
            Self::Avatar(f) => f.length(),
            _ => return None,
        };
        declared.ok()
    }

    /// Body bytes that follow this frame in the stream.
    ///
    /// Zero for frames without a payload and for a missing or mistyped
    /// LENGTH, which validation rejects later.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FieldSizeMismatch` if LENGTH does not fit in a
    ///   `u32`. The body's extent is then unknown.
    pub fn body_length(&self) -> Result<u32> {
        let declared = match self {
            Self::Attachment(f) => f.length(),
            Self::Sticker(f) => f.length(),
            Self::Avatar(f) => f.length(),
            _ => return Ok(0),
        };
        match declared {
            Err(err @ ProtocolError::FieldSizeMismatch { .. }) => Err(err),
            other => Ok(other.unwrap_or(0)),
        }
    }

    /// Install the reader that will produce this frame's payload.
    ///
    /// Returns false (and drops the reader) for frames without a payload.
    pub fn set_attachment_reader(&mut self, reader: Box<dyn AttachmentReader>) -> bool {
        match self.attachment_slot_mut() {
            Some(slot) => {
                slot.set_reader(reader);
                true
            },
            None => false,
        }
    }

    /// Payload bytes, pulled through the reader on first access.
    ///
    /// # Errors
    ///
    /// - `AttachmentError::NoSource` for frames without a payload slot or
    ///   without a reader
    /// - Any reader error
    pub fn attachment_data(&mut self, verbose: bool) -> std::result::Result<&AttachmentPayload, AttachmentError> {
        self.attachment_slot_mut().ok_or(AttachmentError::NoSource)?.load(verbose)
    }

    /// Install payload bytes directly, replacing any previous buffer.
    pub fn set_attachment_data(&mut self, data: Vec<u8>) -> bool {
        match self.attachment_slot_mut() {
            Some(slot) => {
                slot.set_data(data);
                true
            },
            None => false,
        }
    }

    /// Release the cached payload if it can be fetched again.
    pub fn clear_data(&mut self) -> bool {
        self.attachment_slot_mut().is_none_or(AttachmentSlot::clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RawField, frames::SqlParameter};

    #[test]
    fn kind_numbers_match_wire_format() {
        for (kind, number) in FrameKind::ALL.into_iter().zip(1u8..) {
            assert_eq!(kind.to_u8(), number);
            assert_eq!(FrameKind::from_u8(number), Some(kind));
        }
        assert_eq!(FrameKind::from_u8(0), None);
        assert_eq!(FrameKind::from_u8(10), None);
    }

    #[test]
    fn database_version_wire_bytes() {
        let frame = Frame::DatabaseVersion(DatabaseVersionFrame::new(5));
        // [type 5, len-delim][len 2][field 1 varint][5]
        assert_eq!(frame.to_bytes(), [0x2a, 0x02, 0x08, 0x05]);
        assert_eq!(Frame::decode(&frame.to_bytes()), Ok(frame));
    }

    #[test]
    fn end_wire_bytes() {
        let frame = Frame::End(EndFrame::new());
        assert_eq!(frame.to_bytes(), [0x30, 0x01]);
        assert_eq!(frame.encoded_len(), 2);
        assert!(frame.fields().is_empty());
    }

    #[test]
    fn statement_round_trip() {
        let frame = Frame::SqlStatement(SqlStatementFrame::with_parameters(
            "INSERT INTO sms VALUES (?, ?)",
            &[SqlParameter::Integer(1), SqlParameter::Text("hi".to_owned())],
        ));
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), frame.encoded_len());
        assert_eq!(Frame::decode(&bytes), Ok(frame));
    }

    #[test]
    fn rejects_unknown_frame_type() {
        assert_eq!(
            Frame::decode(&[0x52, 0x00]),
            Err(ProtocolError::UnknownFrameType { frame_type: 10 })
        );
    }

    #[test]
    fn rejects_varint_wire_type_for_message_frames() {
        assert!(matches!(
            Frame::decode(&[0x28, 0x05]),
            Err(ProtocolError::UnexpectedWireType { kind: FrameKind::DatabaseVersion, .. })
        ));
    }

    #[test]
    fn rejects_overrunning_body_length() {
        assert_eq!(
            Frame::decode(&[0x2a, 0x09, 0x08, 0x05]),
            Err(ProtocolError::FrameTruncated { expected: 9, actual: 2 })
        );
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert_eq!(
            Frame::decode(&[0x2a, 0x02, 0x08, 0x05, 0x00]),
            Err(ProtocolError::TrailingBytes { trailing: 1 })
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(Frame::decode(&[]), Err(ProtocolError::FrameTruncated { .. })));
    }

    #[test]
    fn attachment_size_prefers_loaded_data() {
        let mut frame = Frame::Attachment(AttachmentFrame::new(1, 2, 100));
        assert_eq!(frame.attachment_size(), 100);

        assert!(frame.set_attachment_data(vec![0; 7]));
        assert_eq!(frame.attachment_size(), 7);
        assert_eq!(frame.attachment_data(false).unwrap().data.len(), 7);
    }

    #[test]
    fn frames_without_payload() {
        let mut frame = Frame::DatabaseVersion(DatabaseVersionFrame::new(1));
        assert_eq!(frame.attachment_size(), 0);
        assert!(!frame.set_attachment_data(vec![1]));
        assert!(matches!(frame.attachment_data(false), Err(AttachmentError::NoSource)));
        assert!(frame.clear_data());
    }

    #[test]
    fn body_length_rejects_lengths_past_u32() {
        let mut fields = FieldList::new();
        fields.push(RawField::varint(AttachmentFrame::FIELD_ROW_ID, 1));
        fields.push(RawField::varint(AttachmentFrame::FIELD_ATTACHMENT_ID, 2));
        fields.push(RawField::varint(AttachmentFrame::FIELD_LENGTH, u64::from(u32::MAX) + 1));
        let frame = Frame::Attachment(AttachmentFrame::from_fields(fields));

        assert!(matches!(frame.body_length(), Err(ProtocolError::FieldSizeMismatch { field: 3, .. })));
        assert_eq!(Frame::Attachment(AttachmentFrame::new(1, 2, 9)).body_length(), Ok(9));
        assert_eq!(Frame::DatabaseVersion(DatabaseVersionFrame::new(1)).body_length(), Ok(0));
    }

    #[test]
    fn clear_data_keeps_inline_payload() {
        let mut frame = Frame::Sticker(StickerFrame::new(1, 3));
        frame.set_attachment_data(vec![1, 2, 3]);
        assert!(!frame.clear_data());
        assert_eq!(frame.attachment_size(), 3);
    }
}
