//! Error types for frame decoding, encoding and validation.

use thiserror::Error;

use crate::{FrameKind, WireType};

/// Result alias for wire-format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding, inspecting or validating frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A varint did not terminate inside the buffer or overflowed 64 bits.
    #[error("malformed varint at offset {offset}")]
    MalformedVarint {
        /// Offset of the first varint byte
        offset: usize,
    },

    /// A field header byte had its high bit set or carried field number 0.
    #[error("invalid field header {byte:#04x} at offset {offset}")]
    InvalidFieldHeader {
        /// The offending header byte
        byte: u8,
        /// Offset of the header byte
        offset: usize,
    },

    /// Group wire types (3, 4) and unassigned values are not part of the format.
    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType {
        /// Raw wire type bits
        wire_type: u8,
        /// Offset of the header byte
        offset: usize,
    },

    /// A typed read found a value of the wrong width.
    #[error("field {field}: expected {expected} bytes, got {actual}")]
    FieldSizeMismatch {
        /// Field number
        field: u8,
        /// Width required by the reader
        expected: usize,
        /// Width actually present
        actual: usize,
    },

    /// A typed read found a field of another wire type.
    #[error("field {field}: expected wire type {expected:?}, got {actual:?}")]
    WireTypeMismatch {
        /// Field number
        field: u8,
        /// Wire type required by the reader
        expected: WireType,
        /// Wire type actually present
        actual: WireType,
    },

    /// A string field held invalid UTF-8.
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 {
        /// Field number
        field: u8,
    },

    /// A required field was absent.
    #[error("{kind} frame is missing field {field}")]
    MissingField {
        /// Frame variant
        kind: FrameKind,
        /// Field number
        field: u8,
    },

    /// A length prefix claimed more bytes than were available.
    #[error("frame truncated: expected {expected} bytes, got {actual}")]
    FrameTruncated {
        /// Bytes claimed by the length prefix
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Bytes remained after the outer frame length was consumed.
    #[error("{trailing} trailing bytes after frame body")]
    TrailingBytes {
        /// Number of unconsumed bytes
        trailing: usize,
    },

    /// The outer field number does not name a known frame type.
    #[error("unknown frame type {frame_type}")]
    UnknownFrameType {
        /// Outer field number
        frame_type: u8,
    },

    /// The outer field carried the wrong wire type for its frame type.
    #[error("{kind} frame has unexpected wire type {wire_type:?}")]
    UnexpectedWireType {
        /// Frame variant
        kind: FrameKind,
        /// Wire type found on the outer field
        wire_type: WireType,
    },

    /// The frame decoded but its field set breaks the variant's rules.
    #[error("{kind} frame failed validation: {reason}")]
    ValidationFailed {
        /// Frame variant
        kind: FrameKind,
        /// Which rule failed
        reason: &'static str,
    },

    /// A SQL statement's placeholder count differs from its parameter count.
    #[error("statement has {placeholders} placeholders but {parameters} parameters")]
    ParameterCountMismatch {
        /// Number of `?` in the statement
        placeholders: usize,
        /// Number of bound parameters
        parameters: usize,
    },
}

impl ProtocolError {
    /// Returns true if this error invalidates the rest of the stream.
    ///
    /// Structural errors leave no way to find the next frame boundary inside
    /// the plaintext. Validation and rendering errors concern one frame only.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::MalformedVarint { .. }
            | Self::InvalidFieldHeader { .. }
            | Self::UnsupportedWireType { .. }
            | Self::FrameTruncated { .. }
            | Self::TrailingBytes { .. }
            | Self::UnknownFrameType { .. }
            | Self::UnexpectedWireType { .. }
            | Self::FieldSizeMismatch { .. } => true,

            Self::WireTypeMismatch { .. }
            | Self::InvalidUtf8 { .. }
            | Self::MissingField { .. }
            | Self::ValidationFailed { .. }
            | Self::ParameterCountMismatch { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_fatal() {
        assert!(ProtocolError::MalformedVarint { offset: 3 }.is_fatal());
        assert!(ProtocolError::FrameTruncated { expected: 10, actual: 2 }.is_fatal());
        assert!(ProtocolError::FieldSizeMismatch { field: 1, expected: 4, actual: 8 }.is_fatal());
    }

    #[test]
    fn validation_failure_is_not_fatal() {
        let err = ProtocolError::ValidationFailed {
            kind: FrameKind::Sticker,
            reason: "sticker length exceeds 1 MiB",
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::UnknownFrameType { frame_type: 12 };
        assert_eq!(err.to_string(), "unknown frame type 12");

        let err = ProtocolError::MissingField { kind: FrameKind::Attachment, field: 3 };
        assert_eq!(err.to_string(), "attachment frame is missing field 3");
    }
}
