//! Sigframe Wire Format
//!
//! Plaintext encoding of encrypted backup streams. A backup is a sequence of
//! frames, each a small protobuf-style message made of numbered fields. This
//! crate knows how to delimit, decode, validate and re-encode them. It does
//! no cryptography and no I/O beyond what attachment readers bring in.
//!
//! # Layering
//!
//! ```text
//! varint      base-128 integers, frame size arithmetic
//!    │
//!    ▼
//! field       one (number, wire type, payload) triple
//!    │
//!    ▼
//! fields      ordered field list, first-match lookups
//!    │
//!    ▼
//! frames      per-variant accessors and validation rules
//!    │
//!    ▼
//! frame       closed Frame enum, decode factory, encoding
//! ```
//!
//! Attachment, sticker and avatar frames describe a binary payload that
//! follows them in the stream. They own an [`AttachmentSlot`] holding a
//! boxed [`AttachmentReader`] and the lazily loaded result.
//!
//! # Error Model
//!
//! Structural errors (truncation, malformed varints, unknown frame types)
//! make a frame's extent unknowable and are fatal to a stream. Semantic
//! errors (missing fields, wrong field types, failed validation) leave the
//! frame delimited; the stream can skip it. See [`ProtocolError::is_fatal`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attachment;
pub mod errors;
pub mod field;
pub mod fields;
pub mod frame;
pub mod frames;
pub mod varint;

pub use attachment::{
    AttachmentError, AttachmentPayload, AttachmentReader, AttachmentSlot, MacStatus,
};
pub use errors::{ProtocolError, Result};
pub use field::{MAX_FIELD_NUMBER, RawField, WireType, field_header, parse_field_header};
pub use fields::FieldList;
pub use frame::{Frame, FrameKind};
pub use frames::{
    AttachmentFrame, AvatarFrame, DatabaseVersionFrame, EndFrame, HeaderFrame, KeyValue,
    KeyValueFrame, SharedPrefFrame, SqlParameter, SqlStatementFrame, StickerFrame,
};
pub use varint::{
    MAX_VARINT_LEN, body_len_for_frame_size, decode_varint, encode_varint, frame_size, varint_len,
};
