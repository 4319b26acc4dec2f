//! Concrete frame variants.
//!
//! Each variant wraps a [`FieldList`] and knows its legal field numbers, its
//! structural rules (`validate`) and typed accessors. Encoding is shared and
//! lives on [`crate::Frame`].
//!
//! Validation never mutates a frame and never fails for a reason that would
//! hide the frame's extent: a frame that fails validation has already been
//! fully delimited, so the stream can continue past it.

mod attachment;
mod avatar;
mod database_version;
mod end;
mod header;
mod key_value;
mod shared_pref;
mod sql_statement;
mod sticker;

pub use attachment::AttachmentFrame;
pub use avatar::AvatarFrame;
pub use database_version::DatabaseVersionFrame;
pub use end::EndFrame;
pub use header::HeaderFrame;
pub use key_value::{KeyValue, KeyValueFrame};
pub use shared_pref::SharedPrefFrame;
pub use sql_statement::{SqlParameter, SqlStatementFrame};
pub use sticker::StickerFrame;

use crate::{
    FieldList, FrameKind,
    errors::{ProtocolError, Result},
};

fn reject(kind: FrameKind, reason: &'static str) -> ProtocolError {
    ProtocolError::ValidationFailed { kind, reason }
}

/// Fail unless `cond` holds.
fn ensure(cond: bool, kind: FrameKind, reason: &'static str) -> Result<()> {
    if cond { Ok(()) } else { Err(reject(kind, reason)) }
}

/// Fail unless exactly one field carries `number`.
fn exactly_one(fields: &FieldList, kind: FrameKind, number: u8, reason: &'static str) -> Result<()> {
    ensure(fields.count(number) == 1, kind, reason)
}
