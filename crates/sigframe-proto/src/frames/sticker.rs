use super::{ensure, exactly_one};
use crate::{
    AttachmentSlot, FieldList, FrameKind, RawField, WireType, errors::Result, fields::missing,
};

/// Sticker image descriptor. The body follows the frame in the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StickerFrame {
    fields: FieldList,
    slot: AttachmentSlot,
}

impl StickerFrame {
    /// Database row id of the sticker
    pub const FIELD_ROW_ID: u8 = 1;
    /// Plaintext body length
    pub const FIELD_LENGTH: u8 = 2;

    /// Hard ceiling on sticker bodies.
    pub const MAX_LENGTH: u64 = 1024 * 1024;

    /// Widest varint either field may occupy on the wire.
    const MAX_FIELD_SIZE: usize = 8;

    /// Descriptor for a body of `length` bytes.
    pub fn new(row_id: u64, length: u32) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::varint(Self::FIELD_ROW_ID, row_id));
        fields.push(RawField::varint(Self::FIELD_LENGTH, u64::from(length)));
        Self { fields, slot: AttachmentSlot::default() }
    }

    pub(crate) fn from_fields(fields: FieldList) -> Self {
        Self { fields, slot: AttachmentSlot::default() }
    }

    /// Underlying fields.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Row id.
    pub fn row_id(&self) -> Result<u64> {
        self.fields
            .u64_field(Self::FIELD_ROW_ID)?
            .ok_or_else(|| missing(FrameKind::Sticker, Self::FIELD_ROW_ID))
    }

    /// Declared body length.
    pub fn length(&self) -> Result<u32> {
        self.fields
            .u32_field(Self::FIELD_LENGTH)?
            .ok_or_else(|| missing(FrameKind::Sticker, Self::FIELD_LENGTH))
    }

    /// Attachment payload state.
    pub fn slot(&self) -> &AttachmentSlot {
        &self.slot
    }

    /// Mutable attachment payload state.
    pub fn slot_mut(&mut self) -> &mut AttachmentSlot {
        &mut self.slot
    }

    /// Exactly one row id and one length, both varints no wider than eight
    /// bytes, and a length under [`Self::MAX_LENGTH`].
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::Sticker;
        ensure(
            self.fields.only_contains(&[Self::FIELD_ROW_ID, Self::FIELD_LENGTH]),
            kind,
            "sticker has unknown fields",
        )?;
        exactly_one(&self.fields, kind, Self::FIELD_ROW_ID, "needs exactly one row id")?;
        exactly_one(&self.fields, kind, Self::FIELD_LENGTH, "needs exactly one length")?;
        ensure(
            self.fields.iter().all(|f| {
                f.wire_type() == WireType::Varint && f.data().len() <= Self::MAX_FIELD_SIZE
            }),
            kind,
            "sticker field wider than eight bytes",
        )?;

        self.row_id()?;
        let length = self
            .fields
            .u64_field(Self::FIELD_LENGTH)?
            .ok_or_else(|| missing(kind, Self::FIELD_LENGTH))?;
        ensure(length < Self::MAX_LENGTH, kind, "sticker length exceeds 1 MiB")
    }
}
