use super::{ensure, exactly_one};
use crate::{AttachmentSlot, FieldList, FrameKind, RawField, errors::Result, fields::missing};

/// Message attachment descriptor. The body follows the frame in the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentFrame {
    fields: FieldList,
    slot: AttachmentSlot,
}

impl AttachmentFrame {
    /// Database row id of the attachment
    pub const FIELD_ROW_ID: u8 = 1;
    /// Unique attachment id
    pub const FIELD_ATTACHMENT_ID: u8 = 2;
    /// Plaintext body length
    pub const FIELD_LENGTH: u8 = 3;

    /// Descriptor for a body of `length` bytes.
    pub fn new(row_id: u64, attachment_id: u64, length: u32) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::varint(Self::FIELD_ROW_ID, row_id));
        fields.push(RawField::varint(Self::FIELD_ATTACHMENT_ID, attachment_id));
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
        self.required(Self::FIELD_ROW_ID)
    }

    /// Attachment id.
    pub fn attachment_id(&self) -> Result<u64> {
        self.required(Self::FIELD_ATTACHMENT_ID)
    }

    /// Declared body length.
    pub fn length(&self) -> Result<u32> {
        self.fields
            .u32_field(Self::FIELD_LENGTH)?
            .ok_or_else(|| missing(FrameKind::Attachment, Self::FIELD_LENGTH))
    }

    /// Overwrite the length field in place. No-op (false) if absent.
    pub fn set_length(&mut self, length: u32) -> bool {
        self.fields.replace_field(RawField::varint(Self::FIELD_LENGTH, u64::from(length)))
    }

    /// Overwrite the row id in place. No-op (false) if absent.
    pub fn set_row_id(&mut self, row_id: u64) -> bool {
        self.fields.replace_field(RawField::varint(Self::FIELD_ROW_ID, row_id))
    }

    /// Attachment payload state.
    pub fn slot(&self) -> &AttachmentSlot {
        &self.slot
    }

    /// Mutable attachment payload state.
    pub fn slot_mut(&mut self) -> &mut AttachmentSlot {
        &mut self.slot
    }

    /// Exactly one row id, attachment id and length.
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::Attachment;
        ensure(
            self.fields.only_contains(&[
                Self::FIELD_ROW_ID,
                Self::FIELD_ATTACHMENT_ID,
                Self::FIELD_LENGTH,
            ]),
            kind,
            "attachment has unknown fields",
        )?;
        exactly_one(&self.fields, kind, Self::FIELD_ROW_ID, "needs exactly one row id")?;
        exactly_one(&self.fields, kind, Self::FIELD_ATTACHMENT_ID, "needs exactly one id")?;
        exactly_one(&self.fields, kind, Self::FIELD_LENGTH, "needs exactly one length")?;
        self.row_id()?;
        self.attachment_id()?;
        self.length().map(|_| ())
    }

    fn required(&self, number: u8) -> Result<u64> {
        self.fields.u64_field(number)?.ok_or_else(|| missing(FrameKind::Attachment, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_and_setters() {
        let mut frame = AttachmentFrame::new(11, 1_700_000_000_000, 4096);
        assert_eq!(frame.row_id(), Ok(11));
        assert_eq!(frame.attachment_id(), Ok(1_700_000_000_000));
        assert_eq!(frame.length(), Ok(4096));

        assert!(frame.set_length(10));
        assert!(frame.set_row_id(12));
        assert_eq!(frame.length(), Ok(10));
        assert_eq!(frame.row_id(), Ok(12));

        let numbers: Vec<u8> = frame.fields().iter().map(RawField::number).collect();
        assert_eq!(numbers, [1, 2, 3], "setters keep field positions");
    }

    #[test]
    fn set_length_on_absent_field_is_noop() {
        let mut frame = AttachmentFrame::from_fields(FieldList::new());
        assert!(!frame.set_length(5));
        assert!(frame.fields().is_empty());
    }

    #[test]
    fn duplicate_length_is_invalid() {
        let mut frame = AttachmentFrame::new(1, 2, 3);
        frame.fields.push(RawField::varint(AttachmentFrame::FIELD_LENGTH, 3));
        assert!(frame.validate().is_err());
    }
}
