use super::{ensure, exactly_one};
use crate::{AttachmentSlot, FieldList, FrameKind, RawField, errors::Result, fields::missing};

/// Contact or group avatar. Older exports key it by name, newer ones by
/// recipient id; a frame carries exactly one of the two.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvatarFrame {
    fields: FieldList,
    slot: AttachmentSlot,
}

impl AvatarFrame {
    /// Legacy avatar name
    pub const FIELD_NAME: u8 = 1;
    /// Plaintext body length
    pub const FIELD_LENGTH: u8 = 2;
    /// Recipient id
    pub const FIELD_RECIPIENT: u8 = 3;

    /// Avatar keyed by recipient id.
    pub fn for_recipient(recipient: &str, length: u32) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::varint(Self::FIELD_LENGTH, u64::from(length)));
        fields.push(RawField::string(Self::FIELD_RECIPIENT, recipient));
        Self { fields, slot: AttachmentSlot::default() }
    }

    /// Avatar keyed by legacy name.
    pub fn named(name: &str, length: u32) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::string(Self::FIELD_NAME, name));
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

    /// Legacy name, if present.
    pub fn name(&self) -> Result<Option<&str>> {
        self.fields.str_field(Self::FIELD_NAME)
    }

    /// Recipient id, if present.
    pub fn recipient(&self) -> Result<Option<&str>> {
        self.fields.str_field(Self::FIELD_RECIPIENT)
    }

    /// Declared body length.
    pub fn length(&self) -> Result<u32> {
        self.fields
            .u32_field(Self::FIELD_LENGTH)?
            .ok_or_else(|| missing(FrameKind::Avatar, Self::FIELD_LENGTH))
    }

    /// Overwrite the recipient in place. No-op (false) if absent.
    pub fn set_recipient(&mut self, recipient: &str) -> bool {
        self.fields.replace_field(RawField::string(Self::FIELD_RECIPIENT, recipient))
    }

    /// Overwrite the length in place. No-op (false) if absent.
    pub fn set_length(&mut self, length: u32) -> bool {
        self.fields.replace_field(RawField::varint(Self::FIELD_LENGTH, u64::from(length)))
    }

    /// Attachment payload state.
    pub fn slot(&self) -> &AttachmentSlot {
        &self.slot
    }

    /// Mutable attachment payload state.
    pub fn slot_mut(&mut self) -> &mut AttachmentSlot {
        &mut self.slot
    }

    /// Exactly one length and exactly one of name or recipient.
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::Avatar;
        ensure(
            self.fields.only_contains(&[Self::FIELD_NAME, Self::FIELD_LENGTH, Self::FIELD_RECIPIENT]),
            kind,
            "avatar has unknown fields",
        )?;
        exactly_one(&self.fields, kind, Self::FIELD_LENGTH, "needs exactly one length")?;

        let names = self.fields.count(Self::FIELD_NAME);
        let recipients = self.fields.count(Self::FIELD_RECIPIENT);
        ensure(names + recipients == 1, kind, "needs exactly one of name or recipient")?;

        self.name()?;
        self.recipient()?;
        self.length().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_avatar() {
        let mut frame = AvatarFrame::for_recipient("42", 900);
        assert_eq!(frame.recipient(), Ok(Some("42")));
        assert_eq!(frame.name(), Ok(None));
        assert!(frame.validate().is_ok());

        assert!(frame.set_recipient("43"));
        assert_eq!(frame.recipient(), Ok(Some("43")));
    }

    #[test]
    fn named_avatar_cannot_gain_recipient_by_setter() {
        let mut frame = AvatarFrame::named("+15550001111", 12);
        assert!(!frame.set_recipient("7"));
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn name_and_recipient_together_are_invalid() {
        let mut frame = AvatarFrame::for_recipient("1", 1);
        frame.fields.push(RawField::string(AvatarFrame::FIELD_NAME, "alice"));
        assert!(frame.validate().is_err());
    }

    #[test]
    fn neither_name_nor_recipient_is_invalid() {
        let mut fields = FieldList::new();
        fields.push(RawField::varint(AvatarFrame::FIELD_LENGTH, 1));
        assert!(AvatarFrame::from_fields(fields).validate().is_err());
    }
}
