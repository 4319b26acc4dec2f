use super::{ensure, exactly_one};
use crate::{FieldList, FrameKind, RawField, errors::Result, fields::missing};

/// Schema version of the database the following statements rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseVersionFrame {
    fields: FieldList,
}

impl DatabaseVersionFrame {
    /// Schema version number
    pub const FIELD_VERSION: u8 = 1;

    /// Frame announcing `version`.
    pub fn new(version: u32) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::varint(Self::FIELD_VERSION, u64::from(version)));
        Self { fields }
    }

    pub(crate) fn from_fields(fields: FieldList) -> Self {
        Self { fields }
    }

    /// Underlying fields.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Schema version.
    pub fn version(&self) -> Result<u32> {
        self.fields
            .u32_field(Self::FIELD_VERSION)?
            .ok_or_else(|| missing(FrameKind::DatabaseVersion, Self::FIELD_VERSION))
    }

    /// Exactly one version field that fits in 32 bits.
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::DatabaseVersion;
        ensure(self.fields.only_contains(&[Self::FIELD_VERSION]), kind, "unknown fields")?;
        exactly_one(&self.fields, kind, Self::FIELD_VERSION, "needs exactly one version")?;
        self.version().map(|_| ())
    }
}
