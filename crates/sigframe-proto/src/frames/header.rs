//! First frame of every backup: stream IV and key-derivation salt.
//!
//! The header travels unencrypted. Its IV seeds the frame counter and its salt
//! feeds the passphrase stretch.

use super::{ensure, exactly_one};
use crate::{FieldList, FrameKind, RawField, errors::Result, fields::missing};

/// Header frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFrame {
    fields: FieldList,
}

impl HeaderFrame {
    /// 16-byte stream IV
    pub const FIELD_IV: u8 = 1;
    /// Key-derivation salt
    pub const FIELD_SALT: u8 = 2;
    /// Backup format version (newer exports only)
    pub const FIELD_VERSION: u8 = 3;

    /// Required IV length.
    pub const IV_SIZE: usize = 16;

    /// Build a header from its parts.
    pub fn new(iv: [u8; Self::IV_SIZE], salt: &[u8], version: Option<u32>) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::bytes(Self::FIELD_IV, iv.to_vec()));
        fields.push(RawField::bytes(Self::FIELD_SALT, salt.to_vec()));
        if let Some(version) = version {
            fields.push(RawField::varint(Self::FIELD_VERSION, u64::from(version)));
        }
        Self { fields }
    }

    pub(crate) fn from_fields(fields: FieldList) -> Self {
        Self { fields }
    }

    /// Underlying fields.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Stream IV.
    pub fn iv(&self) -> Result<[u8; Self::IV_SIZE]> {
        let iv = self
            .fields
            .bytes_field(Self::FIELD_IV)?
            .ok_or_else(|| missing(FrameKind::Header, Self::FIELD_IV))?;
        <[u8; Self::IV_SIZE]>::try_from(iv).map_err(|_| crate::ProtocolError::FieldSizeMismatch {
            field: Self::FIELD_IV,
            expected: Self::IV_SIZE,
            actual: iv.len(),
        })
    }

    /// Key-derivation salt (empty if absent).
    pub fn salt(&self) -> Result<&[u8]> {
        Ok(self.fields.bytes_field(Self::FIELD_SALT)?.unwrap_or_default())
    }

    /// Format version, if the exporter wrote one.
    pub fn version(&self) -> Result<Option<u32>> {
        self.fields.u32_field(Self::FIELD_VERSION)
    }

    /// Structural rules: only header fields, exactly one 16-byte IV, at most
    /// one salt.
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::Header;
        ensure(!self.fields.is_empty(), kind, "header has no fields")?;
        ensure(
            self.fields.only_contains(&[Self::FIELD_IV, Self::FIELD_SALT, Self::FIELD_VERSION]),
            kind,
            "header has unknown fields",
        )?;
        exactly_one(&self.fields, kind, Self::FIELD_IV, "header needs exactly one iv")?;
        ensure(self.fields.count(Self::FIELD_SALT) <= 1, kind, "header has duplicate salt")?;
        ensure(self.iv().is_ok(), kind, "header iv is not 16 bytes")?;
        self.version().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let header = HeaderFrame::new([7; 16], b"salty", Some(1));
        assert_eq!(header.iv(), Ok([7; 16]));
        assert_eq!(header.salt(), Ok(&b"salty"[..]));
        assert_eq!(header.version(), Ok(Some(1)));
        assert!(header.validate().is_ok());
    }

    #[test]
    fn short_iv_is_invalid() {
        let mut fields = FieldList::new();
        fields.push(RawField::bytes(HeaderFrame::FIELD_IV, vec![0; 12]));
        let header = HeaderFrame::from_fields(fields);
        assert!(header.iv().is_err());
        assert!(header.validate().is_err());
    }

    #[test]
    fn unknown_field_is_invalid() {
        let mut header = HeaderFrame::new([0; 16], b"s", None);
        header.fields.push(RawField::varint(9, 1));
        assert!(header.validate().is_err());
    }
}
