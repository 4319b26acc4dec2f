//! Ordered field list backing every frame variant.
//!
//! # Invariants
//!
//! - Insertion order is preserved. Re-encoding a decoded list reproduces the
//!   original bytes as long as every varint was minimally encoded.
//! - Lookups by field number return the FIRST match. Later duplicates are kept
//!   for re-encoding but never win a lookup.

use bytes::BufMut;

use crate::{
    RawField,
    errors::{ProtocolError, Result},
};

/// Ordered multiset of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList {
    fields: Vec<RawField>,
}

impl FieldList {
    /// Empty list.
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Number of fields, duplicates included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the list holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RawField> {
        self.fields.iter()
    }

    /// Append a field.
    pub fn push(&mut self, field: RawField) {
        self.fields.push(field);
    }

    /// First field with this number.
    pub fn get_field(&self, number: u8) -> Option<&RawField> {
        self.fields.iter().find(|f| f.number() == number)
    }

    /// All fields with this number, in order.
    pub fn fields_with(&self, number: u8) -> impl Iterator<Item = &RawField> {
        self.fields.iter().filter(move |f| f.number() == number)
    }

    /// How many fields carry this number.
    pub fn count(&self, number: u8) -> usize {
        self.fields_with(number).count()
    }

    /// True if every field number appears in `allowed`.
    pub fn only_contains(&self, allowed: &[u8]) -> bool {
        self.fields.iter().all(|f| allowed.contains(&f.number()))
    }

    /// Replace the first field with the same number, keeping its position.
    ///
    /// Returns false and leaves the list untouched if no such field exists.
    pub fn replace_field(&mut self, field: RawField) -> bool {
        match self.fields.iter_mut().find(|f| f.number() == field.number()) {
            Some(slot) => {
                *slot = field;
                true
            },
            None => false,
        }
    }

    /// Remove every field with this number. Returns how many were removed.
    pub fn remove_all(&mut self, number: u8) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.number() != number);
        before - self.fields.len()
    }

    /// First field with this number read as `u64`, if present.
    pub fn u64_field(&self, number: u8) -> Result<Option<u64>> {
        self.get_field(number).map(RawField::as_u64).transpose()
    }

    /// First field with this number read as `u32`, if present.
    pub fn u32_field(&self, number: u8) -> Result<Option<u32>> {
        self.get_field(number).map(RawField::as_u32).transpose()
    }

    /// First field with this number read as UTF-8, if present.
    pub fn str_field(&self, number: u8) -> Result<Option<&str>> {
        self.get_field(number).map(RawField::as_str).transpose()
    }

    /// First field with this number read as raw bytes, if present.
    pub fn bytes_field(&self, number: u8) -> Result<Option<&[u8]>> {
        self.get_field(number).map(RawField::as_bytes).transpose()
    }

    /// Encoded size of all fields.
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(RawField::encoded_len).sum()
    }

    /// Append every field's encoding to `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        for field in &self.fields {
            field.encode(dst);
        }
    }

    /// Decode a complete frame body.
    ///
    /// # Errors
    ///
    /// Any field error from [`RawField::decode`]. The whole buffer must be
    /// consumed by well-formed fields.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut fields = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let (field, used) = RawField::decode(bytes, pos)?;
            fields.push(field);
            pos += used;
        }

        debug_assert_eq!(pos, bytes.len());
        Ok(Self { fields })
    }
}

impl FromIterator<RawField> for FieldList {
    fn from_iter<I: IntoIterator<Item = RawField>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a RawField;
    type IntoIter = std::slice::Iter<'a, RawField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Convenience for validators: a required field failed to appear.
pub(crate) fn missing(kind: crate::FrameKind, field: u8) -> ProtocolError {
    ProtocolError::MissingField { kind, field }
}
