use super::{ensure, exactly_one};
use crate::{FieldList, FrameKind, RawField, errors::Result, fields::missing};

/// Typed value of a key-value entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue<'a> {
    /// Opaque bytes
    Blob(&'a [u8]),
    /// Boolean
    Boolean(bool),
    /// Single-precision float (fixed32 on the wire)
    Float(f32),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// UTF-8 string
    String(&'a str),
}

/// One entry of the application's key-value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueFrame {
    fields: FieldList,
}

impl KeyValueFrame {
    /// Entry key
    pub const FIELD_KEY: u8 = 1;
    /// Blob value
    pub const FIELD_BLOB: u8 = 2;
    /// Boolean value
    pub const FIELD_BOOLEAN: u8 = 3;
    /// Float value
    pub const FIELD_FLOAT: u8 = 4;
    /// Integer value
    pub const FIELD_INTEGER: u8 = 5;
    /// Long value
    pub const FIELD_LONG: u8 = 6;
    /// String value
    pub const FIELD_STRING: u8 = 7;

    const VALUE_FIELDS: [u8; 6] = [
        Self::FIELD_BLOB,
        Self::FIELD_BOOLEAN,
        Self::FIELD_FLOAT,
        Self::FIELD_INTEGER,
        Self::FIELD_LONG,
        Self::FIELD_STRING,
    ];

    /// Entry mapping `key` to `value`.
    pub fn new(key: &str, value: KeyValue<'_>) -> Self {
        let value = match value {
            KeyValue::Blob(b) => RawField::bytes(Self::FIELD_BLOB, b.to_vec()),
            KeyValue::Boolean(b) => RawField::varint(Self::FIELD_BOOLEAN, u64::from(b)),
            KeyValue::Float(f) => RawField::float(Self::FIELD_FLOAT, f),
            // Negative int32 values are sign-extended to ten bytes on the wire
            KeyValue::Integer(i) => RawField::varint(Self::FIELD_INTEGER, i64::from(i) as u64),
            KeyValue::Long(l) => RawField::varint(Self::FIELD_LONG, l as u64),
            KeyValue::String(s) => RawField::string(Self::FIELD_STRING, s),
        };

        let mut fields = FieldList::new();
        fields.push(RawField::string(Self::FIELD_KEY, key));
        fields.push(value);
        Self { fields }
    }

    pub(crate) fn from_fields(fields: FieldList) -> Self {
        Self { fields }
    }

    /// Underlying fields.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Entry key.
    pub fn key(&self) -> Result<&str> {
        self.fields
            .str_field(Self::FIELD_KEY)?
            .ok_or_else(|| missing(FrameKind::KeyValue, Self::FIELD_KEY))
    }

    /// Entry value, decoded by whichever value field is present first.
    pub fn value(&self) -> Result<Option<KeyValue<'_>>> {
        let Some(field) = self.fields.iter().find(|f| Self::VALUE_FIELDS.contains(&f.number()))
        else {
            return Ok(None);
        };

        let value = match field.number() {
            Self::FIELD_BLOB => KeyValue::Blob(field.as_bytes()?),
            Self::FIELD_BOOLEAN => KeyValue::Boolean(field.as_bool()?),
            Self::FIELD_FLOAT => KeyValue::Float(field.as_f32()?),
            Self::FIELD_INTEGER => KeyValue::Integer(field.as_u64()? as i32),
            Self::FIELD_LONG => KeyValue::Long(field.as_u64()? as i64),
            Self::FIELD_STRING => KeyValue::String(field.as_str()?),
            _ => unreachable!("filtered to value fields above"),
        };
        Ok(Some(value))
    }

    /// Exactly one key and exactly one value field.
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::KeyValue;
        let mut allowed = Self::VALUE_FIELDS.to_vec();
        allowed.push(Self::FIELD_KEY);

        ensure(self.fields.only_contains(&allowed), kind, "key-value has unknown fields")?;
        exactly_one(&self.fields, kind, Self::FIELD_KEY, "key-value needs exactly one key")?;

        let values = self.fields.iter().filter(|f| Self::VALUE_FIELDS.contains(&f.number()));
        ensure(values.count() == 1, kind, "key-value needs exactly one value")?;

        self.key()?;
        self.value().map(|_| ())
    }
}
