use super::ensure;
use crate::{FieldList, FrameKind, RawField, errors::Result};

/// One entry of an Android shared-preferences file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedPrefFrame {
    fields: FieldList,
}

impl SharedPrefFrame {
    /// Preferences file name
    pub const FIELD_FILE: u8 = 1;
    /// Preference key
    pub const FIELD_KEY: u8 = 2;
    /// String value
    pub const FIELD_VALUE: u8 = 3;
    /// Boolean value
    pub const FIELD_BOOLEAN_VALUE: u8 = 4;
    /// Marks a string-set value (possibly empty)
    pub const FIELD_IS_STRING_SET_VALUE: u8 = 5;
    /// One member of a string-set value (repeated)
    pub const FIELD_STRING_SET_VALUE: u8 = 6;

    const ALLOWED: [u8; 6] = [
        Self::FIELD_FILE,
        Self::FIELD_KEY,
        Self::FIELD_VALUE,
        Self::FIELD_BOOLEAN_VALUE,
        Self::FIELD_IS_STRING_SET_VALUE,
        Self::FIELD_STRING_SET_VALUE,
    ];

    /// Entry with a string value.
    pub fn new(file: &str, key: &str, value: &str) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::string(Self::FIELD_FILE, file));
        fields.push(RawField::string(Self::FIELD_KEY, key));
        fields.push(RawField::string(Self::FIELD_VALUE, value));
        Self { fields }
    }

    /// Entry with a boolean value.
    pub fn new_bool(file: &str, key: &str, value: bool) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::string(Self::FIELD_FILE, file));
        fields.push(RawField::string(Self::FIELD_KEY, key));
        fields.push(RawField::varint(Self::FIELD_BOOLEAN_VALUE, u64::from(value)));
        Self { fields }
    }

    pub(crate) fn from_fields(fields: FieldList) -> Self {
        Self { fields }
    }

    /// Underlying fields.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Preferences file name.
    pub fn file(&self) -> Result<Option<&str>> {
        self.fields.str_field(Self::FIELD_FILE)
    }

    /// Preference key.
    pub fn key(&self) -> Result<Option<&str>> {
        self.fields.str_field(Self::FIELD_KEY)
    }

    /// String value.
    pub fn value(&self) -> Result<Option<&str>> {
        self.fields.str_field(Self::FIELD_VALUE)
    }

    /// Boolean value.
    pub fn bool_value(&self) -> Result<Option<bool>> {
        self.fields.get_field(Self::FIELD_BOOLEAN_VALUE).map(RawField::as_bool).transpose()
    }

    /// String-set members, in order. `None` unless the entry is a set.
    pub fn string_set(&self) -> Result<Option<Vec<&str>>> {
        let is_set = match self.fields.get_field(Self::FIELD_IS_STRING_SET_VALUE) {
            Some(field) => field.as_bool()?,
            None => false,
        };
        if !is_set {
            return Ok(None);
        }

        self.fields
            .fields_with(Self::FIELD_STRING_SET_VALUE)
            .map(RawField::as_str)
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Non-empty, preference fields only.
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::SharedPreference;
        ensure(!self.fields.is_empty(), kind, "preference has no fields")?;
        ensure(self.fields.only_contains(&Self::ALLOWED), kind, "preference has unknown fields")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_entry() {
        let frame = SharedPrefFrame::new("prefs", "theme", "dark");
        assert_eq!(frame.file(), Ok(Some("prefs")));
        assert_eq!(frame.key(), Ok(Some("theme")));
        assert_eq!(frame.value(), Ok(Some("dark")));
        assert_eq!(frame.string_set(), Ok(None));
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn string_set_entry() {
        let mut fields = FieldList::new();
        fields.push(RawField::string(SharedPrefFrame::FIELD_KEY, "k"));
        fields.push(RawField::varint(SharedPrefFrame::FIELD_IS_STRING_SET_VALUE, 1));
        fields.push(RawField::string(SharedPrefFrame::FIELD_STRING_SET_VALUE, "a"));
        fields.push(RawField::string(SharedPrefFrame::FIELD_STRING_SET_VALUE, "b"));
        let frame = SharedPrefFrame::from_fields(fields);

        assert_eq!(frame.string_set(), Ok(Some(vec!["a", "b"])));
    }

    #[test]
    fn bool_entry_and_empty_frame() {
        let frame = SharedPrefFrame::new_bool("prefs", "enabled", true);
        assert_eq!(frame.bool_value(), Ok(Some(true)));
        assert!(SharedPrefFrame::default().validate().is_err());
    }
}
