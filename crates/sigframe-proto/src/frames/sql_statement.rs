//! One SQL statement with its bound parameters.
//!
//! Parameters are nested messages, each holding exactly one typed value. The
//! frame can be rendered back into a literal statement for engines that do
//! not take bound parameters.

use bytes::BytesMut;

use super::{ensure, exactly_one};
use crate::{
    FieldList, FrameKind, RawField,
    errors::{ProtocolError, Result},
    fields::missing,
};

/// One bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParameter {
    /// Text value
    Text(String),
    /// Integer, stored unsigned on the wire and rendered signed
    Integer(u64),
    /// IEEE-754 double (fixed64 on the wire)
    Double(f64),
    /// Opaque bytes
    Blob(Vec<u8>),
    /// SQL NULL
    Null,
}

impl SqlParameter {
    const FIELD_STRING: u8 = 1;
    const FIELD_INTEGER: u8 = 2;
    const FIELD_DOUBLE: u8 = 3;
    const FIELD_BLOB: u8 = 4;
    const FIELD_NULL: u8 = 5;

    fn to_field(&self) -> RawField {
        match self {
            Self::Text(s) => RawField::string(Self::FIELD_STRING, s),
            Self::Integer(i) => RawField::varint(Self::FIELD_INTEGER, *i),
            Self::Double(d) => RawField::double(Self::FIELD_DOUBLE, *d),
            Self::Blob(b) => RawField::bytes(Self::FIELD_BLOB, b.clone()),
            Self::Null => RawField::varint(Self::FIELD_NULL, 1),
        }
    }

    fn from_message(bytes: &[u8]) -> Result<Self> {
        let fields = FieldList::decode(bytes)?;
        let Some(field) = fields.iter().next() else {
            return Err(ProtocolError::ValidationFailed {
                kind: FrameKind::SqlStatement,
                reason: "empty statement parameter",
            });
        };

        match field.number() {
            Self::FIELD_STRING => Ok(Self::Text(field.as_str()?.to_owned())),
            Self::FIELD_INTEGER => Ok(Self::Integer(field.as_u64()?)),
            Self::FIELD_DOUBLE => Ok(Self::Double(field.as_f64()?)),
            Self::FIELD_BLOB => Ok(Self::Blob(field.as_bytes()?.to_vec())),
            Self::FIELD_NULL => Ok(Self::Null),
            _ => Err(ProtocolError::ValidationFailed {
                kind: FrameKind::SqlStatement,
                reason: "unknown statement parameter type",
            }),
        }
    }

    /// Render as a SQL literal.
    fn render(&self, out: &mut String) {
        match self {
            Self::Text(s) => {
                out.push('\'');
                out.push_str(&s.replace('\'', "''"));
                out.push('\'');
            },
            Self::Integer(i) => out.push_str(&(*i as i64).to_string()),
            Self::Double(d) if d.is_nan() => out.push_str("NULL"),
            Self::Double(d) if d.is_infinite() => {
                out.push_str(if d.is_sign_positive() { "9e999" } else { "-9e999" });
            },
            Self::Double(d) => out.push_str(&format!("{d:?}")),
            Self::Blob(b) => {
                out.push_str("X'");
                out.push_str(&hex::encode_upper(b));
                out.push('\'');
            },
            Self::Null => out.push_str("NULL"),
        }
    }
}

/// SQL statement frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlStatementFrame {
    fields: FieldList,
}

impl SqlStatementFrame {
    /// Statement text
    pub const FIELD_STATEMENT: u8 = 1;
    /// One bound parameter (repeated, nested message)
    pub const FIELD_PARAMETERS: u8 = 2;

    /// Statement without parameters.
    pub fn new(statement: &str) -> Self {
        let mut fields = FieldList::new();
        fields.push(RawField::string(Self::FIELD_STATEMENT, statement));
        Self { fields }
    }

    /// Statement with parameters bound in order.
    pub fn with_parameters(statement: &str, parameters: &[SqlParameter]) -> Self {
        let mut frame = Self::new(statement);
        for parameter in parameters {
            frame.bind(parameter);
        }
        frame
    }

    pub(crate) fn from_fields(fields: FieldList) -> Self {
        Self { fields }
    }

    /// Underlying fields.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Append one parameter.
    pub fn bind(&mut self, parameter: &SqlParameter) {
        let field = parameter.to_field();
        let mut message = BytesMut::with_capacity(field.encoded_len());
        field.encode(&mut message);
        self.fields.push(RawField::bytes(Self::FIELD_PARAMETERS, message.freeze()));
    }

    /// Statement text with `?` placeholders.
    pub fn statement(&self) -> Result<&str> {
        self.fields
            .str_field(Self::FIELD_STATEMENT)?
            .ok_or_else(|| missing(FrameKind::SqlStatement, Self::FIELD_STATEMENT))
    }

    /// Bound parameters, in placeholder order.
    pub fn parameters(&self) -> Result<Vec<SqlParameter>> {
        self.fields
            .fields_with(Self::FIELD_PARAMETERS)
            .map(|f| f.as_bytes().and_then(SqlParameter::from_message))
            .collect()
    }

    /// Substitute every `?` with its parameter rendered as a SQL literal.
    ///
    /// Text is single-quoted with embedded quotes doubled, blobs become
    /// `X'..'` hex literals, doubles use their shortest exact form.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::ParameterCountMismatch` if the number of `?` differs
    ///   from the number of parameters
    pub fn build_statement(&self) -> Result<String> {
        let statement = self.statement()?;
        let parameters = self.parameters()?;

        let placeholders = statement.matches('?').count();
        if placeholders != parameters.len() {
            return Err(ProtocolError::ParameterCountMismatch {
                placeholders,
                parameters: parameters.len(),
            });
        }

        let mut out = String::with_capacity(statement.len());
        let mut parameters = parameters.iter();
        for c in statement.chars() {
            if c != '?' {
                out.push(c);
            } else if let Some(parameter) = parameters.next() {
                parameter.render(&mut out);
            }
        }
        Ok(out)
    }

    /// Exactly one statement; only statement and parameter fields; every
    /// parameter decodes.
    pub fn validate(&self) -> Result<()> {
        let kind = FrameKind::SqlStatement;
        ensure(
            self.fields.only_contains(&[Self::FIELD_STATEMENT, Self::FIELD_PARAMETERS]),
            kind,
            "statement has unknown fields",
        )?;
        exactly_one(&self.fields, kind, Self::FIELD_STATEMENT, "needs exactly one statement")?;
        self.statement()?;
        self.parameters().map(|_| ())
    }
}
