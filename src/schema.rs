use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

pub const DEFAULT_VARCHAR_SIZE: i64 = 255;
pub const DEFAULT_INT_SIZE: i64 = 11;

#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, EnumString, EnumIter, Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FieldType {
    Int,
    Varchar,
    Text,
    Date,
    Datetime,
    Boolean,
    Float,
}

impl FieldType {
    pub fn default_size(&self) -> Option<i64> {
        match self {
            FieldType::Varchar => Some(DEFAULT_VARCHAR_SIZE),
            FieldType::Int => Some(DEFAULT_INT_SIZE),
            _ => None,
        }
    }
}

/// A column definition as submitted by a client, before normalization.
///
/// Everything except `name` is loosely typed: sizes may arrive as numbers or
/// numeric strings and the flags follow JSON truthiness.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RawField {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub size: Value,
    #[serde(default)]
    pub primary: Value,
    #[serde(default)]
    pub nullable: Value,
}

impl RawField {
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: Some(field_type.to_string()),
            ..Default::default()
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// A normalized column definition, as persisted in a table document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub size: Option<i64>,
    pub primary: bool,
    pub nullable: bool,
    pub default: Option<Value>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Field #{position} has an empty name")]
    EmptyName { position: usize },

    #[error("Field {name:?} has no type")]
    MissingType { name: String },

    #[error("Field {name:?} has unsupported type {field_type:?} (expected one of {expected})")]
    UnsupportedType {
        name: String,
        field_type: String,
        expected: String,
    },
}

// JavaScript-style truthiness, which is how clients have always sent these flags
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// Integer parsing with `parseInt` semantics: leading sign and digits, rest ignored
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            let parsed = digits[..end].parse::<i64>().ok()?;
            Some(if negative { -parsed } else { parsed })
        }
        _ => None,
    }
}

fn parse_field_type(name: &str, raw: Option<&str>) -> Result<FieldType, SchemaError> {
    let raw = raw.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
        SchemaError::MissingType {
            name: name.to_string(),
        }
    })?;

    raw.parse::<FieldType>()
        .map_err(|_| SchemaError::UnsupportedType {
            name: name.to_string(),
            field_type: raw.to_string(),
            expected: FieldType::iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

pub fn validate_field(position: usize, raw: &RawField) -> Result<Field, SchemaError> {
    let name = raw.name.trim();
    if name.is_empty() {
        return Err(SchemaError::EmptyName { position });
    }

    let field_type = parse_field_type(name, raw.field_type.as_deref())?;

    let size = if is_truthy(&raw.size) {
        parse_integer(&raw.size)
    } else {
        field_type.default_size()
    };

    Ok(Field {
        name: name.to_string(),
        field_type,
        size,
        primary: is_truthy(&raw.primary),
        nullable: is_truthy(&raw.nullable),
        default: None,
    })
}

/// Normalize a list of raw field descriptors, preserving their order.
///
/// An empty list is not an error here: callers decide whether a table
/// without columns makes sense.
pub fn validate_fields(raw_fields: &[RawField]) -> Result<Vec<Field>, SchemaError> {
    raw_fields
        .iter()
        .enumerate()
        .map(|(position, raw)| validate_field(position, raw))
        .collect()
}
