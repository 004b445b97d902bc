//! Generic settings fields.
//!
//! Indexers, download clients, notifications and import lists keep their
//! implementation specific settings in a list of `{name, value}` pairs.
//! The `write_*` helpers turn typed values into fields (unset values produce
//! no field), the `read_*` helpers turn fields back into typed values.
//!
//! Resources describe their settings with a static table of [`FieldSpec`]
//! rows and use [`settings_to_fields`] / [`fields_to_settings`] to move
//! between provider state and the API representation.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::client::models::Field;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType};

/// Placeholder the API returns instead of secret values.
pub const MASKED_VALUE: &str = "********";

/// Write a string field. Empty strings are treated as unset.
pub fn write_string_field(name: &str, value: Option<&str>) -> Option<Field> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| Field::new(name, Value::String(v.to_string())))
}

/// Write a boolean field.
pub fn write_bool_field(name: &str, value: Option<bool>) -> Option<Field> {
    value.map(|v| Field::new(name, Value::Bool(v)))
}

/// Write an integer field.
pub fn write_int_field(name: &str, value: Option<i64>) -> Option<Field> {
    value.map(|v| Field::new(name, Value::from(v)))
}

/// Write a float field. Non-finite values cannot be represented and are
/// dropped.
pub fn write_float_field(name: &str, value: Option<f64>) -> Option<Field> {
    value
        .and_then(serde_json::Number::from_f64)
        .map(|n| Field::new(name, Value::Number(n)))
}

/// Write a list of strings.
pub fn write_string_slice_field(name: &str, value: Option<&[String]>) -> Option<Field> {
    value.map(|v| Field::new(name, Value::from(v.to_vec())))
}

/// Write a list of integers.
pub fn write_int_slice_field(name: &str, value: Option<&[i64]>) -> Option<Field> {
    value.map(|v| Field::new(name, Value::from(v.to_vec())))
}

/// Read a string field. Empty strings read back as unset.
pub fn read_string_field(field: &Field) -> Option<String> {
    match field.value.as_ref()? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a boolean field.
pub fn read_bool_field(field: &Field) -> Option<bool> {
    field.value.as_ref()?.as_bool()
}

/// Read an integer field. Integral floats (`3.0`) are accepted.
pub fn read_int_field(field: &Field) -> Option<i64> {
    let value = field.value.as_ref()?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Read a float field.
pub fn read_float_field(field: &Field) -> Option<f64> {
    field.value.as_ref()?.as_f64()
}

/// Read a list of strings. A list holding anything but strings reads as
/// unset.
pub fn read_string_slice_field(field: &Field) -> Option<Vec<String>> {
    let items = field.value.as_ref()?.as_array()?;
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Read a list of integers. A list holding anything but integers reads as
/// unset.
pub fn read_int_slice_field(field: &Field) -> Option<Vec<i64>> {
    let items = field.value.as_ref()?.as_array()?;
    items.iter().map(Value::as_i64).collect()
}

/// Value kind of a settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Text.
    String,
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Floating point number.
    Float,
    /// Set of strings.
    StringSet,
    /// Set of integers.
    IntSet,
}

impl FieldKind {
    fn attribute_type(self) -> AttributeType {
        match self {
            Self::String => AttributeType::String,
            Self::Bool => AttributeType::Bool,
            Self::Int => AttributeType::Int64,
            Self::Float => AttributeType::Float64,
            Self::StringSet => AttributeType::set(AttributeType::String),
            Self::IntSet => AttributeType::set(AttributeType::Int64),
        }
    }
}

/// Maps one state attribute to one API field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Attribute name in provider state.
    pub attribute: &'static str,
    /// Field name in the API.
    pub field: &'static str,
    /// Value kind.
    pub kind: FieldKind,
    /// Whether the API masks the value on read.
    pub sensitive: bool,
}

impl FieldSpec {
    const fn new(attribute: &'static str, field: &'static str, kind: FieldKind) -> Self {
        Self {
            attribute,
            field,
            kind,
            sensitive: false,
        }
    }

    /// A string setting.
    pub const fn string(attribute: &'static str, field: &'static str) -> Self {
        Self::new(attribute, field, FieldKind::String)
    }

    /// A boolean setting.
    pub const fn bool(attribute: &'static str, field: &'static str) -> Self {
        Self::new(attribute, field, FieldKind::Bool)
    }

    /// An integer setting.
    pub const fn int(attribute: &'static str, field: &'static str) -> Self {
        Self::new(attribute, field, FieldKind::Int)
    }

    /// A float setting.
    pub const fn float(attribute: &'static str, field: &'static str) -> Self {
        Self::new(attribute, field, FieldKind::Float)
    }

    /// A string set setting.
    pub const fn string_set(attribute: &'static str, field: &'static str) -> Self {
        Self::new(attribute, field, FieldKind::StringSet)
    }

    /// An integer set setting.
    pub const fn int_set(attribute: &'static str, field: &'static str) -> Self {
        Self::new(attribute, field, FieldKind::IntSet)
    }

    /// A secret string setting.
    pub const fn secret(attribute: &'static str, field: &'static str) -> Self {
        Self {
            sensitive: true,
            ..Self::new(attribute, field, FieldKind::String)
        }
    }

    fn write(&self, value: &Value) -> Result<Option<Field>, ProviderError> {
        if value.is_null() {
            return Ok(None);
        }
        let mismatch = || {
            ProviderError::Validation(format!(
                "attribute '{}' has the wrong type for a {:?} setting",
                self.attribute, self.kind
            ))
        };

        let field = match self.kind {
            FieldKind::String => {
                write_string_field(self.field, Some(value.as_str().ok_or_else(mismatch)?))
            },
            FieldKind::Bool => {
                write_bool_field(self.field, Some(value.as_bool().ok_or_else(mismatch)?))
            },
            FieldKind::Int => {
                write_int_field(self.field, Some(value.as_i64().ok_or_else(mismatch)?))
            },
            FieldKind::Float => {
                write_float_field(self.field, Some(value.as_f64().ok_or_else(mismatch)?))
            },
            FieldKind::StringSet => {
                let items: Vec<String> =
                    serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
                write_string_slice_field(self.field, Some(&items))
            },
            FieldKind::IntSet => {
                let items: Vec<i64> =
                    serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
                write_int_slice_field(self.field, Some(&items))
            },
        };
        Ok(field)
    }

    fn read(&self, field: &Field) -> Value {
        let value = match self.kind {
            FieldKind::String => read_string_field(field).map(Value::String),
            FieldKind::Bool => read_bool_field(field).map(Value::Bool),
            FieldKind::Int => read_int_field(field).map(Value::from),
            FieldKind::Float => read_float_field(field).map(Value::from),
            FieldKind::StringSet => read_string_slice_field(field).map(Value::from),
            FieldKind::IntSet => read_int_slice_field(field).map(Value::from),
        };

        let unreadable = match field.value.as_ref() {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty() && value.is_none(),
            Some(_) => value.is_none(),
        };
        if unreadable {
            warn!(
                setting = self.field,
                kind = ?self.kind,
                "setting returned by Whisparr has an unexpected type, reading it as null"
            );
        }
        value.unwrap_or(Value::Null)
    }
}

/// Schema attributes for a settings table. Every setting is optional and
/// may be filled in by the server.
pub fn settings_attributes(specs: &[FieldSpec]) -> BTreeMap<String, Attribute> {
    specs
        .iter()
        .map(|spec| {
            let mut attr = Attribute::optional_computed(spec.kind.attribute_type());
            if spec.sensitive {
                attr = attr.sensitive();
            }
            (spec.attribute.to_string(), attr)
        })
        .collect()
}

/// Pack the settings attributes found in `state` into API fields.
pub fn settings_to_fields(
    state: &Map<String, Value>,
    specs: &[FieldSpec],
) -> Result<Vec<Field>, ProviderError> {
    let mut fields = Vec::new();
    for spec in specs {
        if let Some(value) = state.get(spec.attribute) {
            fields.extend(spec.write(value)?);
        }
    }
    Ok(fields)
}

/// Unpack API fields into settings attributes. Every attribute of `specs`
/// is present in the result, null when the API did not return it.
///
/// Masked secrets keep the value from `prior`, so a read never replaces a
/// known secret with the placeholder.
pub fn fields_to_settings(
    fields: &[Field],
    specs: &[FieldSpec],
    prior: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    specs
        .iter()
        .map(|spec| {
            let field = fields.iter().find(|f| f.name == spec.field);
            let masked = spec.sensitive
                && field.is_some_and(|f| {
                    f.value.as_ref().and_then(Value::as_str) == Some(MASKED_VALUE)
                });

            let value = if masked {
                prior
                    .and_then(|p| p.get(spec.attribute))
                    .cloned()
                    .unwrap_or(Value::Null)
            } else {
                field.map(|f| spec.read(f)).unwrap_or(Value::Null)
            };
            (spec.attribute.to_string(), value)
        })
        .collect()
}
