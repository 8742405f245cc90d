//! Dynamically typed field values for runtime-shape records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage type of a runtime-shape field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

impl ValueType {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Text => "text",
            ValueType::Bytes => "bytes",
        }
    }

    /// Default value of this type.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Text => Value::Text(String::new()),
            ValueType::Bytes => Value::Bytes(Vec::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared field type: storage type plus nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub value_type: ValueType,
    pub nullable: bool,
}

impl FieldType {
    /// Parse a declared type name (case-insensitive).
    ///
    /// A trailing `?` or an `Option<..>` wrapper marks the field nullable.
    /// Returns `None` for unsupported names.
    ///
    /// ```
    /// use recordkit_core::value::{FieldType, ValueType};
    ///
    /// let ty = FieldType::parse("Option<String>").unwrap();
    /// assert_eq!(ty.value_type, ValueType::Text);
    /// assert!(ty.nullable);
    /// ```
    #[must_use]
    pub fn parse(declared: &str) -> Option<Self> {
        let trimmed = declared.trim();
        let (inner, nullable) = if let Some(inner) = trimmed.strip_suffix('?') {
            (inner.trim(), true)
        } else if let Some(inner) = trimmed
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            (inner.trim(), true)
        } else {
            (trimmed, false)
        };

        let value_type = match inner.to_lowercase().as_str() {
            "bool" | "boolean" => ValueType::Bool,
            "int" | "integer" | "i64" | "long" => ValueType::Int,
            "float" | "double" | "f64" => ValueType::Float,
            "string" | "text" | "str" => ValueType::Text,
            "bytes" | "blob" | "vec<u8>" => ValueType::Bytes,
            _ => return None,
        };
        Some(Self {
            value_type,
            nullable,
        })
    }

    /// Default value of the field: `Null` when nullable, else the type default.
    #[must_use]
    pub fn default_value(self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            self.value_type.default_value()
        }
    }

    /// Whether `value` may be stored in a field of this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match value.value_type() {
            None => self.nullable,
            Some(ty) => ty == self.value_type,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.value_type)
        } else {
            write!(f, "{}", self.value_type)
        }
    }
}

/// A dynamically typed field value.
///
/// Equality is structural; floats compare with IEEE semantics, so a `NaN`
/// never equals the value it replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Storage type, `None` for `Null`.
    #[must_use]
    pub const fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Text(_) => Some(ValueType::Text),
            Value::Bytes(_) => Some(ValueType::Bytes),
        }
    }

    /// Name of the value's type for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self.value_type() {
            Some(ty) => ty.as_str(),
            None => "null",
        }
    }

    /// True for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow as `&str` if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if any.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean value, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value, if any.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
