//! Error types for recordkit.
//!
//! Three kinds of failure exist and callers handle each differently:
//!
//! - [`ShapeError`]: the record shape itself is unusable (raised once, when
//!   descriptors are extracted).
//! - [`ValidationError`]: a fresh build was attempted with required fields
//!   left unset. Recoverable; lists every missing field at once.
//! - [`UsageError`]: a runtime-shape builder was handed a field name or value
//!   that does not fit its schema. Typed builders make this unrepresentable.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

/// Reason recorded for a required field that was never assigned.
pub const REQUIRED_REASON: &str = "required but not set";

/// A `Result` alias defaulting to the umbrella [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while turning a record shape into field descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The record has no name.
    EmptyRecordName,
    /// A field name is not a valid identifier.
    InvalidFieldName { record: String, field: String },
    /// Two fields share a name.
    DuplicateField { record: String, field: String },
    /// More fields than the configured maximum.
    TooManyFields {
        record: String,
        count: usize,
        max: usize,
    },
    /// A generated builder method name is not an identifier, is used twice,
    /// or clashes with the builder's own methods.
    SetterConflict { record: String, method: String },
    /// A declared type the runtime-shape backend cannot store.
    UnsupportedType {
        record: String,
        field: String,
        ty: String,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::EmptyRecordName => write!(f, "record shape has an empty name"),
            ShapeError::InvalidFieldName { record, field } => {
                write!(f, "{}: `{}` is not a valid field name", record, field)
            }
            ShapeError::DuplicateField { record, field } => {
                write!(f, "{}: field `{}` is declared more than once", record, field)
            }
            ShapeError::TooManyFields { record, count, max } => write!(
                f,
                "{}: {} fields exceed the configured maximum of {}",
                record, count, max
            ),
            ShapeError::SetterConflict { record, method } => write!(
                f,
                "{}: builder method `{}` is not a usable method name",
                record, method
            ),
            ShapeError::UnsupportedType { record, field, ty } => write!(
                f,
                "{}: field `{}` has unsupported type `{}`",
                record, field, ty
            ),
        }
    }
}

impl StdError for ShapeError {}

/// What went wrong with a single field during a fresh build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The field is required and no value was assigned.
    Required,
}

/// A validation failure for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidationError {
    /// Field name as declared.
    pub field: String,
    /// Failure category.
    pub kind: ValidationErrorKind,
    /// Human-readable reason.
    pub message: String,
}

/// Aggregated validation failures of a fresh build.
///
/// Entries appear in field declaration order, and every violating field is
/// present, so one failure gives the caller the complete list to fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    record: String,
    errors: Vec<FieldValidationError>,
}

impl ValidationError {
    /// Create an empty error collector for `record`.
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            errors: Vec::new(),
        }
    }

    /// Record a required field that was not assigned.
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.errors.push(FieldValidationError {
            field: field.into(),
            kind: ValidationErrorKind::Required,
            message: REQUIRED_REASON.to_string(),
        });
    }

    /// Name of the record whose build failed.
    #[must_use]
    pub fn record(&self) -> &str {
        &self.record
    }

    /// True when no failures were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// All failures in declaration order.
    #[must_use]
    pub fn errors(&self) -> &[FieldValidationError] {
        &self.errors
    }

    /// Reason recorded for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Names of failing fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }

    /// The failures as a field name → reason mapping.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.errors
            .iter()
            .map(|e| (e.field.clone(), e.message.clone()))
            .collect()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error building {}, the following fields have errors:",
            self.record
        )?;
        for e in &self.errors {
            write!(f, "\n   {}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl StdError for ValidationError {}

/// Misuse of a runtime-shape builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// No field with this name exists on the record.
    UnknownField { record: String, field: String },
    /// The value does not have the field's declared type.
    TypeMismatch {
        record: String,
        field: String,
        expected: String,
        found: String,
    },
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::UnknownField { record, field } => {
                write!(f, "{} has no field `{}`", record, field)
            }
            UsageError::TypeMismatch {
                record,
                field,
                expected,
                found,
            } => write!(
                f,
                "{}.{}: expected a value of type {}, found {}",
                record, field, expected, found
            ),
        }
    }
}

impl StdError for UsageError {}

/// Umbrella error for recordkit operations.
#[derive(Debug)]
pub enum Error {
    /// The record shape is invalid.
    Shape(ShapeError),
    /// A fresh build was missing required fields.
    Validation(ValidationError),
    /// A builder was used against its schema.
    Usage(UsageError),
    /// A shape description could not be parsed.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Shape(err) => write!(f, "shape error: {}", err),
            Error::Validation(err) => write!(f, "validation error: {}", err),
            Error::Usage(err) => write!(f, "usage error: {}", err),
            Error::Json(err) => write!(f, "invalid shape description: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Shape(err) => Some(err),
            Error::Validation(err) => Some(err),
            Error::Usage(err) => Some(err),
            Error::Json(err) => Some(err),
        }
    }
}

impl From<ShapeError> for Error {
    fn from(err: ShapeError) -> Self {
        Error::Shape(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<UsageError> for Error {
    fn from(err: UsageError) -> Self {
        Error::Usage(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
