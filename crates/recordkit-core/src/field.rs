//! Record shapes, field descriptors and descriptor extraction.
//!
//! A [`RecordShape`] is the declarative input: a record name plus its field
//! declarations in source order. [`extract`] turns it into [`Descriptors`],
//! the ordered, ordinal-numbered view every builder is generated from. The
//! ordinal of a descriptor is its bit in the builder's assigned-field set, and
//! descriptor order is the order used for validation messages and for the
//! derived-build comparison.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExtractOptions;
use crate::error::{Result, ShapeError};

/// One field as declared on a record shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Declared type, as written.
    #[serde(rename = "type")]
    pub ty: String,
    /// Whether a fresh build must assign this field.
    #[serde(default)]
    pub required: bool,
    /// Class-level fields are not part of instance state and are skipped.
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

impl FieldDecl {
    /// Declare an optional instance field.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            required: false,
            is_static: false,
        }
    }

    /// Mark as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as static (excluded from extraction).
    #[must_use]
    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }
}

/// A data-class shape: the record name and its fields in declaration order.
///
/// # Example
///
/// ```
/// use recordkit_core::field::RecordShape;
///
/// let shape = RecordShape::new("Dog")
///     .required_field("name", "string")
///     .field("breed", "string");
/// assert_eq!(shape.fields.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordShape {
    /// Record (type) name.
    pub name: String,
    /// Field declarations in source order.
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl RecordShape {
    /// Create a shape with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Parse a shape from its JSON description.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Append a field declaration.
    #[must_use]
    pub fn push(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    /// Append an optional field.
    #[must_use]
    pub fn field(self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.push(FieldDecl::new(name, ty))
    }

    /// Append a required field.
    #[must_use]
    pub fn required_field(self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.push(FieldDecl::new(name, ty).required())
    }

    /// Append a static field.
    #[must_use]
    pub fn static_field(self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.push(FieldDecl::new(name, ty).static_field())
    }
}

/// Extracted metadata about one builder field.
///
/// Derived records embed these as `'static` tables, which is why the
/// constructor is `const` and the strings are `Cow`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldDescriptor {
    /// Field name, unique within the record.
    pub name: Cow<'static, str>,
    /// Declared type.
    pub ty: Cow<'static, str>,
    /// Whether a fresh build must assign this field.
    pub required: bool,
    /// Position among the extracted fields; also the assigned-set bit.
    pub ordinal: usize,
}

impl FieldDescriptor {
    /// Create a descriptor from static strings.
    pub const fn new(name: &'static str, ty: &'static str, required: bool, ordinal: usize) -> Self {
        Self {
            name: Cow::Borrowed(name),
            ty: Cow::Borrowed(ty),
            required,
            ordinal,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub fn ty(&self) -> &str {
        &self.ty
    }
}

/// The ordered descriptor list of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptors {
    record: String,
    fields: Vec<FieldDescriptor>,
}

impl Descriptors {
    /// Record name.
    #[must_use]
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Descriptors in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no builder fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a descriptor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Ordinal of the named field.
    #[must_use]
    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.get(name).map(|f| f.ordinal)
    }

    /// Required descriptors in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }
}

fn ident_regex() -> Option<&'static Regex> {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[\p{XID_Start}_]\p{XID_Continue}*$").ok())
        .as_ref()
}

/// Check that `name` can be used as a field (and setter) identifier.
///
/// Follows Rust's identifier grammar, so non-ASCII names are accepted.
#[must_use]
pub fn is_valid_field_name(name: &str) -> bool {
    ident_regex().is_some_and(|re| re.is_match(name))
}

/// Extract the ordered descriptor list of `shape`.
///
/// Static fields are dropped, the remaining fields keep declaration order and
/// receive dense ordinals starting at zero.
///
/// # Errors
///
/// Returns a [`ShapeError`] for an empty record name, a field name that is not
/// an identifier, a duplicated field name, or more fields than
/// `options.max_fields`.
pub fn extract(
    shape: &RecordShape,
    options: &ExtractOptions,
) -> std::result::Result<Descriptors, ShapeError> {
    if shape.name.trim().is_empty() {
        return Err(ShapeError::EmptyRecordName);
    }

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(shape.fields.len());

    for decl in shape.fields.iter().filter(|d| !d.is_static) {
        if !is_valid_field_name(&decl.name) {
            return Err(ShapeError::InvalidFieldName {
                record: shape.name.clone(),
                field: decl.name.clone(),
            });
        }
        if !seen.insert(decl.name.as_str()) {
            return Err(ShapeError::DuplicateField {
                record: shape.name.clone(),
                field: decl.name.clone(),
            });
        }
        fields.push(FieldDescriptor {
            name: Cow::Owned(decl.name.clone()),
            ty: Cow::Owned(decl.ty.clone()),
            required: decl.required,
            ordinal: fields.len(),
        });
    }

    if let Some(max) = options.max_fields {
        if fields.len() > max {
            return Err(ShapeError::TooManyFields {
                record: shape.name.clone(),
                count: fields.len(),
                max,
            });
        }
    }

    tracing::debug!(
        record = %shape.name,
        fields = fields.len(),
        skipped = shape.fields.len() - fields.len(),
        "Extracted field descriptors"
    );

    Ok(Descriptors {
        record: shape.name.clone(),
        fields,
    })
}

/// Process-wide memo of extracted descriptors.
///
/// Extraction is a pure function of the shape and options, so results are
/// shared for the lifetime of the program. Failures are not cached.
///
/// Entries are never evicted: every distinct shape stays resident.
struct DescriptorCache {
    cache: RwLock<HashMap<(RecordShape, ExtractOptions), Arc<Descriptors>>>,
}

impl DescriptorCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_extract(
        &self,
        shape: &RecordShape,
        options: &ExtractOptions,
    ) -> std::result::Result<Arc<Descriptors>, ShapeError> {
        let key = (shape.clone(), options.clone());

        // Fast path: already extracted
        {
            let cache = self.cache.read().unwrap_or_else(|poisoned| {
                tracing::warn!("Descriptor cache lock poisoned, recovering");
                PoisonError::into_inner(poisoned)
            });
            if let Some(found) = cache.get(&key) {
                tracing::trace!(record = %shape.name, "Descriptor cache hit");
                return Ok(Arc::clone(found));
            }
        }

        let descriptors = Arc::new(extract(shape, options)?);
        {
            let mut cache = self
                .cache
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            cache.entry(key).or_insert_with(|| Arc::clone(&descriptors));
        }
        Ok(descriptors)
    }
}

fn descriptor_cache() -> &'static DescriptorCache {
    static CACHE: OnceLock<DescriptorCache> = OnceLock::new();
    CACHE.get_or_init(DescriptorCache::new)
}

/// Like [`extract`], but memoized per (shape, options) for the whole process.
///
/// The memo only grows. Shapes that are built once (for example parsed from
/// untrusted JSON) should go through [`extract`] instead.
pub fn extract_cached(
    shape: &RecordShape,
    options: &ExtractOptions,
) -> std::result::Result<Arc<Descriptors>, ShapeError> {
    descriptor_cache().get_or_extract(shape, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dog() -> RecordShape {
        RecordShape::new("Dog")
            .required_field("name", "String")
            .static_field("KINGDOM", "String")
            .field("breed", "String")
    }

    #[test]
    fn test_extract_preserves_order_and_skips_static() {
        let descriptors = extract(&dog(), &ExtractOptions::default()).unwrap();
        assert_eq!(descriptors.record(), "Dog");
        assert_eq!(descriptors.len(), 2);

        let names: Vec<_> = descriptors.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["name", "breed"]);
        assert_eq!(descriptors.ordinal_of("breed"), Some(1));
        assert_eq!(descriptors.ordinal_of("KINGDOM"), None);

        let required: Vec<_> = descriptors.required().map(|f| f.name()).collect();
        assert_eq!(required, vec!["name"]);
        assert_eq!(descriptors.get("breed").unwrap().ty(), "String");
    }

    #[test]
    fn test_duplicate_field_is_shape_error() {
        let shape = RecordShape::new("Dog")
            .field("name", "String")
            .field("name", "String");
        let err = extract(&shape, &ExtractOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ShapeError::DuplicateField {
                record: "Dog".to_string(),
                field: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_static_duplicate_is_ignored() {
        let shape = RecordShape::new("Dog")
            .field("name", "String")
            .static_field("name", "String");
        assert!(extract(&shape, &ExtractOptions::default()).is_ok());
    }

    #[test]
    fn test_max_fields_is_enforced() {
        let options = ExtractOptions::new().max_fields(1);
        let err = extract(&dog(), &options).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::TooManyFields { count: 2, max: 1, .. }
        ));

        let options = ExtractOptions::new().max_fields(2);
        assert!(extract(&dog(), &options).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            extract(&RecordShape::new("  "), &ExtractOptions::default()),
            Err(ShapeError::EmptyRecordName)
        ));

        let shape = RecordShape::new("Dog").field("first name", "String");
        assert!(matches!(
            extract(&shape, &ExtractOptions::default()),
            Err(ShapeError::InvalidFieldName { .. })
        ));

        assert!(is_valid_field_name("_private"));
        assert!(is_valid_field_name("FirstName"));
        assert!(!is_valid_field_name("1st"));
        assert!(!is_valid_field_name(""));
    }

    #[test]
    fn test_unicode_names_follow_rust_identifiers() {
        assert!(is_valid_field_name("café"));
        assert!(is_valid_field_name("größe"));
        assert!(!is_valid_field_name("café-au-lait"));
        assert!(!is_valid_field_name("\u{0301}e"));

        let shape = RecordShape::new("Café").required_field("crème", "String");
        let descriptors = extract(&shape, &ExtractOptions::default()).unwrap();
        assert_eq!(descriptors.ordinal_of("crème"), Some(0));
    }

    #[test]
    fn test_shape_from_json() {
        let shape = RecordShape::from_json(
            r#"{
                "name": "Person",
                "fields": [
                    {"name": "first_name", "type": "string", "required": true},
                    {"name": "nickname", "type": "string?"},
                    {"name": "SPECIES", "type": "string", "static": true}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(shape.name, "Person");
        assert!(shape.fields[0].required);
        assert!(!shape.fields[1].required);
        assert!(shape.fields[2].is_static);

        assert!(RecordShape::from_json("{").is_err());
    }

    #[test]
    fn test_extract_cached_shares_result() {
        let shape = RecordShape::new("CachedDog").required_field("name", "String");
        let first = extract_cached(&shape, &ExtractOptions::default()).unwrap();
        let second = extract_cached(&shape, &ExtractOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let limited = ExtractOptions::new().max_fields(0);
        assert!(extract_cached(&shape, &limited).is_err());
    }

    #[test]
    fn test_const_descriptor() {
        const NAME: FieldDescriptor = FieldDescriptor::new("name", "String", true, 0);
        assert_eq!(NAME.name(), "name");
        assert!(NAME.required);
    }
}
