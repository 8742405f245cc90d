//! Records whose shape is only known at runtime.
//!
//! `DynamicSchema` is built from a [`RecordShape`] (for example one loaded
//! from JSON) and drives [`DynamicBuilder`], which follows the same fresh and
//! derived build rules as the builders generated by `#[derive(Record)]`.
//! Field access goes through names, so unknown fields and ill-typed values are
//! reported as [`UsageError`]s instead of being ruled out at compile time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recordkit_core::config::SynthOptions;
//! use recordkit_core::dynamic::{DynamicBuilder, DynamicSchema};
//! use recordkit_core::field::RecordShape;
//!
//! let shape = RecordShape::new("Dog")
//!     .required_field("name", "string")
//!     .field("breed", "string");
//! let schema = DynamicSchema::new(&shape, &SynthOptions::default()).unwrap();
//!
//! let dog = DynamicBuilder::fresh(&schema)
//!     .with_field("name", "Drake").unwrap()
//!     .with_field("breed", "Husky").unwrap()
//!     .build()
//!     .unwrap();
//!
//! let same = DynamicBuilder::derived(Arc::clone(&dog))
//!     .with_field("name", "Drake").unwrap()
//!     .build()
//!     .unwrap();
//! assert!(Arc::ptr_eq(&dog, &same));
//! ```

use std::sync::Arc;

use crate::builder::BuildState;
use crate::config::SynthOptions;
use crate::error::{Result, ShapeError, UsageError, ValidationError};
use crate::field::{Descriptors, FieldDescriptor, RecordShape, extract, extract_cached};
use crate::synth::{SynthesizedType, synthesize};
use crate::value::{FieldType, Value};

/// Descriptors, synthesized builder description and field types of a
/// runtime-shape record.
#[derive(Debug)]
pub struct DynamicSchema {
    descriptors: Arc<Descriptors>,
    synthesized: SynthesizedType,
    types: Vec<FieldType>,
}

impl DynamicSchema {
    /// Build a schema from a shape.
    ///
    /// Descriptors go through the process-wide memo of [`extract_cached`],
    /// which is never evicted. Use [`Self::new_uncached`] for shapes that are
    /// only seen once.
    ///
    /// # Errors
    ///
    /// Returns a shape error if extraction or synthesis fails, or a field's
    /// declared type has no runtime representation.
    pub fn new(shape: &RecordShape, options: &SynthOptions) -> Result<Arc<Self>> {
        let descriptors = extract_cached(shape, &options.extract)?;
        Self::with_descriptors(descriptors, options)
    }

    /// Like [`Self::new`], but extracts with [`extract`] and leaves the
    /// descriptor memo untouched.
    pub fn new_uncached(shape: &RecordShape, options: &SynthOptions) -> Result<Arc<Self>> {
        let descriptors = Arc::new(extract(shape, &options.extract)?);
        Self::with_descriptors(descriptors, options)
    }

    fn with_descriptors(
        descriptors: Arc<Descriptors>,
        options: &SynthOptions,
    ) -> Result<Arc<Self>> {
        let synthesized = synthesize(&descriptors, options)?;

        let types = descriptors
            .fields()
            .iter()
            .map(|f| {
                FieldType::parse(f.ty()).ok_or_else(|| ShapeError::UnsupportedType {
                    record: descriptors.record().to_string(),
                    field: f.name().to_string(),
                    ty: f.ty().to_string(),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!(
            record = descriptors.record(),
            builder = %synthesized.builder,
            fields = descriptors.len(),
            "Created dynamic schema"
        );

        Ok(Arc::new(Self {
            descriptors,
            synthesized,
            types,
        }))
    }

    /// Build a schema from a JSON shape description.
    pub fn from_json(json: &str, options: &SynthOptions) -> Result<Arc<Self>> {
        Self::new(&RecordShape::from_json(json)?, options)
    }

    /// Record name.
    #[must_use]
    pub fn record(&self) -> &str {
        self.descriptors.record()
    }

    /// Field descriptors in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.descriptors.fields()
    }

    /// The synthesized builder description.
    #[must_use]
    pub fn synthesized(&self) -> &SynthesizedType {
        &self.synthesized
    }

    /// Parsed type of the field at `ordinal`.
    #[must_use]
    pub fn field_type(&self, ordinal: usize) -> Option<FieldType> {
        self.types.get(ordinal).copied()
    }

    fn unknown(&self, field: &str) -> UsageError {
        UsageError::UnknownField {
            record: self.record().to_string(),
            field: field.to_string(),
        }
    }
}

/// An immutable runtime-shape record.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    schema: Arc<DynamicSchema>,
    values: Vec<Value>,
}

impl PartialEq for DynamicSchema {
    fn eq(&self, other: &Self) -> bool {
        self.descriptors == other.descriptors
    }
}

impl DynamicRecord {
    /// The record's schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<DynamicSchema> {
        &self.schema
    }

    /// Value of the named field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema
            .descriptors
            .ordinal_of(field)
            .and_then(|idx| self.values.get(idx))
    }

    /// Values in declaration order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Field name/value pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .map(FieldDescriptor::name)
            .zip(self.values.iter())
    }

    /// Render as a JSON object keyed by field name.
    pub fn to_json(&self) -> std::result::Result<serde_json::Value, serde_json::Error> {
        let mut map = serde_json::Map::with_capacity(self.values.len());
        for (name, value) in self.iter() {
            map.insert(name.to_string(), serde_json::to_value(value)?);
        }
        Ok(serde_json::Value::Object(map))
    }
}

/// Builder for [`DynamicRecord`]s.
#[derive(Debug, Clone)]
pub struct DynamicBuilder {
    schema: Arc<DynamicSchema>,
    state: BuildState<DynamicRecord>,
    values: Vec<Option<Value>>,
}

impl DynamicBuilder {
    /// A builder with no origin.
    #[must_use]
    pub fn fresh(schema: &Arc<DynamicSchema>) -> Self {
        let len = schema.fields().len();
        Self {
            schema: Arc::clone(schema),
            state: BuildState::fresh(len),
            values: vec![None; len],
        }
    }

    /// A builder deriving from `origin`.
    #[must_use]
    pub fn derived(origin: Arc<DynamicRecord>) -> Self {
        let schema = Arc::clone(&origin.schema);
        let len = schema.fields().len();
        Self {
            schema,
            state: BuildState::derived(origin, len),
            values: vec![None; len],
        }
    }

    /// Assign a field, overwriting any previous assignment.
    ///
    /// # Errors
    ///
    /// [`UsageError::UnknownField`] if the record has no such field,
    /// [`UsageError::TypeMismatch`] if the value does not fit its type.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), UsageError> {
        let value = value.into();
        let ordinal = self
            .schema
            .descriptors
            .ordinal_of(field)
            .ok_or_else(|| self.schema.unknown(field))?;
        let ty = self
            .schema
            .field_type(ordinal)
            .ok_or_else(|| self.schema.unknown(field))?;

        if !ty.accepts(&value) {
            return Err(UsageError::TypeMismatch {
                record: self.schema.record().to_string(),
                field: field.to_string(),
                expected: ty.to_string(),
                found: value.type_name().to_string(),
            });
        }

        if let Some(slot) = self.values.get_mut(ordinal) {
            *slot = Some(value);
            self.state.mark(ordinal);
        }
        Ok(())
    }

    /// Fluent form of [`Self::set`].
    pub fn with_field(mut self, field: &str, value: impl Into<Value>) -> Result<Self, UsageError> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Whether the named field was assigned on this builder.
    #[must_use]
    pub fn is_set(&self, field: &str) -> bool {
        self.schema
            .descriptors
            .ordinal_of(field)
            .is_some_and(|idx| self.state.is_assigned(idx))
    }

    /// Finish the builder.
    ///
    /// # Errors
    ///
    /// A fresh build fails with every unassigned required field listed.
    /// Derived builds never fail.
    pub fn build(self) -> Result<Arc<DynamicRecord>, ValidationError> {
        let Self {
            schema,
            state,
            values,
        } = self;
        let record = schema.record().to_string();

        let Some(origin) = state.origin().cloned() else {
            state.missing_required(&record, schema.fields())?;
            let values = values
                .into_iter()
                .zip(&schema.types)
                .map(|(slot, ty)| slot.unwrap_or_else(|| ty.default_value()))
                .collect();
            return Ok(state.finish(&record, DynamicRecord { schema, values }));
        };

        let changed = schema.fields().iter().any(|f| {
            match (values.get(f.ordinal), origin.values.get(f.ordinal)) {
                (Some(assigned), Some(current)) => {
                    state.differs(f.ordinal, assigned.as_ref(), current)
                }
                _ => false,
            }
        });
        if !changed {
            return Ok(state.unchanged(&record, origin));
        }

        let values = values
            .into_iter()
            .zip(&origin.values)
            .map(|(slot, current)| slot.unwrap_or_else(|| current.clone()))
            .collect();
        Ok(state.finish(&record, DynamicRecord { schema, values }))
    }
}
