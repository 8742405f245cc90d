//! Immutable records with change-tracking, copy-on-write builders.
//!
//! `recordkit` is the facade crate: it re-exports the core runtime from
//! `recordkit-core` and the `#[derive(Record)]` macro from `recordkit-macros`,
//! so applications depend on one crate.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use recordkit::prelude::*;
//!
//! #[derive(Debug, Record)]
//! pub struct Dog {
//!     #[record(required)]
//!     pub name: String,
//!     pub breed: String,
//! }
//!
//! let dog = Dog::builder().with_name("Drake").with_breed("Husky").build().unwrap();
//!
//! // Nothing changed: the very same record comes back.
//! let same = dog.to_builder().with_name("Drake").build().unwrap();
//! assert!(Arc::ptr_eq(&dog, &same));
//!
//! // A changed field produces a new record; the rest is copied.
//! let walle = dog.to_builder().with_name("WallE").build().unwrap();
//! assert_eq!(walle.breed, "Husky");
//!
//! // Fresh builds report every missing required field.
//! let err = Dog::builder().with_breed("Husky").build().unwrap_err();
//! assert_eq!(err.get("name"), Some("required but not set"));
//! ```

pub use recordkit_core::{
    BuildOutcome, BuildState, Descriptors, DynamicBuilder, DynamicRecord, DynamicSchema, Error,
    ExtractOptions, FieldDecl, FieldDescriptor, FieldType, FieldValidationError, FieldsSet,
    REQUIRED_REASON, Record, RecordBuilder, RecordShape, Result, SetterSpec, ShapeError,
    SynthOptions, SynthesizedType, ToBuilder, UsageError, ValidationError, ValidationErrorKind,
    Value, ValueType, extract, extract_cached, synthesize,
};
pub use recordkit_macros::Record;

pub use recordkit_core::{builder, config, dynamic, error, field, fields_set, synth, value};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        Record, RecordBuilder, RecordShape, SynthOptions, ToBuilder, ValidationError, Value,
    };
    pub use crate::{DynamicBuilder, DynamicRecord, DynamicSchema};
}
