//! Core types for recordkit.
//!
//! `recordkit-core` holds everything a record builder needs at runtime and
//! everything the derive macro needs at compile time.
//!
//! # Role In The Architecture
//!
//! - **Extraction**: [`field::extract`] turns a [`RecordShape`] (record name plus
//!   field declarations) into ordered [`FieldDescriptor`]s.
//! - **Synthesis**: [`synth::synthesize`] describes the builder for a descriptor
//!   list: setters, fresh-build checks, derived-build comparison order and the
//!   validation error shape.
//! - **Runtime**: [`BuildState`] implements explicit-set tracking and the two
//!   build paths; generated builders and [`DynamicBuilder`] both delegate to it.
//!
//! # Who Uses This Crate
//!
//! - `recordkit-macros` runs extraction and synthesis on the annotated struct
//!   and renders a typed builder that calls into [`BuildState`].
//! - `recordkit` re-exports this crate and the derive for applications.
//! - Tools with shapes only known at runtime use [`dynamic`] directly.

pub mod builder;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod field;
pub mod fields_set;
pub mod synth;
pub mod value;

pub use builder::{BuildOutcome, BuildState, Record, RecordBuilder, ToBuilder};
pub use config::{ExtractOptions, SynthOptions};
pub use dynamic::{DynamicBuilder, DynamicRecord, DynamicSchema};
pub use error::{
    Error, FieldValidationError, REQUIRED_REASON, Result, ShapeError, UsageError, ValidationError,
    ValidationErrorKind,
};
pub use field::{Descriptors, FieldDecl, FieldDescriptor, RecordShape, extract, extract_cached};
pub use fields_set::FieldsSet;
pub use synth::{SetterSpec, SynthesizedType, synthesize};
pub use value::{FieldType, Value, ValueType};
