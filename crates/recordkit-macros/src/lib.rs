//! Procedural macros for recordkit.
//!
//! `#[derive(Record)]` generates a copy-on-write builder for a struct with
//! named fields.
//!
//! # Attributes
//!
//! On the struct:
//!
//! - `#[record(builder = "Name")]`: explicit builder name (default `{Struct}Builder`)
//! - `#[record(builder_suffix = "Draft")]`: change the builder name suffix
//! - `#[record(setter_prefix = "set_")]`: change the setter prefix (default `with_`)
//! - `#[record(max_fields = 64)]`: reject structs with more builder fields
//! - `#[record(crate = "recordkit_core")]`: path used in generated code
//!
//! On fields:
//!
//! - `#[record(required)]`: a fresh build fails unless the field was assigned
//! - `#[record(skip)]`: not part of the builder; `Default` on fresh builds,
//!   cloned from the origin on derived builds. `PhantomData` fields are
//!   skipped automatically.
//!
//! Builder fields must be `Clone + PartialEq`; fields that are not required
//! must also be `Default`. The field name `__recordkit_state` is reserved.
//! A setter or `is_*_set` query that collides with another one, or with the
//! builder's `new`, `from_origin` or `build`, is a compile error.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record_derive;

/// Derive a record builder.
///
/// ```ignore
/// use recordkit::prelude::*;
///
/// #[derive(Debug, Record)]
/// pub struct Dog {
///     #[record(required)]
///     pub name: String,
///     pub breed: String,
/// }
///
/// let dog = Dog::builder().with_name("Drake").build()?;
/// let same = dog.to_builder().with_name("Drake").build()?;
/// assert!(std::sync::Arc::ptr_eq(&dog, &same));
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let def = match record_derive::parse_record(&input) {
        Ok(def) => def,
        Err(err) => return err.to_compile_error().into(),
    };

    match record_derive::generate_record_impl(&def) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
