//! Builder runtime shared by every generated builder.
//!
//! A builder runs in one of two modes:
//!
//! - **fresh** (no origin): `build()` checks that every required field was
//!   assigned, reports *all* missing ones at once, and fills unassigned
//!   optional fields from their type default.
//! - **derived** (origin present): `build()` compares each assigned value with
//!   the origin's current value. If nothing differs the origin itself is
//!   returned (same `Arc`, no allocation); otherwise a new record is built
//!   where unassigned fields are copied from the origin.
//!
//! Generated code keeps one `Option<T>` slot per field next to a
//! [`BuildState`]; a slot is `Some` exactly when its bit is assigned.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::field::FieldDescriptor;
use crate::fields_set::FieldsSet;

/// A record type with a synthesized builder.
///
/// Implemented by `#[derive(Record)]`.
pub trait Record: Sized {
    /// Record name used in errors and logs.
    const NAME: &'static str;

    /// The builder generated for this record.
    type Builder: RecordBuilder<Record = Self>;

    /// Field descriptors in declaration order.
    fn fields() -> &'static [FieldDescriptor];

    /// Start a fresh builder.
    fn builder() -> Self::Builder {
        Self::Builder::fresh()
    }
}

/// The fluent builder of a [`Record`].
pub trait RecordBuilder: Sized {
    /// The record this builder produces.
    type Record: Record;

    /// A builder with no origin.
    fn fresh() -> Self;

    /// A builder deriving from `origin`.
    fn derived(origin: Arc<Self::Record>) -> Self;

    /// Finish the builder.
    ///
    /// Derived builders never fail; fresh builders fail when required fields
    /// were left unset.
    fn build(self) -> Result<Arc<Self::Record>, ValidationError>;
}

/// Start a derived builder from a shared record.
pub trait ToBuilder {
    /// Builder type produced.
    type Builder;

    /// A builder whose origin is this record.
    fn to_builder(&self) -> Self::Builder;
}

impl<R: Record> ToBuilder for Arc<R> {
    type Builder = R::Builder;

    fn to_builder(&self) -> R::Builder {
        R::Builder::derived(Arc::clone(self))
    }
}

/// How a build concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A new record from a fresh builder.
    Fresh,
    /// The origin was returned because no assigned value differed.
    Unchanged,
    /// A new record copied from the origin with overrides.
    Cloned,
}

impl BuildOutcome {
    /// Short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BuildOutcome::Fresh => "fresh",
            BuildOutcome::Unchanged => "unchanged",
            BuildOutcome::Cloned => "cloned",
        }
    }
}

/// Origin and assigned-field tracking of one builder.
#[derive(Debug)]
pub struct BuildState<T> {
    origin: Option<Arc<T>>,
    assigned: FieldsSet,
}

impl<T> Clone for BuildState<T> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            assigned: self.assigned.clone(),
        }
    }
}

impl<T> BuildState<T> {
    /// State of a fresh builder over `len` fields.
    #[must_use]
    pub fn fresh(len: usize) -> Self {
        Self {
            origin: None,
            assigned: FieldsSet::empty(len),
        }
    }

    /// State of a builder deriving from `origin`.
    #[must_use]
    pub fn derived(origin: Arc<T>, len: usize) -> Self {
        Self {
            origin: Some(origin),
            assigned: FieldsSet::empty(len),
        }
    }

    /// The origin record, if deriving.
    #[must_use]
    pub fn origin(&self) -> Option<&Arc<T>> {
        self.origin.as_ref()
    }

    /// True in derived mode.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        self.origin.is_some()
    }

    /// Assigned-field bits.
    #[must_use]
    pub fn assigned(&self) -> &FieldsSet {
        &self.assigned
    }

    /// Record that the field at `ordinal` was assigned.
    ///
    /// Re-marking is a no-op. Ordinals come from the descriptor table the
    /// builder was generated from, so they are always in range.
    pub fn mark(&mut self, ordinal: usize) {
        let marked = self.assigned.set(ordinal);
        debug_assert!(marked, "field ordinal {ordinal} out of range");
    }

    /// Whether the field at `ordinal` was assigned.
    #[must_use]
    pub fn is_assigned(&self, ordinal: usize) -> bool {
        self.assigned.is_set(ordinal)
    }

    /// Check every required descriptor against the assigned bits.
    ///
    /// All descriptors are scanned so the error lists every missing field,
    /// in declaration order.
    pub fn missing_required(
        &self,
        record: &str,
        fields: &[FieldDescriptor],
    ) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new(record);
        for field in fields.iter().filter(|f| f.required) {
            if !self.is_assigned(field.ordinal) {
                errors.add_required(field.name());
            }
        }
        if !errors.is_empty() {
            tracing::trace!(
                record = record,
                missing = errors.len(),
                "Fresh build rejected, required fields not set"
            );
        }
        errors.into_result()
    }

    /// Take the value of a required field after [`Self::missing_required`]
    /// passed.
    ///
    /// A builder slot holds a value exactly when its bit is set, so once
    /// `missing_required` succeeded the `None` arm is unreachable. It still
    /// reports the field instead of panicking.
    pub fn require<V>(
        &self,
        record: &str,
        field: &FieldDescriptor,
        value: Option<V>,
    ) -> Result<V, ValidationError> {
        value.ok_or_else(|| {
            let mut errors = ValidationError::new(record);
            errors.add_required(field.name());
            errors
        })
    }

    /// True when the field at `ordinal` was assigned a value not equal to
    /// `current`.
    pub fn differs<V: PartialEq + ?Sized>(
        &self,
        ordinal: usize,
        assigned: Option<&V>,
        current: &V,
    ) -> bool {
        self.is_assigned(ordinal) && assigned.is_some_and(|value| value != current)
    }

    /// Conclude a derived build that changed nothing: hand back the origin.
    pub fn unchanged(self, record: &str, origin: Arc<T>) -> Arc<T> {
        tracing::trace!(
            record = record,
            assigned = self.assigned.count(),
            outcome = BuildOutcome::Unchanged.as_str(),
            "Derived build returned origin"
        );
        origin
    }

    /// Conclude a build with a newly constructed record.
    pub fn finish(self, record: &str, value: T) -> Arc<T> {
        let outcome = if self.is_derived() {
            BuildOutcome::Cloned
        } else {
            BuildOutcome::Fresh
        };
        tracing::trace!(
            record = record,
            assigned = self.assigned.count(),
            outcome = outcome.as_str(),
            "Built record"
        );
        Arc::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FIELDS: [FieldDescriptor; 3] = [
        FieldDescriptor::new("first_name", "String", true, 0),
        FieldDescriptor::new("last_name", "String", true, 1),
        FieldDescriptor::new("nickname", "String", false, 2),
    ];

    #[test]
    fn test_fresh_state_reports_every_missing_field() {
        let state: BuildState<()> = BuildState::fresh(FIELDS.len());
        let err = state.missing_required("Person", &FIELDS).unwrap_err();
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec!["first_name", "last_name"]
        );
    }

    #[test]
    fn test_missing_required_only_lists_unset() {
        let mut state: BuildState<()> = BuildState::fresh(FIELDS.len());
        state.mark(0);
        state.mark(2);
        let err = state.missing_required("Person", &FIELDS).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.get("last_name"), Some("required but not set"));

        state.mark(1);
        assert!(state.missing_required("Person", &FIELDS).is_ok());
    }

    #[test]
    fn test_require() {
        let mut state: BuildState<()> = BuildState::fresh(FIELDS.len());
        state.mark(0);
        state.missing_required("Person", &FIELDS[..1]).unwrap();
        assert_eq!(state.require("Person", &FIELDS[0], Some(1)).unwrap(), 1);

        let err = state.require::<i32>("Person", &FIELDS[1], None).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["last_name"]);
    }

    #[test]
    fn test_differs_only_for_assigned() {
        let mut state = BuildState::derived(Arc::new(()), FIELDS.len());
        assert!(!state.differs(0, Some("a"), "b"));
        state.mark(0);
        assert!(state.differs(0, Some("a"), "b"));
        assert!(!state.differs(0, Some("b"), "b"));
        assert!(!state.differs::<str>(0, None, "b"));
    }

    #[test]
    fn test_unchanged_returns_same_arc() {
        let origin = Arc::new(5);
        let state = BuildState::derived(Arc::clone(&origin), 1);
        assert!(state.is_derived());
        let out = state.unchanged("Number", Arc::clone(&origin));
        assert!(Arc::ptr_eq(&origin, &out));
    }

    #[test]
    fn test_finish_allocates() {
        let origin = Arc::new(5);
        let state = BuildState::derived(Arc::clone(&origin), 1);
        let out = state.finish("Number", 6);
        assert!(!Arc::ptr_eq(&origin, &out));
        assert_eq!(*out, 6);

        let fresh: BuildState<i32> = BuildState::fresh(1);
        assert!(!fresh.is_derived());
        assert!(fresh.origin().is_none());
        assert_eq!(*fresh.finish("Number", 7), 7);
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(BuildOutcome::Fresh.as_str(), "fresh");
        assert_eq!(BuildOutcome::Unchanged.as_str(), "unchanged");
        assert_eq!(BuildOutcome::Cloned.as_str(), "cloned");
    }
}
