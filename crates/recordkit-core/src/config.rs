//! Options controlling descriptor extraction and builder synthesis.
//!
//! Both option sets deserialize with serde, so a shape description loaded from
//! disk can carry them; the derive macro fills them from container attributes.

use serde::{Deserialize, Serialize};

/// Limits applied while extracting field descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Maximum number of (non-static) fields a record may declare.
    ///
    /// `None` means unlimited. Exceeding the limit is a shape error, never a
    /// silent truncation of the assigned-field tracking.
    pub max_fields: Option<usize>,
}

impl ExtractOptions {
    /// Create options with no field limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of fields.
    #[must_use]
    pub fn max_fields(mut self, max: usize) -> Self {
        self.max_fields = Some(max);
        self
    }
}

/// Naming and extraction options for a synthesized builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthOptions {
    /// Appended to the record name to name the builder (default: `Builder`).
    pub builder_suffix: String,
    /// Explicit builder name, overriding `builder_suffix`.
    pub builder_name: Option<String>,
    /// Prepended to the snake_case field name to name setters (default: `with_`).
    pub setter_prefix: String,
    /// Extraction limits.
    pub extract: ExtractOptions,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            builder_suffix: "Builder".to_string(),
            builder_name: None,
            setter_prefix: "with_".to_string(),
            extract: ExtractOptions::default(),
        }
    }
}

impl SynthOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit builder name.
    #[must_use]
    pub fn with_builder_name(mut self, name: impl Into<String>) -> Self {
        self.builder_name = Some(name.into());
        self
    }

    /// Change the builder name suffix.
    #[must_use]
    pub fn with_builder_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.builder_suffix = suffix.into();
        self
    }

    /// Change the setter prefix.
    #[must_use]
    pub fn with_setter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.setter_prefix = prefix.into();
        self
    }

    /// Cap the number of fields.
    #[must_use]
    pub fn with_max_fields(mut self, max: usize) -> Self {
        self.extract = self.extract.max_fields(max);
        self
    }

    /// Builder name for a record called `record`.
    #[must_use]
    pub fn builder_name_for(&self, record: &str) -> String {
        match &self.builder_name {
            Some(name) => name.clone(),
            None => format!("{}{}", record, self.builder_suffix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SynthOptions::default();
        assert_eq!(options.setter_prefix, "with_");
        assert_eq!(options.builder_name_for("Dog"), "DogBuilder");
        assert_eq!(options.extract.max_fields, None);
    }

    #[test]
    fn test_fluent_overrides() {
        let options = SynthOptions::new()
            .with_builder_suffix("Draft")
            .with_setter_prefix("set_")
            .with_max_fields(8);
        assert_eq!(options.builder_name_for("Dog"), "DogDraft");
        assert_eq!(options.setter_prefix, "set_");
        assert_eq!(options.extract.max_fields, Some(8));

        let named = options.with_builder_name("Kennel");
        assert_eq!(named.builder_name_for("Dog"), "Kennel");
    }

    #[test]
    fn test_deserialize_partial_json() {
        let options: SynthOptions =
            serde_json::from_str(r#"{"setter_prefix": "set_", "extract": {"max_fields": 4}}"#)
                .unwrap();
        assert_eq!(options.builder_suffix, "Builder");
        assert_eq!(options.setter_prefix, "set_");
        assert_eq!(options.extract.max_fields, Some(4));
    }
}
