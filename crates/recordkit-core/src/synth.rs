//! Synthesized builder descriptions.
//!
//! [`synthesize`] maps a descriptor list to an abstract description of the
//! builder that should exist for it: which setters, which fields the fresh
//! build must check, the comparison order of the derived build, and the shape
//! of the validation error. Rendering that description into code (or into a
//! runtime object) is left to a backend; the derive macro and
//! [`crate::dynamic`] are the two that ship here.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::config::SynthOptions;
use crate::error::{REQUIRED_REASON, ShapeError};
use crate::field::{Descriptors, is_valid_field_name};

/// One generated setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetterSpec {
    /// Field the setter assigns.
    pub field: String,
    /// Setter method name, e.g. `with_first_name`.
    pub method: String,
    /// Assigned-state query name, e.g. `is_first_name_set`.
    pub query: String,
    /// Parameter type (the field's declared type).
    pub param_type: String,
    /// Bit in the assigned-field set.
    pub ordinal: usize,
    /// Whether the field is required on fresh builds.
    pub required: bool,
}

/// Fresh-build procedure: which ordinals must be assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreshBuild {
    pub required: Vec<usize>,
}

/// Derived-build procedure: ordinals compared against the origin, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedBuild {
    pub compare_order: Vec<usize>,
}

/// Shape of the error a fresh build can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorShape {
    /// Reason attached to every missing field.
    pub reason: String,
    /// Fields that can appear in the error, in declaration order.
    pub fields: Vec<String>,
}

/// Abstract description of the builder for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedType {
    pub record: String,
    pub builder: String,
    pub setters: Vec<SetterSpec>,
    pub fresh_build: FreshBuild,
    pub derived_build: DerivedBuild,
    pub error_shape: ErrorShape,
}

impl SynthesizedType {
    /// Setter for the named field.
    #[must_use]
    pub fn setter(&self, field: &str) -> Option<&SetterSpec> {
        self.setters.iter().find(|s| s.field == field)
    }

    /// Pretty JSON rendering of the description.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SynthesizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "builder {} for {}", self.builder, self.record)?;
        for s in &self.setters {
            let marker = if s.required { " (required)" } else { "" };
            writeln!(
                f,
                "  [{}] {}({}: {}){}",
                s.ordinal, s.method, s.field, s.param_type, marker
            )?;
        }
        write!(
            f,
            "  fresh build checks {} required field(s); derived build compares {} field(s)",
            self.fresh_build.required.len(),
            self.derived_build.compare_order.len()
        )
    }
}

/// Convert `FirstName`, `firstName` or `HTTPCode` to snake_case.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if *p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Inherent methods every builder already has.
const BUILDER_METHODS: [&str; 3] = ["new", "from_origin", "build"];

const KEYWORDS: [&str; 39] = [
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
    "true", "type", "unsafe", "use", "where", "while",
];

fn is_method_name(name: &str) -> bool {
    is_valid_field_name(name) && name != "_" && !KEYWORDS.contains(&name)
}

/// Describe the builder for `descriptors`.
///
/// # Errors
///
/// Fails with [`ShapeError::SetterConflict`] when a setter or query name is
/// taken twice, shadows one of the builder's own methods (`new`,
/// `from_origin`, `build`), or is not a usable method identifier.
pub fn synthesize(
    descriptors: &Descriptors,
    options: &SynthOptions,
) -> Result<SynthesizedType, ShapeError> {
    let record = descriptors.record().to_string();
    let mut methods: HashSet<String> = BUILDER_METHODS.iter().map(ToString::to_string).collect();
    let mut setters = Vec::with_capacity(descriptors.len());

    for field in descriptors.fields() {
        let snake = to_snake_case(field.name());
        let method = format!("{}{}", options.setter_prefix, snake);
        let query = format!("is_{}_set", snake.trim_start_matches('_'));
        for name in [&method, &query] {
            if !is_method_name(name) || !methods.insert(name.clone()) {
                return Err(ShapeError::SetterConflict {
                    record,
                    method: name.clone(),
                });
            }
        }
        setters.push(SetterSpec {
            field: field.name().to_string(),
            method,
            query,
            param_type: field.ty().to_string(),
            ordinal: field.ordinal,
            required: field.required,
        });
    }

    let required: Vec<usize> = descriptors.required().map(|f| f.ordinal).collect();
    let error_fields = descriptors
        .required()
        .map(|f| f.name().to_string())
        .collect();

    Ok(SynthesizedType {
        builder: options.builder_name_for(&record),
        record,
        setters,
        fresh_build: FreshBuild { required },
        derived_build: DerivedBuild {
            compare_order: descriptors.fields().iter().map(|f| f.ordinal).collect(),
        },
        error_shape: ErrorShape {
            reason: REQUIRED_REASON.to_string(),
            fields: error_fields,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractOptions;
    use crate::field::{RecordShape, extract};

    fn person() -> Descriptors {
        let shape = RecordShape::new("Person")
            .required_field("FirstName", "String")
            .required_field("LastName", "String")
            .field("nickname", "Option<String>");
        extract(&shape, &ExtractOptions::default()).unwrap()
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("name"), "name");
        assert_eq!(to_snake_case("FirstName"), "first_name");
        assert_eq!(to_snake_case("firstName"), "first_name");
        assert_eq!(to_snake_case("HTTPCode"), "http_code");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Field2Name"), "field2_name");
    }

    #[test]
    fn test_synthesize_person() {
        let ty = synthesize(&person(), &SynthOptions::default()).unwrap();
        assert_eq!(ty.builder, "PersonBuilder");
        assert_eq!(ty.setters.len(), 3);
        assert_eq!(ty.setters[0].method, "with_first_name");
        assert_eq!(ty.setters[0].query, "is_first_name_set");
        assert_eq!(ty.setter("nickname").unwrap().param_type, "Option<String>");
        assert_eq!(ty.fresh_build.required, vec![0, 1]);
        assert_eq!(ty.derived_build.compare_order, vec![0, 1, 2]);
        assert_eq!(ty.error_shape.fields, vec!["FirstName", "LastName"]);
        assert_eq!(ty.error_shape.reason, "required but not set");
    }

    #[test]
    fn test_setter_collision() {
        let shape = RecordShape::new("Clash")
            .field("FirstName", "String")
            .field("first_name", "String");
        let descriptors = extract(&shape, &ExtractOptions::default()).unwrap();
        let err = synthesize(&descriptors, &SynthOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ShapeError::SetterConflict {
                record: "Clash".to_string(),
                method: "with_first_name".to_string(),
            }
        );
    }

    fn conflict(shape: &RecordShape, options: &SynthOptions) -> String {
        let descriptors = extract(shape, &ExtractOptions::default()).unwrap();
        match synthesize(&descriptors, options) {
            Err(ShapeError::SetterConflict { method, .. }) => method,
            other => panic!("expected setter conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_query_collision() {
        let shape = RecordShape::new("Clash").field("x", "int").field("_x", "int");
        assert_eq!(conflict(&shape, &SynthOptions::default()), "is_x_set");
    }

    #[test]
    fn test_setter_shadows_builder_method() {
        let bare = SynthOptions::default().with_setter_prefix("");
        let shape = RecordShape::new("Job").field("build", "i64");
        assert_eq!(conflict(&shape, &bare), "build");

        let from = SynthOptions::default().with_setter_prefix("from_");
        let shape = RecordShape::new("Job").field("origin", "i64");
        assert_eq!(conflict(&shape, &from), "from_origin");
    }

    #[test]
    fn test_keyword_setter_rejected() {
        let bare = SynthOptions::default().with_setter_prefix("");
        let shape = RecordShape::new("Ticket").field("type", "String");
        assert_eq!(conflict(&shape, &bare), "type");

        let ty = synthesize(
            &extract(&shape, &ExtractOptions::default()).unwrap(),
            &SynthOptions::default(),
        )
        .unwrap();
        assert_eq!(ty.setters[0].method, "with_type");
        assert_eq!(ty.setters[0].query, "is_type_set");
    }

    #[test]
    fn test_bad_prefix() {
        let options = SynthOptions::default().with_setter_prefix("with-");
        assert!(matches!(
            synthesize(&person(), &options),
            Err(ShapeError::SetterConflict { .. })
        ));
    }

    #[test]
    fn test_display_and_json() {
        let ty = synthesize(&person(), &SynthOptions::default()).unwrap();
        let text = ty.to_string();
        assert!(text.starts_with("builder PersonBuilder for Person"));
        assert!(text.contains("[1] with_last_name(LastName: String) (required)"));

        let json: serde_json::Value = serde_json::from_str(&ty.to_json().unwrap()).unwrap();
        assert_eq!(json["builder"], "PersonBuilder");
        assert_eq!(json["setters"][2]["method"], "with_nickname");
    }
}
