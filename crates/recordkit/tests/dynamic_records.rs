//! Runtime-shape records driven by a JSON shape description.

use std::sync::Arc;

use recordkit::prelude::*;
use recordkit::{Error, ShapeError, UsageError};

const DOG_SHAPE: &str = r#"{
    "name": "Dog",
    "fields": [
        {"name": "Name", "type": "string", "required": true},
        {"name": "Breed", "type": "string"},
        {"name": "Weight", "type": "float?"},
        {"name": "Registry", "type": "string", "static": true}
    ]
}"#;

fn schema() -> Arc<DynamicSchema> {
    DynamicSchema::from_json(DOG_SHAPE, &SynthOptions::default()).unwrap()
}

#[test]
fn test_synthesized_description_matches_shape() {
    let schema = schema();
    let synthesized = schema.synthesized();
    assert_eq!(synthesized.builder, "DogBuilder");
    let methods: Vec<_> = synthesized.setters.iter().map(|s| s.method.as_str()).collect();
    assert_eq!(methods, vec!["with_name", "with_breed", "with_weight"]);
    assert_eq!(synthesized.fresh_build.required, vec![0]);
    assert_eq!(synthesized.error_shape.fields, vec!["Name"]);
}

#[test]
fn test_drake_scenario() {
    let schema = schema();
    let dog = DynamicBuilder::fresh(&schema)
        .with_field("Name", "Drake")
        .unwrap()
        .with_field("Breed", "Husky")
        .unwrap()
        .build()
        .unwrap();

    let same = DynamicBuilder::derived(Arc::clone(&dog))
        .with_field("Name", "Drake")
        .unwrap()
        .build()
        .unwrap();
    assert!(Arc::ptr_eq(&dog, &same));

    let walle = DynamicBuilder::derived(Arc::clone(&dog))
        .with_field("Name", "WallE")
        .unwrap()
        .build()
        .unwrap();
    assert!(!Arc::ptr_eq(&dog, &walle));
    assert_eq!(walle.get("Name"), Some(&Value::from("WallE")));
    assert_eq!(walle.get("Breed"), Some(&Value::from("Husky")));
    assert_eq!(walle.get("Weight"), Some(&Value::Null));
}

#[test]
fn test_nan_always_counts_as_change() {
    let schema = schema();
    let dog = DynamicBuilder::fresh(&schema)
        .with_field("Name", "Drake")
        .unwrap()
        .with_field("Weight", f64::NAN)
        .unwrap()
        .build()
        .unwrap();
    let again = DynamicBuilder::derived(Arc::clone(&dog))
        .with_field("Weight", f64::NAN)
        .unwrap()
        .build()
        .unwrap();
    assert!(!Arc::ptr_eq(&dog, &again));
}

#[test]
fn test_usage_and_shape_errors_are_distinct() {
    let schema = schema();
    let err = DynamicBuilder::fresh(&schema)
        .with_field("Registry", "AKC")
        .unwrap_err();
    assert!(matches!(err, UsageError::UnknownField { .. }));

    let err = DynamicSchema::from_json(
        r#"{"name": "Dog", "fields": [
            {"name": "Name", "type": "string"},
            {"name": "Name", "type": "string"}
        ]}"#,
        &SynthOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Shape(ShapeError::DuplicateField { .. })));

    let err = DynamicSchema::from_json(DOG_SHAPE, &SynthOptions::default().with_max_fields(2))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Shape(ShapeError::TooManyFields { count: 3, max: 2, .. })
    ));

    let err = DynamicSchema::from_json("not json", &SynthOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn test_validation_error_converts_to_umbrella() {
    fn build_nameless(schema: &Arc<DynamicSchema>) -> recordkit::Result<Arc<DynamicRecord>> {
        let record = DynamicBuilder::fresh(schema)
            .with_field("Breed", "Husky")?
            .build()?;
        Ok(record)
    }

    let err = build_nameless(&schema()).unwrap_err();
    match err {
        Error::Validation(errors) => {
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["Name"]);
        }
        other => panic!("expected validation error, got {other}"),
    }
}
