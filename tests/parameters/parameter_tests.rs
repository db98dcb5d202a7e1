//! Integration tests for the Parameter type
//!
//! These tests cover construction through constructors, the builder and
//! configuration objects.

use lmparams::parameters::{Parameter, ParameterBuilder, ParameterConfig, ParameterKind, Value};
use lmparams::Error;
use std::f64::{INFINITY, NEG_INFINITY};

#[test]
fn test_constructors() {
    let param = Parameter::constant("offset", 3.0);
    assert_eq!(param.kind(), ParameterKind::Constant);
    assert_eq!(param.value(), Some(&Value::Scalar(3.0)));
    assert!(param.bounds().is_none());

    let param = Parameter::bounded("rates", [0.1, 0.2], [0.0, 0.0], [1.0, 1.0]);
    assert_eq!(param.kind(), ParameterKind::Free);
    assert_eq!(param.len(), 2);
    assert!(param.validate().is_ok());

    let param = Parameter::derived("half", "rates / 2").unwrap();
    assert_eq!(param.kind(), ParameterKind::Derived);
    assert!(param.value().unwrap().get(0).unwrap().is_nan());

    let param = Parameter::independent("x");
    assert_eq!(param.kind(), ParameterKind::Independent);
    assert!(param.value().is_none());
    assert!(param.is_empty());
}

#[test]
fn test_builder_inference() {
    let free = ParameterBuilder::new("a").value(1.0).build().unwrap();
    assert_eq!(free.kind(), ParameterKind::Free);
    let bounds = free.bounds().unwrap();
    assert_eq!(bounds.min, Value::Scalar(NEG_INFINITY));
    assert_eq!(bounds.max, Value::Scalar(INFINITY));

    let derived = ParameterBuilder::new("b").formula("a * 2").build().unwrap();
    assert_eq!(derived.kind(), ParameterKind::Derived);
    assert_eq!(derived.dependencies().into_iter().collect::<Vec<_>>(), vec!["a"]);

    let placeholder = ParameterBuilder::new("x").independent(true).build().unwrap();
    assert_eq!(placeholder.kind(), ParameterKind::Independent);
}

#[test]
fn test_builder_kind_by_name() {
    let param = ParameterBuilder::new("c")
        .value(2.0)
        .kind_str("constant")
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(param.kind(), ParameterKind::Constant);

    match ParameterBuilder::new("c").kind_str("sticky") {
        Err(Error::UnknownParameterKind(kind)) => assert_eq!(kind, "sticky"),
        other => panic!("Expected UnknownParameterKind, got {:?}", other),
    }
}

#[test]
fn test_builder_vector_bounds() {
    let param = ParameterBuilder::new("w")
        .value([1.0, 2.0])
        .min([0.0, 1.0])
        .max(5.0)
        .build()
        .unwrap();

    let bounds = param.bounds().unwrap();
    assert_eq!(bounds.min, Value::from([0.0, 1.0]));
    assert_eq!(bounds.max, Value::from([5.0, 5.0]));
    assert!(param.validate().is_ok());
}

#[test]
fn test_config_objects() {
    let configs: Vec<(&str, &str, ParameterKind)> = vec![
        ("a", r#"{"value": 1.0}"#, ParameterKind::Free),
        ("b", r#"{"value": [1.0, 2.0], "kind": "fixed"}"#, ParameterKind::Constant),
        ("c", r#"{"formula": "a + b"}"#, ParameterKind::Derived),
        ("x", r#"{"independent": true}"#, ParameterKind::Independent),
    ];

    for (name, json, kind) in configs {
        let config: ParameterConfig = serde_json::from_str(json).unwrap();
        let param = config.build(name).unwrap();
        assert_eq!(param.name(), name);
        assert_eq!(param.kind(), kind);
    }

    let config: ParameterConfig =
        serde_json::from_str(r#"{"value": 1.0, "independent": true}"#).unwrap();
    assert!(matches!(
        config.build("x"),
        Err(Error::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_set_value_and_reset() {
    let mut param = Parameter::bounded("a", [0.5, 0.5], [0.0, 0.0], [1.0, 1.0]);
    param.set_value([2.0, -1.0]).unwrap();
    assert!(matches!(param.validate(), Err(Error::OutOfBounds { index: 0, .. })));

    param.reset();
    assert_eq!(param.value(), Some(&Value::from([0.5, 0.5])));
}

#[test]
fn test_display_formats() {
    let lines = [
        (Parameter::constant("k", [1.0, 2.0]), "Constant: name=k, value=[1, 2]"),
        (
            Parameter::bounded("a", 0.5, 0.0, 1.0),
            "Free: name=a, value=0.5, min=0, max=1",
        ),
        (
            Parameter::derived_with_value("d", "a * k", [0.5, 1.0]).unwrap(),
            "Derived: name=d, value=[0.5, 1], formula=a * k",
        ),
        (Parameter::independent("x"), "Independent: name=x"),
    ];

    for (param, expected) in lines {
        assert_eq!(param.to_string(), expected);
    }
}
