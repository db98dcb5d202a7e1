//! Integration tests for the Parameters collection
//!
//! These tests verify that the Parameters collection behaves correctly in various scenarios.

use crate::test_helpers::decay_params;
use lmparams::parameters::{Parameter, ParameterKind, Parameters, Value};
use lmparams::Error;

#[test]
fn test_parameters_basic_operations() {
    let mut params = Parameters::new();
    assert!(params.is_empty());

    params.add_param("amplitude", 10.0);
    params.add_param("center", 5.0);
    params.add_param_with_bounds("sigma", 2.0, 0.1, 10.0);
    assert_eq!(params.len(), 3);
    assert!(params.contains("sigma"));
    assert!(params.get("nonexistent").is_none());

    params.get_mut("center").unwrap().set_value(7.5).unwrap();
    assert_eq!(params.get("center").unwrap().value(), Some(&Value::Scalar(7.5)));

    let removed = params.remove("amplitude").unwrap();
    assert_eq!(removed.name(), "amplitude");
    assert_eq!(params.names(), vec!["center", "sigma"]);
}

#[test]
fn test_overwrite_keeps_position() {
    let mut params = decay_params();
    let before = params.names();

    let previous = params.add(Parameter::constant("amplitude", 1.0)).unwrap();
    assert_eq!(previous.kind(), ParameterKind::Free);
    assert_eq!(params.names(), before);
    assert_eq!(params.get("amplitude").unwrap().kind(), ParameterKind::Constant);
}

#[test]
fn test_iteration_order() {
    let params = decay_params();
    let kinds: Vec<ParameterKind> = params.iter().map(|(_, p)| p.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ParameterKind::Independent,
            ParameterKind::Derived,
            ParameterKind::Free,
            ParameterKind::Free,
            ParameterKind::Constant,
        ]
    );
    assert_eq!(params.names_of_kind(ParameterKind::Free), vec!["amplitude", "decay"]);
}

#[test]
fn test_eval_and_update_expressions() {
    let mut params = decay_params();
    params.resolve().unwrap();
    params.update_expressions().unwrap();

    let half_life = params.get("half_life").unwrap().value().unwrap().get(0).unwrap();
    approx::assert_relative_eq!(half_life, 2.0_f64.ln() / 0.5);

    let value = params.eval_expression("amplitude * exp(-decay) + offset").unwrap();
    approx::assert_relative_eq!(value.get(0).unwrap(), 5.0 * (-0.5_f64).exp() + 0.25);

    assert!(matches!(
        params.eval_expression("amplitude * t"),
        Err(Error::Expression { .. })
    ));
}

#[test]
fn test_json_round_trip() {
    let mut params = decay_params();
    params.resolve().unwrap();
    params.update_expressions().unwrap();

    let json = params.to_json().unwrap();
    let loaded = Parameters::from_json(&json).unwrap();

    assert_eq!(loaded.names(), params.names());
    for (name, param) in params.iter() {
        assert_eq!(loaded.get(name), Some(param));
    }
    assert_eq!(loaded.to_string(), params.to_string());
}

#[test]
fn test_from_config_json() {
    let json = r#"{
        "x": {"independent": true},
        "slopes": {"value": [1.0, 2.0], "min": 0.0, "max": 10.0},
        "intercept": {"value": 0.5, "kind": "constant"},
        "mean_slope": {"formula": "(slopes + slopes) / 2", "value": [0.0, 0.0]}
    }"#;
    let mut params = Parameters::from_config_json(json).unwrap();
    assert_eq!(params.names(), vec!["x", "slopes", "intercept", "mean_slope"]);

    let evaluator = params.prepare().unwrap();
    assert_eq!(
        evaluator.evaluate(&[3.0, 4.0]).unwrap().to_vec(),
        vec![3.0, 4.0, 0.5, 3.0, 4.0]
    );

    assert!(Parameters::from_config_json(r#"{"a": {"formula": "b", "min": 0.0}}"#).is_err());
}

#[test]
fn test_display_one_line_per_entry() {
    let params = decay_params();
    let text = params.to_string();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Independent: name=t");
    assert_eq!(lines[1], "Derived: name=half_life, value=NaN, formula=ln(2) / decay");
    assert_eq!(lines[4], "Constant: name=offset, value=0.25");
}
