//! Integration tests for the compiled evaluator

use crate::test_helpers::{array_approx_eq, decay_params};
use lmparams::parameters::{Evaluator, Instruction, Parameter, ParameterKind, Parameters};
use lmparams::Error;
use std::sync::Arc;
use std::thread;

#[test]
fn test_free_constant_derived() {
    let mut params = Parameters::new();
    params.add(Parameter::derived("C", "A + B").unwrap());
    params.add(Parameter::free("A", 2.0));
    params.add(Parameter::constant("B", 3.0));

    let evaluator = params.prepare().unwrap();
    assert_eq!(params.names(), vec!["A", "B", "C"]);
    assert_eq!(evaluator.evaluate(&[5.0]).unwrap().to_vec(), vec![5.0, 3.0, 8.0]);
}

#[test]
fn test_layout_and_instructions() {
    let mut params = decay_params();
    let evaluator = params.prepare().unwrap();

    let layout: Vec<(&str, ParameterKind, usize, usize)> = evaluator
        .layout()
        .iter()
        .map(|slot| (slot.name.as_str(), slot.kind, slot.offset, slot.len))
        .collect();
    assert_eq!(
        layout,
        vec![
            ("amplitude", ParameterKind::Free, 0, 1),
            ("decay", ParameterKind::Free, 1, 1),
            ("offset", ParameterKind::Constant, 2, 1),
            ("half_life", ParameterKind::Derived, 3, 1),
        ]
    );
    assert_eq!(evaluator.instructions().len(), 5);
    assert_eq!(evaluator.instructions().last(), Some(&Instruction::Concat));
}

#[test]
fn test_vector_parameters_broadcast() {
    let mut params = Parameters::new();
    params.add(Parameter::free("centers", [1.0, 2.0, 3.0]));
    params.add(Parameter::free("shift", 0.5));
    params.add(Parameter::constant("widths", [0.1, 0.2, 0.3]));
    params.add(Parameter::derived_with_value("lower", "centers - widths + shift", [0.0; 3]).unwrap());
    params.add(Parameter::derived_with_value("spread", "widths * 2", [0.0; 3]).unwrap());

    let evaluator = params.prepare().unwrap();
    assert_eq!(evaluator.free_len(), 4);
    let full = evaluator.evaluate(&[10.0, 20.0, 30.0, 1.0]).unwrap();

    assert!(array_approx_eq(
        &full,
        &[
            10.0, 20.0, 30.0, // centers
            1.0, // shift
            0.1, 0.2, 0.3, // widths
            10.9, 20.8, 30.7, // lower
            0.2, 0.4, 0.6, // spread
        ],
        1e-12
    ));
}

#[test]
fn test_shape_errors() {
    let mut params = Parameters::new();
    params.add(Parameter::free("a", [1.0, 2.0]));
    params.add(Parameter::constant("b", [1.0, 2.0, 3.0]));
    params.add(Parameter::derived("c", "a + b").unwrap());

    let evaluator = params.prepare().unwrap();
    match evaluator.evaluate(&[1.0, 2.0]) {
        Err(Error::Expression { name, .. }) => assert_eq!(name, "c"),
        other => panic!("Expected Expression error, got {:?}", other),
    }

    assert!(matches!(
        evaluator.evaluate(&[]),
        Err(Error::LengthMismatch { .. })
    ));
}

#[test]
fn test_unresolved_collection_is_rejected() {
    let params = decay_params();
    assert!(matches!(
        Evaluator::compile(&params),
        Err(Error::UnresolvedDependency { .. })
    ));
}

#[test]
fn test_evaluator_is_a_snapshot() {
    let mut params = decay_params();
    let evaluator = params.prepare().unwrap();

    params.get_mut("offset").unwrap().set_value(100.0).unwrap();
    let full = evaluator.evaluate(&[1.0, 1.0]).unwrap();
    assert_eq!(full[2], 0.25);

    let rebuilt = params.evaluator().unwrap();
    assert!(!Arc::ptr_eq(&evaluator, &rebuilt));
    assert_eq!(rebuilt.evaluate(&[1.0, 1.0]).unwrap()[2], 100.0);
}

#[test]
fn test_shared_across_threads() {
    let mut params = decay_params();
    let evaluator = params.prepare().unwrap();

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let evaluator = Arc::clone(&evaluator);
            thread::spawn(move || evaluator.evaluate(&[i as f64, 0.5]).unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let full = handle.join().unwrap();
        assert_eq!(full[0], (i + 1) as f64);
    }
}

#[test]
fn test_evaluate_many_matches_sequential() {
    let mut params = decay_params();
    let evaluator = params.prepare().unwrap();

    let trials: Vec<Vec<f64>> = (1..50).map(|i| vec![i as f64, 0.01 * i as f64]).collect();
    let batch = evaluator.evaluate_many(&trials).unwrap();
    for (trial, full) in trials.iter().zip(&batch) {
        assert_eq!(full, &evaluator.evaluate(trial).unwrap());
    }

    let mut bad = trials.clone();
    bad.push(vec![1.0]);
    assert!(evaluator.evaluate_many(&bad).is_err());
}

#[test]
fn test_vector_derived_without_value() {
    let mut params = Parameters::new();
    params.add(Parameter::free("v", [1.0, 2.0, 3.0]));
    params.add(Parameter::derived("d", "v * 2").unwrap());

    let evaluator = params.prepare().unwrap();
    assert_eq!(evaluator.output_len(), 6);
    assert_eq!(
        evaluator.evaluate(&[1.0, 2.0, 3.0]).unwrap().to_vec(),
        vec![1.0, 2.0, 3.0, 2.0, 4.0, 6.0]
    );

    params.commit(&[0.5, 1.0, 1.5]).unwrap();
    assert_eq!(params.to_vec(), vec![0.5, 1.0, 1.5, 1.0, 2.0, 3.0]);
}

#[test]
fn test_vector_formula_from_config() {
    let mut params = Parameters::from_config_json(
        r#"{
            "v": {"value": [1.0, 2.0]},
            "d": {"formula": "v + 1"}
        }"#,
    )
    .unwrap();

    let evaluator = params.prepare().unwrap();
    assert_eq!(
        evaluator.evaluate(&[3.0, 4.0]).unwrap().to_vec(),
        vec![3.0, 4.0, 4.0, 5.0]
    );
}
