//! Integration tests for dependency resolution

use crate::test_helpers::decay_params;
use lmparams::parameters::{Parameter, Parameters};
use lmparams::Error;

/// Every derived entry must come after each name it references
fn is_resolved(params: &Parameters) -> bool {
    let names = params.names();
    params.iter().enumerate().all(|(position, (_, param))| {
        param.dependencies().iter().all(|dep| {
            names
                .iter()
                .position(|n| n == dep)
                .map_or(false, |index| index < position)
        })
    })
}

#[test]
fn test_no_derived_is_noop() {
    let mut params = Parameters::new();
    params.add_constant("c", 1.0);
    params.add_param("b", 2.0);
    params.add_independent("x");
    params.add_param("a", 3.0);

    params.resolve().unwrap();
    assert_eq!(params.names(), vec!["c", "b", "x", "a"]);
}

#[test]
fn test_two_cycle() {
    let mut params = Parameters::new();
    params.add(Parameter::derived("A", "B * 2").unwrap());
    params.add(Parameter::derived("B", "A / 2").unwrap());
    let before = params.to_string();

    match params.resolve() {
        Err(Error::CircularDependency { names }) => assert_eq!(names, vec!["A", "B"]),
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
    assert_eq!(params.names(), vec!["A", "B"]);
    assert_eq!(params.to_string(), before);
}

#[test]
fn test_cycle_reports_only_stuck_entries() {
    let mut params = Parameters::new();
    params.add(Parameter::derived("r", "p + q").unwrap());
    params.add(Parameter::derived("q", "r * 2").unwrap());
    params.add(Parameter::free("p", 1.0));
    params.add(Parameter::derived("s", "p * 3").unwrap());

    match params.resolve() {
        Err(Error::CircularDependency { names }) => assert_eq!(names, vec!["r", "q"]),
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
}

#[test]
fn test_simple_resolution() {
    let mut params = Parameters::new();
    params.add(Parameter::derived("C", "A + B").unwrap());
    params.add(Parameter::free("A", 2.0));
    params.add(Parameter::constant("B", 3.0));

    params.resolve().unwrap();
    assert_eq!(params.names(), vec!["A", "B", "C"]);
}

#[test]
fn test_ties_keep_insertion_order() {
    let mut params = Parameters::new();
    params.add(Parameter::derived("z2", "b").unwrap());
    params.add(Parameter::derived("z1", "a").unwrap());
    params.add(Parameter::free("b", 1.0));
    params.add(Parameter::free("a", 1.0));

    params.resolve().unwrap();
    assert_eq!(params.names(), vec!["b", "a", "z2", "z1"]);
}

#[test]
fn test_deep_chain() {
    let mut params = Parameters::new();
    for i in (1..20).rev() {
        params.add(Parameter::derived(&format!("p{i}"), &format!("p{} + 1", i - 1)).unwrap());
    }
    params.add(Parameter::free("p0", 0.0));

    params.resolve().unwrap();
    let expected: Vec<String> = (0..20).map(|i| format!("p{i}")).collect();
    assert_eq!(params.names(), expected);
    assert!(is_resolved(&params));
}

#[test]
fn test_resolved_helper_params() {
    let mut params = decay_params();
    assert!(!is_resolved(&params));
    params.resolve().unwrap();
    assert!(is_resolved(&params));
    assert_eq!(
        params.names(),
        vec!["t", "amplitude", "decay", "offset", "half_life"]
    );
}
