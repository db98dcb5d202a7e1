//! Integration tests for Expression parsing and evaluation
//!
//! These tests evaluate formulas against parameter collections and plain contexts.

use approx::assert_relative_eq;
use lmparams::parameters::{
    EvaluationContext, Expression, ExpressionError, Formula, Parameters, SimpleContext, Value,
};
use std::collections::{BTreeSet, HashMap};

#[test]
fn test_dependency_extraction() {
    let formula = Formula::parse("sin(A) + B * C").unwrap();
    let expected: BTreeSet<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    assert_eq!(formula.dependencies(), expected);

    let formula = Formula::parse("max(amp, 2 * amp, floor_level) / 3").unwrap();
    let deps: Vec<String> = formula.dependencies().into_iter().collect();
    assert_eq!(deps, vec!["amp", "floor_level"]);

    assert!(Formula::parse("2.5 * 4").unwrap().dependencies().is_empty());
}

#[test]
fn test_evaluate_against_parameters() {
    let mut params = Parameters::new();
    params.add_param("amplitude", 2.0);
    params.add_param("decay", [0.5, 1.0]);
    params.add_constant("t0", 1.0);

    let value = params.eval_expression("amplitude * exp(-decay * t0)").unwrap();
    assert_eq!(value.len(), 2);
    assert_relative_eq!(value.get(0).unwrap(), 2.0 * (-0.5_f64).exp());
    assert_relative_eq!(value.get(1).unwrap(), 2.0 * (-1.0_f64).exp());

    assert!(params.has_variable("decay"));
    assert_eq!(params.variable_names(), vec!["amplitude", "decay", "t0"]);
}

#[test]
fn test_context_implementations() {
    let expr = Expression::parse("a + 2 * b").unwrap();

    let mut context = SimpleContext::new();
    context.set_variable("a", 1.0);
    context.set_variable("b", [1.0, 2.0]);
    assert_eq!(expr.evaluate(&context).unwrap(), Value::from([3.0, 5.0]));

    let removed = context.remove_variable("b");
    assert_eq!(removed, Some(Value::from([1.0, 2.0])));
    assert!(matches!(
        expr.evaluate(&context),
        Err(ExpressionError::UndefinedVariable { .. })
    ));

    let mut map: HashMap<String, Value> = HashMap::new();
    map.insert("a".to_string(), Value::Scalar(4.0));
    map.insert("b".to_string(), Value::Scalar(0.5));
    assert_eq!(expr.evaluate(&map).unwrap(), Value::Scalar(5.0));
}

#[test]
fn test_math_functions() {
    let mut context = SimpleContext::new();
    context.set_variable("x", 4.0);

    let eval = |s: &str| {
        Expression::parse(s)
            .unwrap()
            .evaluate(&context)
            .unwrap()
            .get(0)
            .unwrap()
    };

    assert_relative_eq!(eval("sqrt(x)"), 2.0);
    assert_relative_eq!(eval("log10(x * 25)"), 2.0);
    assert_relative_eq!(eval("ln(exp(x))"), 4.0, epsilon = 1e-12);
    assert_relative_eq!(eval("cos(0) + tan(0)"), 1.0);
    assert_relative_eq!(eval("2 ** -1"), 0.5);
    assert_relative_eq!(eval("abs(-x) - x"), 0.0);
}

#[test]
fn test_whitespace_and_nesting() {
    let a = Expression::parse("((a+b)*c)").unwrap();
    let b = Expression::parse("  ( ( a + b ) * c )  ").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.variables(), vec!["a", "b", "c"]);
}

#[test]
fn test_division_by_zero_element() {
    let mut context = SimpleContext::new();
    context.set_variable("v", [1.0, 0.0, 2.0]);
    assert_eq!(
        Expression::parse("1 / v").unwrap().evaluate(&context),
        Err(ExpressionError::DivisionByZero)
    );
}
