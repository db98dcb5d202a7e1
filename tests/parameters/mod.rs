//! Integration tests for the parameter system
//!
//! These tests verify that the parameter system behaves correctly in various scenarios.

// Tests for the Parameter type and its construction
mod parameter_tests;

// Tests for the Parameters collection
mod parameters_tests;

// Tests for the Expression parsing and evaluation
mod expression_tests;

// Tests for dependency resolution
mod resolver_tests;


// Tests for the compiled evaluator
mod evaluator_tests;
