//! # lmparams
//!
//! `lmparams` is the parameter layer of a nonlinear least-squares fitting
//! toolkit. Models refer to their parameters by name, while optimizers work on
//! a flat vector of free values.
//!
//! The library provides:
//! - Constant, bounded free, derived (formula) and independent-variable parameters
//! - Scalar or fixed-length vector values with element-wise bounds
//! - Validation and dependency resolution of parameter collections
//! - A compiled evaluator mapping the free vector to every parameter value
//! - JSON persistence and configuration
//!
//! ## Basic Usage
//!
//! ```
//! use lmparams::{Parameter, Parameters};
//!
//! let mut params = Parameters::new();
//! params.add(Parameter::free("A", 2.0));
//! params.add(Parameter::constant("B", 3.0));
//! params.add(Parameter::derived("C", "A + B").unwrap());
//!
//! let evaluator = params.prepare().unwrap();
//! assert_eq!(evaluator.evaluate(&[5.0]).unwrap().to_vec(), vec![5.0, 3.0, 8.0]);
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

// Re-exports for convenience
pub use error::{Error, Result};
pub use parameters::{
    Evaluator, Parameter, ParameterBuilder, ParameterConfig, ParameterKind, Parameters, Value,
};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
