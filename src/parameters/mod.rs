//! # Parameter System
//!
//! This module provides named, typed parameters for nonlinear fitting. Models
//! are written against parameter names; an optimizer only ever sees a flat
//! vector of the free values.
//!
//! ## Key Features
//!
//! - **Parameter Kinds**: constants, bounded free parameters, derived parameters
//!   computed from a formula, and placeholders for the independent variable
//! - **Vector Values**: any parameter may hold a fixed-length vector, with
//!   element-wise bounds and broadcasting formulas
//! - **Dependency Resolution**: collections are reordered so every derived
//!   parameter follows what it references, with cycle detection
//! - **Compiled Evaluation**: a resolved collection compiles to an [`Evaluator`]
//!   mapping the free vector to the full value vector
//! - **Serialization Support**: save and load parameter collections with serde
//!
//! ## Core Components
//!
//! - [`Parameter`] and [`ParameterKind`]: individual parameters
//! - [`ParameterBuilder`] and [`ParameterConfig`]: construction from options
//! - [`Parameters`]: an ordered collection with validation and resolution
//! - [`Expression`] and [`Formula`]: the formula grammar and its evaluation
//! - [`Evaluator`]: the compiled free-vector to full-vector mapping
//!
//! ## Example Usage
//!
//! ```rust
//! use lmparams::parameters::{Parameter, Parameters};
//!
//! let mut params = Parameters::new();
//! params.add_independent("t");
//! params.add_param_with_bounds("amplitude", 3.0, 0.0, 10.0);
//! params.add_param_with_bounds("decay", 0.5, 0.0, f64::INFINITY);
//! params.add_param_with_expr("half_life", "ln(2) / decay").unwrap();
//! params.add_constant("offset", 0.1);
//!
//! // Validate, order and compile once
//! let evaluator = params.prepare().unwrap();
//!
//! // The optimizer varies amplitude and decay
//! let start = params.free_values();
//! assert_eq!(start, vec![3.0, 0.5]);
//! let full = evaluator.evaluate(&[4.0, 0.25]).unwrap();
//! assert_eq!(full.len(), 4);
//!
//! // Store the final values
//! params.commit(&[4.0, 0.25]).unwrap();
//! ```

pub mod bounds;
pub mod builder;
pub mod evaluator;
pub mod expression;
pub mod parameter;
pub mod parameters;
pub mod resolve;
pub mod update;
pub mod validate;
pub mod value;


// Re-export key types
pub use bounds::Bounds;
pub use builder::{ParameterBuilder, ParameterConfig};
pub use evaluator::{Evaluator, Instruction, Slot};
pub use expression::{
    BinaryOp, EvaluationContext, Expression, ExpressionError, Formula, SimpleContext, UnaryOp,
};
pub use parameter::{Parameter, ParameterKind};
pub use parameters::Parameters;
pub use value::Value;
