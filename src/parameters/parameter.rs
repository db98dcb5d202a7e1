//! Parameter definition and implementation
//!
//! This module provides the [`Parameter`] type, the fundamental building block
//! of the parameter system. A parameter is a fixed constant, a bounded free
//! variable varied by an optimizer, a value derived from a formula over other
//! parameters, or a placeholder for externally supplied data.

use crate::error::{Error, Result};
use crate::parameters::bounds::Bounds;
use crate::parameters::expression::Formula;
use crate::parameters::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The kind discriminant of a [`Parameter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Fixed value, never varied
    Constant,
    /// Bounded value supplied by the optimizer
    Free,
    /// Value computed from a formula
    Derived,
    /// Externally supplied data with no value of its own
    Independent,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::Constant => "Constant",
            ParameterKind::Free => "Free",
            ParameterKind::Derived => "Derived",
            ParameterKind::Independent => "Independent",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterKind {
    type Err = Error;

    /// Parse a kind name, ignoring case
    ///
    /// `"fixed"`, `"vary"` and `"expr"` are accepted as aliases.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "constant" | "fixed" => Ok(ParameterKind::Constant),
            "free" | "vary" => Ok(ParameterKind::Free),
            "derived" | "expr" => Ok(ParameterKind::Derived),
            "independent" => Ok(ParameterKind::Independent),
            _ => Err(Error::UnknownParameterKind(s.to_string())),
        }
    }
}

/// A named model parameter
///
/// Each variant owns its name. A derived parameter refers to other
/// parameters only by name, through its [`Formula`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Parameter {
    /// A value that never varies
    Constant { name: String, value: Value },

    /// A bounded value varied by the optimizer
    Free {
        name: String,
        value: Value,
        bounds: Bounds,
        /// Value at construction, restored by [`Parameter::reset`]
        init_value: Value,
    },

    /// A value recomputed from `formula`; `value` caches the last result
    Derived {
        name: String,
        value: Value,
        formula: Formula,
    },

    /// A named slot for externally supplied data
    Independent { name: String },
}

impl Parameter {
    /// Create a constant parameter
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Parameter, ParameterKind, Value};
    ///
    /// let param = Parameter::constant("offset", 3.0);
    /// assert_eq!(param.kind(), ParameterKind::Constant);
    /// assert_eq!(param.value(), Some(&Value::Scalar(3.0)));
    /// ```
    pub fn constant(name: &str, value: impl Into<Value>) -> Self {
        Parameter::Constant {
            name: name.to_string(),
            value: value.into(),
        }
    }

    /// Create an unbounded free parameter
    pub fn free(name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        Parameter::Free {
            name: name.to_string(),
            bounds: Bounds::unbounded_like(&value),
            init_value: value.clone(),
            value,
        }
    }

    /// Create a free parameter with element-wise bounds
    ///
    /// The bounds are not checked here; [`Parameter::validate`] reports
    /// shape and ordering problems.
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::Parameter;
    ///
    /// let param = Parameter::bounded("amplitude", 0.5, 0.0, 1.0);
    /// assert!(param.validate().is_ok());
    ///
    /// let param = Parameter::bounded("amplitude", 1.5, 0.0, 1.0);
    /// assert!(param.validate().is_err());
    /// ```
    pub fn bounded(
        name: &str,
        value: impl Into<Value>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        Parameter::Free {
            name: name.to_string(),
            bounds: Bounds::new(min, max),
            init_value: value.clone(),
            value,
        }
    }

    /// Create a derived parameter from formula source text
    ///
    /// The cached value starts as a scalar NaN; it is filled in by a commit
    /// or by [`Parameters::update_expressions`](crate::parameters::Parameters::update_expressions).
    /// The evaluator sizes the output from the formula itself.
    pub fn derived(name: &str, formula: &str) -> Result<Self> {
        Self::derived_with_value(name, formula, f64::NAN)
    }

    /// Create a derived parameter with an explicit cached value
    ///
    /// The evaluator falls back to the cached value's shape when the formula
    /// cannot be evaluated at the collection's current values.
    pub fn derived_with_value(name: &str, formula: &str, value: impl Into<Value>) -> Result<Self> {
        let formula = Formula::parse(formula).map_err(|e| Error::expression(name, e))?;
        Ok(Parameter::Derived {
            name: name.to_string(),
            value: value.into(),
            formula,
        })
    }

    /// Create an independent-variable placeholder
    pub fn independent(name: &str) -> Self {
        Parameter::Independent {
            name: name.to_string(),
        }
    }

    /// Get the name of the parameter
    pub fn name(&self) -> &str {
        match self {
            Parameter::Constant { name, .. }
            | Parameter::Free { name, .. }
            | Parameter::Derived { name, .. }
            | Parameter::Independent { name } => name,
        }
    }

    /// Set the name of the parameter
    pub fn set_name(&mut self, new_name: &str) {
        match self {
            Parameter::Constant { name, .. }
            | Parameter::Free { name, .. }
            | Parameter::Derived { name, .. }
            | Parameter::Independent { name } => *name = new_name.to_string(),
        }
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            Parameter::Constant { .. } => ParameterKind::Constant,
            Parameter::Free { .. } => ParameterKind::Free,
            Parameter::Derived { .. } => ParameterKind::Derived,
            Parameter::Independent { .. } => ParameterKind::Independent,
        }
    }

    /// Get the current value, `None` for an independent placeholder
    pub fn value(&self) -> Option<&Value> {
        match self {
            Parameter::Constant { value, .. }
            | Parameter::Free { value, .. }
            | Parameter::Derived { value, .. } => Some(value),
            Parameter::Independent { .. } => None,
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut Value> {
        match self {
            Parameter::Constant { value, .. }
            | Parameter::Free { value, .. }
            | Parameter::Derived { value, .. } => Some(value),
            Parameter::Independent { .. } => None,
        }
    }

    /// Replace the current value of a constant or free parameter
    ///
    /// No bounds check happens; run [`Parameter::validate`] afterwards if the
    /// value did not come from a trusted source. Derived values come from
    /// their formula and are refused here.
    pub fn set_value(&mut self, new_value: impl Into<Value>) -> Result<()> {
        match self {
            Parameter::Constant { value, .. } | Parameter::Free { value, .. } => {
                *value = new_value.into();
                Ok(())
            }
            Parameter::Derived { name, .. } => Err(Error::InvalidConfiguration {
                name: name.clone(),
                message: "a derived value is computed from its formula".to_string(),
            }),
            Parameter::Independent { name } => Err(Error::length_mismatch(
                format!("independent parameter '{name}'"),
                0,
                new_value.into().len(),
            )),
        }
    }

    /// Number of numeric elements, 0 for an independent placeholder
    pub fn len(&self) -> usize {
        self.value().map_or(0, Value::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds of a free parameter
    pub fn bounds(&self) -> Option<&Bounds> {
        match self {
            Parameter::Free { bounds, .. } => Some(bounds),
            _ => None,
        }
    }

    /// Formula of a derived parameter
    pub fn formula(&self) -> Option<&Formula> {
        match self {
            Parameter::Derived { formula, .. } => Some(formula),
            _ => None,
        }
    }

    /// Names of the other parameters this one references
    ///
    /// Empty for every kind except [`ParameterKind::Derived`].
    pub fn dependencies(&self) -> BTreeSet<String> {
        self.formula()
            .map(Formula::dependencies)
            .unwrap_or_default()
    }

    /// Reset a free parameter to its initial value, clamped into its current bounds
    pub fn reset(&mut self) {
        if let Parameter::Free {
            value,
            bounds,
            init_value,
            ..
        } = self
        {
            *value = bounds.clamp(init_value);
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Constant { name, value } => {
                write!(f, "Constant: name={name}, value={value}")
            }
            Parameter::Free {
                name,
                value,
                bounds,
                ..
            } => write!(
                f,
                "Free: name={name}, value={value}, min={}, max={}",
                bounds.min, bounds.max
            ),
            Parameter::Derived {
                name,
                value,
                formula,
            } => write!(f, "Derived: name={name}, value={value}, formula={formula}"),
            Parameter::Independent { name } => write!(f, "Independent: name={name}"),
        }
    }
}
