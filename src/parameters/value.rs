//! Scalar and vector parameter values
//!
//! A parameter value is either a single number or a fixed-length sequence of
//! numbers. Arithmetic between values follows array broadcasting: a scalar (or
//! a length-1 vector) combines with every element of the other operand, and two
//! vectors combine position-wise when their lengths agree.

use crate::parameters::expression::ExpressionError;
use ndarray::{Array1, Zip};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The numeric value of a parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single number
    Scalar(f64),

    /// A fixed-length ordered sequence of numbers
    Vector(Array1<f64>),
}

impl Value {
    /// Number of elements held by this value (1 for a scalar)
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Vector(v) => v.len(),
        }
    }

    /// Whether the value holds no elements (only possible for an empty vector)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    /// Element at position `index`, if present
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Value::Scalar(x) if index == 0 => Some(*x),
            Value::Scalar(_) => None,
            Value::Vector(v) => v.get(index).copied(),
        }
    }

    /// Append every element to `out`
    pub fn extend_into(&self, out: &mut Vec<f64>) {
        match self {
            Value::Scalar(x) => out.push(*x),
            Value::Vector(v) => out.extend(v.iter().copied()),
        }
    }

    /// All elements as a flat vector
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        self.extend_into(&mut out);
        out
    }

    /// A value with the same shape as `self`, every element set to `fill`
    pub fn filled_like(&self, fill: f64) -> Value {
        match self {
            Value::Scalar(_) => Value::Scalar(fill),
            Value::Vector(v) => Value::Vector(Array1::from_elem(v.len(), fill)),
        }
    }

    /// A value with the same shape as `self`, holding the elements of `values`
    ///
    /// The caller guarantees `values.len() == self.len()`.
    pub(crate) fn reshaped_from(&self, values: &[f64]) -> Value {
        match self {
            Value::Scalar(_) => Value::Scalar(values[0]),
            Value::Vector(_) => Value::Vector(Array1::from(values.to_vec())),
        }
    }

    pub(crate) fn contains_zero(&self) -> bool {
        match self {
            Value::Scalar(x) => *x == 0.0,
            Value::Vector(v) => v.iter().any(|x| *x == 0.0),
        }
    }

    /// Apply `f` to every element
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(f(*x)),
            Value::Vector(v) => Value::Vector(v.mapv(f)),
        }
    }

    /// Combine two values element-wise with broadcasting
    pub fn zip_with<F: Fn(f64, f64) -> f64>(
        &self,
        other: &Value,
        f: F,
    ) -> Result<Value, ExpressionError> {
        let combined = match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(*a, *b)),
            (Value::Scalar(a), Value::Vector(v)) => Value::Vector(v.mapv(|x| f(*a, x))),
            (Value::Vector(v), Value::Scalar(b)) => Value::Vector(v.mapv(|x| f(x, *b))),
            (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => {
                Value::Vector(Zip::from(a).and(b).map_collect(|&x, &y| f(x, y)))
            }
            (Value::Vector(a), Value::Vector(b)) if a.len() == 1 => {
                let a0 = a[0];
                Value::Vector(b.mapv(|y| f(a0, y)))
            }
            (Value::Vector(a), Value::Vector(b)) if b.len() == 1 => {
                let b0 = b[0];
                Value::Vector(a.mapv(|x| f(x, b0)))
            }
            (Value::Vector(a), Value::Vector(b)) => {
                return Err(ExpressionError::ShapeMismatch {
                    left: a.len(),
                    right: b.len(),
                })
            }
        };
        Ok(combined)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(x)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(Array1::from(v))
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Value::Vector(Array1::from(v.to_vec()))
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        Value::Vector(Array1::from(v.to_vec()))
    }
}

impl From<Array1<f64>> for Value {
    fn from(v: Array1<f64>) -> Self {
        Value::Vector(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(x) => write!(f, "{x}"),
            Value::Vector(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// Scalars serialize as a bare number, vectors as a JSON array
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Scalar(x) => serializer.serialize_f64(*x),
            Value::Vector(v) => serializer.collect_seq(v.iter()),
        }
    }
}

// JSON has no NaN, serde_json writes non-finite numbers as `null`
#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Scalar(Option<f64>),
    Vector(Vec<Option<f64>>),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match ValueRepr::deserialize(deserializer)? {
            ValueRepr::Scalar(x) => Value::Scalar(x.unwrap_or(f64::NAN)),
            ValueRepr::Vector(v) => Value::from(
                v.into_iter()
                    .map(|x| x.unwrap_or(f64::NAN))
                    .collect::<Vec<_>>(),
            ),
        })
    }
}
