//! Parameter bounds implementation
//!
//! Free parameters carry an element-wise lower and upper bound with the same
//! shape as their value. Unbounded sides are represented by infinities and
//! serialize as `null`.

use crate::parameters::value::Value;
use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};

/// Element-wise bounds on a free parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value, element-wise
    pub min: Value,

    /// Maximum allowed value, element-wise
    pub max: Value,
}

impl Bounds {
    /// Create bounds from explicit `min` and `max` values
    ///
    /// No ordering check happens here; see [`Parameter::validate`](crate::parameters::Parameter::validate).
    pub fn new(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// Unbounded on both sides, with the same shape as `value`
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Bounds, Value};
    ///
    /// let bounds = Bounds::unbounded_like(&Value::from([1.0, 2.0]));
    /// assert_eq!(bounds.min, Value::from([f64::NEG_INFINITY, f64::NEG_INFINITY]));
    /// assert_eq!(bounds.max, Value::from([f64::INFINITY, f64::INFINITY]));
    /// ```
    pub fn unbounded_like(value: &Value) -> Self {
        Self {
            min: value.filled_like(NEG_INFINITY),
            max: value.filled_like(INFINITY),
        }
    }

    /// Check whether every element of `value` lies inside the bounds
    ///
    /// Returns `false` if the shapes disagree.
    pub fn contains(&self, value: &Value) -> bool {
        value.len() == self.min.len()
            && value.len() == self.max.len()
            && self.first_violation(value).is_none()
    }

    /// Index of the first element of `value` outside the bounds
    ///
    /// A missing bound element or a NaN counts as outside.
    pub fn first_violation(&self, value: &Value) -> Option<usize> {
        (0..value.len()).find(|&i| {
            let (lo, hi) = self.at(i);
            let v = value.get(i).unwrap_or(f64::NAN);
            !(lo <= v && v <= hi)
        })
    }

    /// The `(min, max)` pair at `index`, NaN where a side is missing
    pub(crate) fn at(&self, index: usize) -> (f64, f64) {
        (
            self.min.get(index).unwrap_or(f64::NAN),
            self.max.get(index).unwrap_or(f64::NAN),
        )
    }

    /// Clamp `value` element-wise into the bounds
    ///
    /// Elements without a matching bound are left untouched.
    pub fn clamp(&self, value: &Value) -> Value {
        let clamped: Vec<f64> = (0..value.len())
            .filter_map(|i| {
                let v = value.get(i)?;
                let lo = self.min.get(i).unwrap_or(NEG_INFINITY);
                let hi = self.max.get(i).unwrap_or(INFINITY);
                Some(if lo <= hi { v.max(lo).min(hi) } else { v })
            })
            .collect();
        value.reshaped_from(&clamped)
    }
}

/// Serialized form of one side of the bounds: infinities become `null`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BoundRepr {
    Scalar(Option<f64>),
    Vector(Vec<Option<f64>>),
}

impl BoundRepr {
    fn encode(value: &Value) -> Self {
        let finite = |x: f64| if x.is_infinite() { None } else { Some(x) };
        match value {
            Value::Scalar(x) => BoundRepr::Scalar(finite(*x)),
            Value::Vector(v) => BoundRepr::Vector(v.iter().map(|x| finite(*x)).collect()),
        }
    }

    fn decode(self, fill: f64) -> Value {
        match self {
            BoundRepr::Scalar(x) => Value::Scalar(x.unwrap_or(fill)),
            BoundRepr::Vector(v) => Value::from(v.into_iter().map(|x| x.unwrap_or(fill)).collect::<Vec<_>>()),
        }
    }
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Bounds", 2)?;
        state.serialize_field("min", &BoundRepr::encode(&self.min))?;
        state.serialize_field("max", &BoundRepr::encode(&self.max))?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<BoundRepr>,

            #[serde(default)]
            max: Option<BoundRepr>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;

        let min = helper
            .min
            .map_or(Value::Scalar(NEG_INFINITY), |r| r.decode(NEG_INFINITY));
        let max = helper
            .max
            .map_or(Value::Scalar(INFINITY), |r| r.decode(INFINITY));

        Ok(Bounds { min, max })
    }
}
