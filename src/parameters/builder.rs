//! Parameter construction from a name plus options
//!
//! [`ParameterBuilder`] is the typed entry point; [`ParameterConfig`] is the
//! same option set in a serde-friendly form, so parameter sets can be described
//! in JSON. The kind is either given explicitly or inferred: `independent`
//! selects a placeholder, a `formula` selects a derived parameter, anything
//! else is a free parameter.

use crate::error::{Error, Result};
use crate::parameters::bounds::Bounds;
use crate::parameters::parameter::{Parameter, ParameterKind};
use crate::parameters::value::Value;
use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};

/// Builder for a single [`Parameter`]
///
/// # Examples
///
/// ```
/// use lmparams::parameters::{ParameterBuilder, ParameterKind};
///
/// let param = ParameterBuilder::new("decay")
///     .value(0.5)
///     .min(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(param.kind(), ParameterKind::Free);
///
/// let param = ParameterBuilder::new("half_life")
///     .formula("ln(2) / decay")
///     .build()
///     .unwrap();
/// assert_eq!(param.kind(), ParameterKind::Derived);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParameterBuilder {
    name: String,
    value: Option<Value>,
    min: Option<Value>,
    max: Option<Value>,
    formula: Option<String>,
    independent: bool,
    kind: Option<ParameterKind>,
}

impl ParameterBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Initial value (scalar or vector)
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Lower bound; a scalar bound is broadcast to a vector value's shape
    pub fn min(mut self, min: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self
    }

    /// Upper bound; a scalar bound is broadcast to a vector value's shape
    pub fn max(mut self, max: impl Into<Value>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn formula(mut self, formula: &str) -> Self {
        self.formula = Some(formula.to_string());
        self
    }

    pub fn independent(mut self, independent: bool) -> Self {
        self.independent = independent;
        self
    }

    /// Explicit kind, overriding inference
    pub fn kind(mut self, kind: ParameterKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Explicit kind given by name
    ///
    /// Fails with [`Error::UnknownParameterKind`] for an unrecognized name.
    pub fn kind_str(self, kind: &str) -> Result<Self> {
        let kind = kind.parse()?;
        Ok(self.kind(kind))
    }

    fn inferred_kind(&self) -> ParameterKind {
        if let Some(kind) = self.kind {
            kind
        } else if self.independent {
            ParameterKind::Independent
        } else if self.formula.is_some() {
            ParameterKind::Derived
        } else {
            ParameterKind::Free
        }
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::InvalidConfiguration {
            name: self.name.clone(),
            message: message.into(),
        }
    }

    /// Build the parameter
    ///
    /// Options that make no sense for the selected kind are rejected rather
    /// than ignored.
    pub fn build(self) -> Result<Parameter> {
        let kind = self.inferred_kind();

        if self.independent && kind != ParameterKind::Independent {
            return Err(self.invalid(format!("`independent` set on a {kind} parameter")));
        }
        if self.formula.is_some() && kind != ParameterKind::Derived {
            return Err(self.invalid(format!("`formula` given for a {kind} parameter")));
        }
        if (self.min.is_some() || self.max.is_some()) && kind != ParameterKind::Free {
            return Err(self.invalid(format!("bounds given for a {kind} parameter")));
        }

        match kind {
            ParameterKind::Independent => {
                if self.value.is_some() {
                    return Err(self.invalid("an independent parameter carries no value"));
                }
                Ok(Parameter::independent(&self.name))
            }
            ParameterKind::Constant => {
                let value = self
                    .value
                    .clone()
                    .ok_or_else(|| self.invalid("a constant requires a value"))?;
                Ok(Parameter::constant(&self.name, value))
            }
            ParameterKind::Free => {
                let value = self
                    .value
                    .clone()
                    .ok_or_else(|| self.invalid("a free parameter requires a value"))?;
                let min = broadcast_bound(self.min, &value, NEG_INFINITY);
                let max = broadcast_bound(self.max, &value, INFINITY);
                Ok(Parameter::Free {
                    name: self.name,
                    bounds: Bounds { min, max },
                    init_value: value.clone(),
                    value,
                })
            }
            ParameterKind::Derived => {
                let formula = self
                    .formula
                    .as_deref()
                    .ok_or_else(|| self.invalid("a derived parameter requires a formula"))?;
                match &self.value {
                    Some(value) => Parameter::derived_with_value(&self.name, formula, value.clone()),
                    None => Parameter::derived(&self.name, formula),
                }
            }
        }
    }
}

/// Missing bounds are infinite; a scalar bound spreads over a vector value
fn broadcast_bound(bound: Option<Value>, value: &Value, fill: f64) -> Value {
    match bound {
        None => value.filled_like(fill),
        Some(Value::Scalar(b)) if !value.is_scalar() => value.filled_like(b),
        Some(b) => b,
    }
}

/// Serializable parameter options
///
/// ```
/// use lmparams::parameters::{ParameterConfig, ParameterKind};
///
/// let config: ParameterConfig =
///     serde_json::from_str(r#"{"value": 2.0, "min": 0.0, "kind": "free"}"#).unwrap();
/// let param = config.build("a").unwrap();
/// assert_eq!(param.kind(), ParameterKind::Free);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    #[serde(default)]
    pub independent: bool,

    /// Kind name, parsed with [`ParameterKind`]'s `FromStr`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ParameterConfig {
    /// Build a parameter called `name` from these options
    pub fn build(&self, name: &str) -> Result<Parameter> {
        let mut builder = ParameterBuilder::new(name).independent(self.independent);
        if let Some(kind) = &self.kind {
            builder = builder.kind_str(kind)?;
        }
        if let Some(value) = &self.value {
            builder = builder.value(value.clone());
        }
        if let Some(min) = &self.min {
            builder = builder.min(min.clone());
        }
        if let Some(max) = &self.max {
            builder = builder.max(max.clone());
        }
        if let Some(formula) = &self.formula {
            builder = builder.formula(formula);
        }
        builder.build()
    }
}
