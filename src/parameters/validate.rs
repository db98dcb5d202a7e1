//! Validation of single parameters and whole collections
//!
//! Validation is read-only. It reports the first problem found and leaves the
//! parameters untouched.

use crate::error::{Error, Result};
use crate::parameters::bounds::Bounds;
use crate::parameters::parameter::Parameter;
use crate::parameters::parameters::Parameters;
use crate::parameters::value::Value;

impl Parameter {
    /// Check this parameter in isolation
    ///
    /// Constants and placeholders always pass. A free parameter is checked for
    /// matching `value`/`min`/`max` lengths, then `min <= max`, then
    /// `min <= value <= max`, element by element. A derived parameter is
    /// checked for unknown functions and wrong argument counts.
    pub fn validate(&self) -> Result<()> {
        match self {
            Parameter::Constant { .. } | Parameter::Independent { .. } => Ok(()),
            Parameter::Free {
                name,
                value,
                bounds,
                ..
            } => validate_free(name, value, bounds),
            Parameter::Derived { name, formula, .. } => formula
                .expr()
                .check()
                .map_err(|e| Error::expression(name, e)),
        }
    }
}

fn validate_free(name: &str, value: &Value, bounds: &Bounds) -> Result<()> {
    let len = value.len();
    for (side, bound) in [("min", &bounds.min), ("max", &bounds.max)] {
        if bound.len() != len {
            return Err(Error::length_mismatch(
                format!("{side} of parameter '{name}'"),
                len,
                bound.len(),
            ));
        }
    }

    // NaN never satisfies a comparison, so it fails both checks
    for index in 0..len {
        let (min, max) = bounds.at(index);
        if !(min <= max) {
            return Err(Error::InvalidBounds {
                name: name.to_string(),
                index,
                min,
                max,
            });
        }
    }

    if let Some(index) = bounds.first_violation(value) {
        let (min, max) = bounds.at(index);
        return Err(Error::OutOfBounds {
            name: name.to_string(),
            index,
            value: value.get(index).unwrap_or(f64::NAN),
            min,
            max,
        });
    }

    Ok(())
}

impl Parameters {
    /// Check the whole collection
    ///
    /// Every key must equal its entry's own name; this is checked for all
    /// entries before anything else. Then each entry is validated in
    /// collection order, and finally every name referenced by a formula must
    /// be present in the collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Parameter, Parameters};
    /// use lmparams::Error;
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::bounded("a", 0.5, 0.0, 1.0));
    /// params.add(Parameter::derived("b", "a * c").unwrap());
    ///
    /// assert!(matches!(
    ///     params.validate(),
    ///     Err(Error::UndefinedReference { .. })
    /// ));
    /// ```
    pub fn validate(&self) -> Result<()> {
        for (key, param) in &self.params {
            if key != param.name() {
                return Err(Error::NameKeyMismatch {
                    key: key.clone(),
                    name: param.name().to_string(),
                });
            }
        }

        for param in self.params.values() {
            param.validate()?;
        }

        for (key, param) in &self.params {
            if let Some(reference) = param
                .dependencies()
                .into_iter()
                .find(|dep| !self.params.contains_key(dep))
            {
                return Err(Error::UndefinedReference {
                    parameter: key.clone(),
                    reference,
                });
            }
        }

        Ok(())
    }
}
