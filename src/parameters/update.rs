//! Flat-vector access to parameter values
//!
//! The full vector holds every constant, free and derived value in collection
//! order; the free vector holds only the free values. Placeholders appear in
//! neither.

use crate::error::{Error, Result};
use crate::parameters::parameter::ParameterKind;
use crate::parameters::parameters::Parameters;
use crate::parameters::value::Value;

impl Parameters {
    /// Length of the full value vector
    pub fn value_len(&self) -> usize {
        self.params.values().map(|p| p.len()).sum()
    }

    /// Length of the free value vector
    pub fn free_len(&self) -> usize {
        self.params
            .values()
            .filter(|p| p.kind() == ParameterKind::Free)
            .map(|p| p.len())
            .sum()
    }

    /// Current values of every non-placeholder entry, concatenated in order
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.value_len());
        for value in self.params.values().filter_map(|p| p.value()) {
            value.extend_into(&mut out);
        }
        out
    }

    /// Current values of the free entries, concatenated in order
    ///
    /// This is the evaluator's input domain and the usual optimizer start.
    pub fn free_values(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.free_len());
        for param in self.params.values() {
            if let (ParameterKind::Free, Some(value)) = (param.kind(), param.value()) {
                value.extend_into(&mut out);
            }
        }
        out
    }

    /// Overwrite every non-placeholder value from a flat vector
    ///
    /// `values` must hold exactly [`Parameters::value_len`] elements; nothing
    /// is written otherwise. Each entry keeps its shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Parameter, Parameters, Value};
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::free("a", 1.0));
    /// params.add(Parameter::constant("b", [2.0, 3.0]));
    ///
    /// params.update_from_vec(&[10.0, 20.0, 30.0]).unwrap();
    /// assert_eq!(params.get("a").unwrap().value(), Some(&Value::Scalar(10.0)));
    /// assert_eq!(params.to_vec(), vec![10.0, 20.0, 30.0]);
    ///
    /// assert!(params.update_from_vec(&[1.0]).is_err());
    /// assert_eq!(params.to_vec(), vec![10.0, 20.0, 30.0]);
    /// ```
    pub fn update_from_vec(&mut self, values: &[f64]) -> Result<()> {
        let expected = self.value_len();
        if values.len() != expected {
            return Err(Error::length_mismatch(
                "parameter value vector",
                expected,
                values.len(),
            ));
        }

        self.invalidate();
        let mut offset = 0;
        for param in self.params.values_mut() {
            if let Some(value) = param.value_mut() {
                let len = value.len();
                *value = value.reshaped_from(&values[offset..offset + len]);
                offset += len;
            }
        }
        Ok(())
    }

    /// Evaluate `free` with the cached evaluator and store the full result
    ///
    /// Typically called once with the optimizer's final vector. Derived
    /// entries take the shape the evaluator computed for them.
    pub fn commit(&mut self, free: &[f64]) -> Result<()> {
        let evaluator = self.evaluator()?;
        let full = evaluator.evaluate(free)?.to_vec();

        if let Some(slot) = evaluator
            .layout()
            .iter()
            .find(|slot| !self.params.contains_key(&slot.name))
        {
            return Err(Error::ParameterNotFound(slot.name.clone()));
        }

        self.invalidate();
        for slot in evaluator.layout() {
            let values = &full[slot.offset..slot.offset + slot.len];
            if let Some(value) = self.params.get_mut(&slot.name).and_then(|p| p.value_mut()) {
                *value = if value.len() == slot.len {
                    value.reshaped_from(values)
                } else {
                    Value::from(values)
                };
            }
        }
        Ok(())
    }
}
