//! Parameters collection implementation
//!
//! This module provides the [`Parameters`] struct, an ordered collection of
//! [`Parameter`] entries keyed by name. Order is significant: after
//! [`Parameters::resolve`] it is a valid evaluation order, and it always fixes
//! the layout of the flat vectors exchanged with an optimizer.

use crate::error::{Error, Result};
use crate::parameters::builder::ParameterConfig;
use crate::parameters::evaluator::Evaluator;
use crate::parameters::expression::{EvaluationContext, ExpressionError, Formula};
use crate::parameters::parameter::{Parameter, ParameterKind};
use crate::parameters::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

/// An ordered collection of parameters for a fitting problem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    /// Map of parameter names to Parameter objects, in evaluation order
    pub(crate) params: IndexMap<String, Parameter>,

    /// Compiled evaluator for the current structure, dropped on every mutation
    #[serde(skip)]
    pub(crate) evaluator: Option<Arc<Evaluator>>,
}

impl Parameters {
    /// Create a new empty parameters collection
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::Parameters;
    ///
    /// let params = Parameters::new();
    /// assert_eq!(params.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn invalidate(&mut self) {
        if self.evaluator.take().is_some() {
            log::debug!("parameter set changed, dropping cached evaluator");
        }
    }

    /// Add a parameter under its own name
    ///
    /// An existing entry with the same name is replaced in place and returned;
    /// it keeps its position in the collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Parameter, Parameters};
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::free("a", 1.0));
    /// params.add(Parameter::constant("b", 2.0));
    /// let old = params.add(Parameter::constant("a", 5.0));
    ///
    /// assert!(old.is_some());
    /// assert_eq!(params.names(), vec!["a", "b"]);
    /// ```
    pub fn add(&mut self, param: Parameter) -> Option<Parameter> {
        let key = param.name().to_string();
        self.insert(&key, param)
    }

    /// Add several parameters, in iteration order
    pub fn add_many<I: IntoIterator<Item = Parameter>>(&mut self, params: I) {
        for param in params {
            self.add(param);
        }
    }

    /// Insert a parameter under an explicit key
    ///
    /// The key is not checked against the parameter's name;
    /// [`Parameters::validate`] reports disagreements.
    pub fn insert(&mut self, key: &str, param: Parameter) -> Option<Parameter> {
        self.invalidate();
        self.params.insert(key.to_string(), param)
    }

    /// Add an unbounded free parameter
    pub fn add_param(&mut self, name: &str, value: impl Into<Value>) -> Option<Parameter> {
        self.add(Parameter::free(name, value))
    }

    /// Add a free parameter with bounds
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Option<Parameter> {
        self.add(Parameter::bounded(name, value, min, max))
    }

    /// Add a derived parameter
    pub fn add_param_with_expr(&mut self, name: &str, expr: &str) -> Result<Option<Parameter>> {
        let param = Parameter::derived(name, expr)?;
        Ok(self.add(param))
    }

    /// Add a constant parameter
    pub fn add_constant(&mut self, name: &str, value: impl Into<Value>) -> Option<Parameter> {
        self.add(Parameter::constant(name, value))
    }

    /// Add an independent-variable placeholder
    pub fn add_independent(&mut self, name: &str) -> Option<Parameter> {
        self.add(Parameter::independent(name))
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// Get a mutable reference to a parameter by name
    ///
    /// Any cached evaluator is dropped, since the entry may change kind or shape.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.invalidate();
        self.params.get_mut(name)
    }

    /// Set the value of a named parameter
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.get_mut(name)
            .ok_or_else(|| Error::ParameterNotFound(name.to_string()))?
            .set_value(value)
    }

    /// Check if the collection contains a parameter with the given name
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Remove a parameter, keeping the order of the remaining entries
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        self.invalidate();
        self.params.shift_remove(name)
    }

    /// Get the number of parameters in the collection
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Names of all parameters, in collection order
    pub fn names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    /// Iterate over `(key, parameter)` pairs in collection order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Parameter)> {
        self.params.iter()
    }

    /// Names of the parameters of one kind, in collection order
    pub fn names_of_kind(&self, kind: ParameterKind) -> Vec<String> {
        self.params
            .iter()
            .filter(|(_, p)| p.kind() == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Evaluate an ad-hoc formula against the current parameter values
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Parameters, Value};
    ///
    /// let mut params = Parameters::new();
    /// params.add_param("x", 2.0);
    /// params.add_constant("y", 3.0);
    ///
    /// assert_eq!(params.eval_expression("x * y + 1").unwrap(), Value::Scalar(7.0));
    /// ```
    pub fn eval_expression(&self, expr: &str) -> Result<Value> {
        let formula = Formula::parse(expr).map_err(|e| Error::expression(expr, e))?;
        formula
            .evaluate(self)
            .map_err(|e| Error::expression(expr, e))
    }

    /// Recompute the cached value of every derived parameter
    ///
    /// Derived entries are evaluated in collection order against the values
    /// currently stored, so the collection must be resolved. The result also
    /// becomes the entry's cached shape. Values are written only once every
    /// formula has evaluated; on error the collection is unchanged.
    pub fn update_expressions(&mut self) -> Result<()> {
        let mut staged = Staged {
            params: &*self,
            results: HashMap::new(),
        };
        let mut updates = Vec::new();

        for (index, (key, param)) in self.params.iter().enumerate() {
            let Parameter::Derived { formula, .. } = param else {
                continue;
            };
            for dep in formula.dependencies() {
                match self.params.get_index_of(&dep) {
                    Some(position) if position >= index => {
                        return Err(Error::UnresolvedDependency {
                            parameter: key.clone(),
                            dependency: dep,
                        })
                    }
                    _ => {}
                }
            }
            let computed = formula
                .evaluate(&staged)
                .map_err(|e| Error::expression(key, e))?;
            staged.results.insert(key.as_str(), computed.clone());
            updates.push((index, computed));
        }

        self.invalidate();
        for (index, computed) in updates {
            if let Some(value) = self.params.get_index_mut(index).and_then(|(_, p)| p.value_mut()) {
                *value = computed;
            }
        }
        Ok(())
    }

    /// Reset every free parameter to its initial value
    pub fn reset(&mut self) {
        self.invalidate();
        for param in self.params.values_mut() {
            param.reset();
        }
    }

    /// Build a collection from a JSON object mapping names to [`ParameterConfig`]s
    ///
    /// Entries keep document order.
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::Parameters;
    ///
    /// let params = Parameters::from_config_json(r#"{
    ///     "x": {"independent": true},
    ///     "amp": {"value": 2.0, "min": 0.0},
    ///     "offset": {"value": 0.5, "kind": "constant"},
    ///     "peak": {"formula": "amp + offset"}
    /// }"#).unwrap();
    ///
    /// assert_eq!(params.names(), vec!["x", "amp", "offset", "peak"]);
    /// ```
    pub fn from_config_json(json: &str) -> Result<Self> {
        let configs: IndexMap<String, ParameterConfig> = serde_json::from_str(json)?;
        let mut params = Parameters::new();
        for (name, config) in &configs {
            params.add(config.build(name)?);
        }
        Ok(params)
    }

    /// Save the collection to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Serialize the collection to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a collection from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut json = String::new();
        file.read_to_string(&mut json)?;
        Self::from_json(&json)
    }

    /// Deserialize a collection from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl EvaluationContext for Parameters {
    fn get_variable(&self, name: &str) -> std::result::Result<&Value, ExpressionError> {
        self.params
            .get(name)
            .and_then(Parameter::value)
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.params.get(name).and_then(Parameter::value).is_some()
    }

    fn variable_names(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|(_, p)| p.value().is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Stored values overlaid with the results of an in-progress update
struct Staged<'a> {
    params: &'a Parameters,
    results: HashMap<&'a str, Value>,
}

impl EvaluationContext for Staged<'_> {
    fn get_variable(&self, name: &str) -> std::result::Result<&Value, ExpressionError> {
        match self.results.get(name) {
            Some(value) => Ok(value),
            None => self.params.get_variable(name),
        }
    }

    fn has_variable(&self, name: &str) -> bool {
        self.params.has_variable(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.params.variable_names()
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut params = Parameters::new();
        params.add_many(iter);
        params
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, param) in self.params.values().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{param}")?;
        }
        Ok(())
    }
}
