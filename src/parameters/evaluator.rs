//! Compiled evaluation of a resolved parameter collection
//!
//! [`Evaluator::compile`] turns a collection into a flat list of
//! [`Instruction`]s. Running it maps the optimizer's vector of free values to
//! the full vector of every constant, free and derived value, in collection
//! order. The evaluator owns a snapshot of what it needs, so it can be shared
//! across threads while the collection itself is modified.

use crate::error::{Error, Result};
use crate::parameters::expression::{EvaluationContext, ExprResult, ExpressionError, Formula};
use crate::parameters::parameter::{Parameter, ParameterKind};
use crate::parameters::parameters::Parameters;
use crate::parameters::value::Value;
use ndarray::Array1;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// A single step of a compiled evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Bind `len` elements of the free vector starting at `offset`
    ///
    /// A scalar free parameter binds a scalar.
    LoadFreeSlice {
        offset: usize,
        len: usize,
        scalar: bool,
    },

    /// Bind a constant value
    LoadConstant(Value),

    /// Evaluate a formula; `bindings` maps each referenced name to an earlier slot
    EvalFormula {
        name: String,
        formula: Formula,
        bindings: Vec<(String, usize)>,
        len: usize,
    },

    /// Concatenate every bound slot into the output vector
    Concat,
}

/// Position of one entry in the evaluator's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub kind: ParameterKind,
    /// Offset into the output vector
    pub offset: usize,
    pub len: usize,
}

/// A compiled mapping from free values to the full value vector
#[derive(Debug, Clone)]
pub struct Evaluator {
    instructions: Vec<Instruction>,
    layout: Vec<Slot>,
    free_len: usize,
    output_len: usize,
}

/// Variables visible to one formula: its bindings over the slots bound so far
struct Bound<'a> {
    bindings: &'a [(String, usize)],
    slots: &'a [Value],
}

impl EvaluationContext for Bound<'_> {
    fn get_variable(&self, name: &str) -> ExprResult<&Value> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .and_then(|(_, slot)| self.slots.get(*slot))
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.bindings.iter().any(|(bound, _)| bound == name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.bindings.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Evaluator {
    /// Compile a resolved collection
    ///
    /// Every derived entry must come after the entries it references,
    /// otherwise this fails with [`Error::UnresolvedDependency`]. A reference
    /// to a placeholder or to a name not in the collection fails with an
    /// undefined-variable expression error.
    pub fn compile(params: &Parameters) -> Result<Self> {
        let mut instructions = Vec::with_capacity(params.len() + 1);
        let mut layout = Vec::with_capacity(params.len());
        let mut slot_of: HashMap<&str, usize> = HashMap::new();
        // Current value of every slot, used to size derived outputs
        let mut shapes: Vec<Value> = Vec::with_capacity(params.len());
        let mut free_len = 0;
        let mut output_len = 0;

        for (position, (key, param)) in params.iter().enumerate() {
            let (instruction, shape) = match param {
                Parameter::Independent { .. } => continue,
                Parameter::Free { value, .. } => {
                    let load = Instruction::LoadFreeSlice {
                        offset: free_len,
                        len: value.len(),
                        scalar: value.is_scalar(),
                    };
                    free_len += value.len();
                    (load, value.clone())
                }
                Parameter::Constant { value, .. } => {
                    (Instruction::LoadConstant(value.clone()), value.clone())
                }
                Parameter::Derived { formula, value, .. } => {
                    let bindings = formula
                        .dependencies()
                        .into_iter()
                        .map(|dep| match slot_of.get(dep.as_str()) {
                            Some(slot) => Ok((dep, *slot)),
                            None => Err(unbound(params, key, position, dep)),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    let shape = infer_shape(key, formula, &bindings, &shapes, value);
                    let eval = Instruction::EvalFormula {
                        name: key.clone(),
                        formula: formula.clone(),
                        bindings,
                        len: shape.len(),
                    };
                    (eval, shape)
                }
            };

            let len = shape.len();
            shapes.push(shape);
            slot_of.insert(key.as_str(), layout.len());
            layout.push(Slot {
                name: key.clone(),
                kind: param.kind(),
                offset: output_len,
                len,
            });
            instructions.push(instruction);
            output_len += len;
        }
        instructions.push(Instruction::Concat);

        log::debug!(
            "compiled evaluator: {} instructions, {free_len} free -> {output_len} values",
            instructions.len()
        );

        Ok(Self {
            instructions,
            layout,
            free_len,
            output_len,
        })
    }

    /// Map a vector of free values to the full value vector
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Evaluator, Parameter, Parameters};
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::free("A", 2.0));
    /// params.add(Parameter::constant("B", 3.0));
    /// params.add(Parameter::derived("C", "A + B").unwrap());
    ///
    /// let evaluator = Evaluator::compile(&params).unwrap();
    /// let full = evaluator.evaluate(&[5.0]).unwrap();
    /// assert_eq!(full.to_vec(), vec![5.0, 3.0, 8.0]);
    /// ```
    pub fn evaluate(&self, free: &[f64]) -> Result<Array1<f64>> {
        if free.len() != self.free_len {
            return Err(Error::length_mismatch(
                "free parameter vector",
                self.free_len,
                free.len(),
            ));
        }

        let mut slots: Vec<Value> = Vec::with_capacity(self.layout.len());
        let mut output = Vec::with_capacity(self.output_len);

        for instruction in &self.instructions {
            match instruction {
                Instruction::LoadFreeSlice {
                    offset,
                    len,
                    scalar,
                } => {
                    let slice = &free[*offset..*offset + *len];
                    slots.push(match (scalar, slice.first()) {
                        (true, Some(x)) => Value::Scalar(*x),
                        _ => Value::from(slice),
                    });
                }
                Instruction::LoadConstant(value) => slots.push(value.clone()),
                Instruction::EvalFormula {
                    name,
                    formula,
                    bindings,
                    len,
                } => {
                    let context = Bound {
                        bindings,
                        slots: &slots,
                    };
                    let value = formula
                        .evaluate(&context)
                        .map_err(|e| Error::expression(name, e))?;
                    if value.len() != *len {
                        return Err(Error::length_mismatch(
                            format!("result of derived parameter '{name}'"),
                            *len,
                            value.len(),
                        ));
                    }
                    slots.push(value);
                }
                Instruction::Concat => {
                    for value in &slots {
                        value.extend_into(&mut output);
                    }
                }
            }
        }

        Ok(Array1::from(output))
    }

    /// Evaluate a batch of free vectors in parallel
    ///
    /// Results keep the order of `trials`; the first failure is returned.
    pub fn evaluate_many(&self, trials: &[Vec<f64>]) -> Result<Vec<Array1<f64>>> {
        trials.par_iter().map(|free| self.evaluate(free)).collect()
    }

    /// The compiled instruction list
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Output position of every entry, in collection order
    pub fn layout(&self) -> &[Slot] {
        &self.layout
    }

    /// Required length of the free vector
    pub fn free_len(&self) -> usize {
        self.free_len
    }

    /// Length of the full output vector
    pub fn output_len(&self) -> usize {
        self.output_len
    }
}

/// Output shape of a derived entry at the collection's current values
///
/// The cached value is used when the formula cannot be evaluated there.
fn infer_shape(
    name: &str,
    formula: &Formula,
    bindings: &[(String, usize)],
    shapes: &[Value],
    cached: &Value,
) -> Value {
    let context = Bound {
        bindings,
        slots: shapes,
    };
    match formula.evaluate(&context) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("keeping cached shape of '{name}': {e}");
            cached.clone()
        }
    }
}

fn unbound(params: &Parameters, key: &str, position: usize, dep: String) -> Error {
    match params.params.get_full(dep.as_str()) {
        Some((index, _, param)) if index >= position && param.kind() != ParameterKind::Independent => {
            Error::UnresolvedDependency {
                parameter: key.to_string(),
                dependency: dep,
            }
        }
        _ => Error::expression(key, ExpressionError::UndefinedVariable { name: dep }),
    }
}

impl Parameters {
    /// The compiled evaluator for the current collection
    ///
    /// The collection is validated and compiled on first use; the result is
    /// cached until the collection is modified.
    pub fn evaluator(&mut self) -> Result<Arc<Evaluator>> {
        if let Some(evaluator) = &self.evaluator {
            return Ok(Arc::clone(evaluator));
        }

        self.validate()?;
        let evaluator = Arc::new(Evaluator::compile(self)?);
        self.evaluator = Some(Arc::clone(&evaluator));
        log::debug!("cached evaluator for {} parameters", self.len());
        Ok(evaluator)
    }

    /// Validate, resolve and compile in one step
    pub fn prepare(&mut self) -> Result<Arc<Evaluator>> {
        self.validate()?;
        self.resolve()?;
        self.evaluator()
    }
}
