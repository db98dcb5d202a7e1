//! Dependency resolution
//!
//! Orders a collection so that every derived parameter comes after the
//! parameters its formula references. Resolution runs in passes: each pass
//! moves every entry whose remaining dependencies are all resolved, in
//! current collection order, to the resolved list.

use crate::error::{Error, Result};
use crate::parameters::parameter::Parameter;
use crate::parameters::parameters::Parameters;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Compute an evaluation order as indices into `params`
///
/// Fails with [`Error::CircularDependency`] naming the entries that never
/// became ready, in collection order.
pub(crate) fn resolution_order(params: &IndexMap<String, Parameter>) -> Result<Vec<usize>> {
    let mut pending: Vec<(usize, BTreeSet<String>)> = params
        .values()
        .map(Parameter::dependencies)
        .enumerate()
        .collect();
    let mut order = Vec::with_capacity(params.len());
    let mut passes = 0;

    loop {
        let (ready, waiting): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|(_, deps)| deps.is_empty());
        pending = waiting;
        if ready.is_empty() {
            break;
        }
        passes += 1;

        for (index, _) in &ready {
            if let Some((name, _)) = params.get_index(*index) {
                for (_, deps) in pending.iter_mut() {
                    deps.remove(name);
                }
            }
        }
        order.extend(ready.into_iter().map(|(index, _)| index));
    }

    if !pending.is_empty() {
        let names: Vec<String> = pending
            .iter()
            .filter_map(|(index, _)| params.get_index(*index).map(|(name, _)| name.clone()))
            .collect();
        log::warn!(
            "dependency resolution stuck after {passes} passes on: {}",
            names.join(", ")
        );
        return Err(Error::CircularDependency { names });
    }

    log::debug!("resolved {} parameters in {passes} passes", order.len());
    Ok(order)
}

impl Parameters {
    /// Reorder the collection into a valid evaluation order
    ///
    /// Entries without dependencies keep their relative order. On failure
    /// the collection is left exactly as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use lmparams::parameters::{Parameter, Parameters};
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::derived("c", "a + b").unwrap());
    /// params.add(Parameter::free("a", 2.0));
    /// params.add(Parameter::constant("b", 3.0));
    ///
    /// params.resolve().unwrap();
    /// assert_eq!(params.names(), vec!["a", "b", "c"]);
    /// ```
    pub fn resolve(&mut self) -> Result<()> {
        let order = resolution_order(&self.params)?;
        if order.iter().enumerate().all(|(position, index)| position == *index) {
            return Ok(());
        }

        let mut entries: Vec<Option<(String, Parameter)>> =
            std::mem::take(&mut self.params).into_iter().map(Some).collect();
        self.params = order
            .iter()
            .filter_map(|index| entries[*index].take())
            .collect();
        log::debug!("resolved order: {}", self.names().join(", "));
        self.invalidate();
        Ok(())
    }

    /// Names a parameter's formula references, empty for non-derived entries
    pub fn dependencies(&self, name: &str) -> Option<BTreeSet<String>> {
        self.params.get(name).map(Parameter::dependencies)
    }

    /// Names of the entries whose formula references `name` directly
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.params
            .iter()
            .filter(|(_, param)| param.dependencies().contains(name))
            .map(|(key, _)| key.clone())
            .collect()
    }
}
