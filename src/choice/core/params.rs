//! Parameter registry — named scalar parameters shared between models.
//!
//! This module provides the registry that the binder writes into and the
//! setup orchestrator reads coefficient values from.
//!
//! ## What this module defines
//! - [`Parameter`]: a named scalar with its current value, the value it was
//!   created with, and a hold-fast flag.
//! - [`ParameterId`]: stable index of a parameter inside its registry.
//! - [`ParameterRegistry`]: get-or-create by name, with at most one
//!   parameter per name.
//! - [`SharedRegistry`]: `Rc<RefCell<ParameterRegistry>>`, the handle several
//!   models hold to share parameters by name.
//!
//! ## Conventions
//! - Ids are assigned in creation order and never reused; the registry never
//!   deletes parameters.
//! - New parameters start at `0.0`.
//! - Values must be finite; hold-fast parameters reject updates.
use crate::choice::errors::{ParamError, ParamResult};
use indexmap::IndexMap;
use ndarray::Array1;
use std::{cell::RefCell, rc::Rc};

/// Registry handle shared between models.
pub type SharedRegistry = Rc<RefCell<ParameterRegistry>>;

/// Stable index of a parameter in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(pub usize);

impl std::fmt::Display for ParameterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named scalar parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Current estimated value.
    pub value: f64,
    /// Value at creation.
    pub initial_value: f64,
    /// When `true`, `set_value` is rejected.
    pub holdfast: bool,
}

impl Parameter {
    fn new(name: &str, value: f64) -> Parameter {
        Parameter { name: name.to_string(), value, initial_value: value, holdfast: false }
    }
}

/// Table of named parameters with get-or-create semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterRegistry {
    params: IndexMap<String, Parameter>,
}

impl ParameterRegistry {
    pub fn new() -> ParameterRegistry {
        ParameterRegistry::default()
    }

    /// Empty registry behind a shared handle.
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(ParameterRegistry::new()))
    }

    /// Id of the parameter called `name`, creating it at `0.0` if absent.
    pub fn get_or_create(&mut self, name: &str) -> ParameterId {
        self.get_or_create_at(name, 0.0)
    }

    /// Like [`get_or_create`](Self::get_or_create), but a new parameter
    /// starts at `initial`. An existing parameter keeps its value.
    pub fn get_or_create_at(&mut self, name: &str, initial: f64) -> ParameterId {
        if let Some(index) = self.params.get_index_of(name) {
            return ParameterId(index);
        }
        let (index, _) = self.params.insert_full(name.to_string(), Parameter::new(name, initial));
        ParameterId(index)
    }

    pub fn id_of(&self, name: &str) -> Option<ParameterId> {
        self.params.get_index_of(name).map(ParameterId)
    }

    pub fn get(&self, id: ParameterId) -> ParamResult<&Parameter> {
        self.params
            .get_index(id.0)
            .map(|(_, param)| param)
            .ok_or(ParamError::UnknownParameterId { id: id.0, len: self.params.len() })
    }

    pub fn by_name(&self, name: &str) -> ParamResult<&Parameter> {
        self.params.get(name).ok_or_else(|| ParamError::UnknownParameter { name: name.to_string() })
    }

    /// Current value of the parameter with id `id`.
    pub fn value(&self, id: ParameterId) -> ParamResult<f64> {
        Ok(self.get(id)?.value)
    }

    /// Set the current value of `name`.
    ///
    /// Errors
    /// ------
    /// - `ParamError::UnknownParameter` if `name` is not registered.
    /// - `ParamError::NonFiniteValue` if `value` is NaN or ±∞.
    /// - `ParamError::HeldFast` if the parameter is held fast.
    pub fn set_value(&mut self, name: &str, value: f64) -> ParamResult<()> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParamError::UnknownParameter { name: name.to_string() })?;
        if !value.is_finite() {
            return Err(ParamError::NonFiniteValue { name: name.to_string(), value });
        }
        if param.holdfast {
            return Err(ParamError::HeldFast { name: name.to_string() });
        }
        param.value = value;
        Ok(())
    }

    /// Mark `name` as held fast (or release it).
    pub fn set_holdfast(&mut self, name: &str, holdfast: bool) -> ParamResult<()> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParamError::UnknownParameter { name: name.to_string() })?;
        param.holdfast = holdfast;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, &Parameter)> {
        self.params.values().enumerate().map(|(i, p)| (ParameterId(i), p))
    }

    /// Current values in id order.
    pub fn values(&self) -> Array1<f64> {
        self.params.values().map(|p| p.value).collect()
    }
}
