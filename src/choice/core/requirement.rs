//! Data requirements — what each aspect's array must look like.
//!
//! Purpose
//! -------
//! Describe, per aspect, the dimensionality, element type, alternative-axis
//! size, and variable names a data array must expose ([`Requirement`]), and
//! decide whether a concrete [`DataArray`] satisfies it.
//!
//! Key behaviors
//! -------------
//! - [`Requirement::satisfied_by`] compares dimensionality, element type,
//!   alternative axis, and variables, reporting the first mismatch as a
//!   [`Mismatch`].
//! - [`RequirementSet`] is the ordered aspect → requirement map returned by
//!   the requirement resolver; it serializes to JSON keyed by aspect label so
//!   a data-loading collaborator can consume it directly.
//! - [`ProvisionStatus`] is the three-valued provisioning summary.
//!
//! Invariants & assumptions
//! ------------------------
//! - `n_alts == None` accepts any alternative-axis length.
//! - A requirement with no variables accepts anonymous arrays.
use crate::choice::core::{aspect::Aspect, aspect::ElementType, data::DataArray};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aspect → requirement map, ordered by aspect.
pub type RequirementSet = BTreeMap<Aspect, Requirement>;

/// Expected layout of one aspect's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub ndim: usize,
    pub element_type: ElementType,
    /// Expected alternative-axis length (3D only); `None` accepts any.
    pub n_alts: Option<usize>,
    /// Variables the array must expose, in first-seen order.
    pub variables: Vec<String>,
}

/// First reason an array fails a requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Dimensionality { expected: usize, actual: usize },
    ElementType { expected: ElementType, actual: ElementType },
    Alternatives { expected: usize, actual: Option<usize> },
    MissingVariable { name: String },
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::Dimensionality { expected, actual } => {
                write!(f, "expected {expected} dimensions, got {actual}")
            }
            Mismatch::ElementType { expected, actual } => {
                write!(f, "expected {expected} elements, got {actual}")
            }
            Mismatch::Alternatives { expected, actual } => match actual {
                Some(actual) => write!(f, "expected {expected} alternatives, got {actual}"),
                None => write!(f, "expected {expected} alternatives, got no alternative axis"),
            },
            Mismatch::MissingVariable { name } => write!(f, "variable '{name}' is missing"),
        }
    }
}

impl Requirement {
    pub fn new(ndim: usize, element_type: ElementType, n_alts: Option<usize>) -> Requirement {
        Requirement { ndim, element_type, n_alts, variables: Vec::new() }
    }

    pub fn with_variables(mut self, variables: Vec<String>) -> Requirement {
        self.variables = variables;
        self
    }

    /// Check `array` against this requirement.
    ///
    /// Returns the first mismatch in the order dimensionality, element type,
    /// alternative axis, variables.
    pub fn satisfied_by(&self, array: &DataArray) -> Result<(), Mismatch> {
        if array.ndim() != self.ndim {
            return Err(Mismatch::Dimensionality { expected: self.ndim, actual: array.ndim() });
        }
        if array.element_type() != self.element_type {
            return Err(Mismatch::ElementType {
                expected: self.element_type,
                actual: array.element_type(),
            });
        }
        if let Some(expected) = self.n_alts {
            if array.n_alts() != Some(expected) {
                return Err(Mismatch::Alternatives { expected, actual: array.n_alts() });
            }
        }
        if let Some(name) = self.variables.iter().find(|name| !array.has_variable(name)) {
            return Err(Mismatch::MissingVariable { name: name.clone() });
        }
        Ok(())
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}D {}", self.ndim, self.element_type)?;
        if let Some(n_alts) = self.n_alts {
            write!(f, ", {n_alts} alternatives")?;
        }
        if !self.variables.is_empty() {
            write!(f, ", variables: {}", self.variables.join(", "))?;
        }
        Ok(())
    }
}

/// Three-valued provisioning summary.
///
/// Codes follow the external status interface: `1` satisfied, `0` required
/// data missing, `-1` malformed data present. Malformed wins over missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisionStatus {
    Missing,
    Satisfied,
    Malformed,
}

impl ProvisionStatus {
    pub fn code(self) -> i8 {
        match self {
            ProvisionStatus::Missing => 0,
            ProvisionStatus::Satisfied => 1,
            ProvisionStatus::Malformed => -1,
        }
    }

    pub fn is_satisfied(self) -> bool {
        self == ProvisionStatus::Satisfied
    }
}
