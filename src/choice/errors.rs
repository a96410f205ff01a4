//! Errors for discrete-choice model setup (specification, provisioning,
//! lifecycle, and collaborator failures).
//!
//! This module defines a model error type, [`ChoiceError`], and a parameter
//! error type, [`ParamError`], used across the setup layer. Both derive
//! `Display`/`Error` via `thiserror` and convert to `PyErr` when the
//! `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Slots are 0-based** (match Rust/NumPy).
//! - Specification errors are raised at the first offending term; they are
//!   never aggregated.
//! - Provisioning errors are aggregated: [`ChoiceError::ProvisioningFailed`]
//!   carries every [`ProvisionIssue`] found in one pass.
//! - Alternative and edge codes are carried as [`AltCode`] values.
use crate::choice::core::{aspect::Aspect, requirement::ProvisionStatus, term::AltCode};
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};
use thiserror::Error;

/// Crate-wide result alias for model setup operations that may produce
/// [`ChoiceError`].
pub type ChoiceResult<T> = Result<T, ChoiceError>;

/// Result alias for registry and parameter-value paths that may produce
/// [`ParamError`].
pub type ParamResult<T> = Result<T, ParamError>;

/// One per-aspect problem found while provisioning.
///
/// Collected by the provisioning validator so that a caller sees every
/// problem at once.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProvisionIssue {
    /// The aspect is required but no array was supplied.
    #[error("data for {aspect} is needed but not provisioned")]
    Missing { aspect: Aspect },

    /// An array was supplied but it is incompatible with the requirement.
    #[error("data for {aspect} is provisioned by an array that does not satisfy the need ({reason})")]
    Unsatisfied { aspect: Aspect, reason: String },
}

impl ProvisionIssue {
    /// The aspect this issue refers to.
    pub fn aspect(&self) -> Aspect {
        match self {
            ProvisionIssue::Missing { aspect } | ProvisionIssue::Unsatisfied { aspect, .. } => {
                *aspect
            }
        }
    }
}

fn render_issues(issues: &[ProvisionIssue]) -> String {
    issues.iter().map(|issue| format!("\n{issue}")).collect()
}

fn render_case_counts(counts: &[(Aspect, usize)]) -> String {
    counts.iter().map(|(aspect, n)| format!("{aspect}={n}")).collect::<Vec<_>>().join(", ")
}

fn render_provided(provided: &Option<String>) -> String {
    match provided {
        Some(description) => format!("provides <{description}>"),
        None => "not provided".to_string(),
    }
}

fn render_status(status: &ProvisionStatus) -> i8 {
    status.code()
}

fn render_alternative(altname: &Option<String>, altcode: &Option<AltCode>) -> String {
    match (altname, altcode) {
        (Some(name), Some(code)) => format!("name '{name}' / code {code}"),
        (Some(name), None) => format!("name '{name}'"),
        (None, Some(code)) => format!("code {code}"),
        (None, None) => "no alternative".to_string(),
    }
}

/// Unified error type for model setup.
///
/// Covers specification errors (unknown variables, unresolvable alternatives
/// or edges), network rebuild failures, data-array construction, aggregated
/// provisioning failures, lifecycle violations, option validation, and
/// dataset collaborator failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChoiceError {
    // ---- Specification ----
    /// A term references a variable the attached data array does not expose.
    #[error("variable '{variable}' is not exposed by the {aspect} data")]
    UnknownVariable { aspect: Aspect, variable: String },

    /// A term references a variable the linked dataset does not carry.
    #[error("variable '{variable}' is not available in the {space} data space of the dataset")]
    UnknownDatasetVariable { space: &'static str, variable: String },

    /// A CO term names neither an alternative nor an alternative code.
    #[error(
        "{aspect} input for parameter '{param_name}' does not specify an alternative; \
         inputs in the CO space need to identify an alternative"
    )]
    MissingAlternative { aspect: Aspect, param_name: String },

    /// A CO term names an alternative the network cannot resolve.
    #[error(
        "{aspect} input for parameter '{param_name}' references an unknown alternative ({})",
        render_alternative(.altname, .altcode)
    )]
    UnresolvedAlternative {
        aspect: Aspect,
        param_name: String,
        altname: Option<String>,
        altcode: Option<AltCode>,
    },

    /// An allocation term does not name an edge.
    #[error("allocation input for parameter '{param_name}' does not specify a network link")]
    MissingEdge { param_name: String },

    /// An allocation term names an edge that is not a competitive network link.
    #[error(
        "allocation input for parameter '{param_name}' does not specify a valid network link \
         ({upcode} -> {dncode})"
    )]
    UnresolvedEdge { param_name: String, upcode: AltCode, dncode: AltCode },

    // ---- Network ----
    /// A nest or edge declaration references a code that is not in the network.
    #[error("network node with code {code} is not defined")]
    UnknownNetworkNode { code: AltCode },

    /// Two nodes were declared with the same code.
    #[error("network node code {code} is declared more than once")]
    DuplicateNetworkNode { code: AltCode },

    /// A declared edge would make a node its own ancestor.
    #[error("network edge {upcode} -> {dncode} introduces a cycle")]
    NetworkCycle { upcode: AltCode, dncode: AltCode },

    /// Structural parameter vector length does not match the branch count.
    #[error("structural parameter length mismatch: expected {expected}, got {actual}")]
    StructuralLengthMismatch { expected: usize, actual: usize },

    // ---- Data arrays ----
    /// Variable names do not match the length of the variable axis.
    #[error("variable axis length mismatch: array has {expected} variables, got {actual} names")]
    VariableAxisMismatch { expected: usize, actual: usize },

    /// Only 1D, 2D, and 3D case-indexed arrays are supported.
    #[error("data arrays must be 1, 2 or 3 dimensional; got {ndim}")]
    UnsupportedDimensionality { ndim: usize },

    // ---- Provisioning ----
    /// Aggregated provisioning failure (one line per issue).
    #[error("provisioning error:{}", render_issues(.issues))]
    ProvisioningFailed { issues: Vec<ProvisionIssue> },

    /// Successfully matched arrays disagree on the number of cases.
    #[error("provisioning error: inconsistent numbers of cases ({})", render_case_counts(.counts))]
    InconsistentCaseCounts { counts: Vec<(Aspect, usize)> },

    /// Fail-fast provisioning query: first problem found.
    #[error("{aspect} is provisioned incorrectly, needs <{requirement}> but {}", render_provided(.provided))]
    NotProvisioned { aspect: Aspect, requirement: String, provided: Option<String> },

    /// Data accessor called with a label that is not an aspect.
    #[error("{label} is not a valid label for model data")]
    UnknownDataLabel { label: String },

    // ---- Lifecycle ----
    /// `set_up` was called while provisioning is incomplete or malformed.
    #[error("data not provisioned (status {})", render_status(.status))]
    SetupWithoutProvisioning { status: ProvisionStatus },

    /// An operation needs a higher setup level than the model has reached.
    #[error("model must be set up to level {required}; current level is {level}")]
    NotSetUp { required: u8, level: u8 },

    /// An operation needs a dataset collaborator but none is linked.
    #[error("a dataset must be linked to this model to do this")]
    NoDatasetLinked,

    // ---- Options ----
    /// Target mean weight must be finite and > 0.
    #[error("mean weight must be finite and > 0; got: {value}")]
    InvalidMeanWeight { value: f64 },

    /// Dispatch worker count must be at least 1.
    #[error("dispatch worker count must be at least 1; got: {value}")]
    InvalidDispatchWorkers { value: usize },

    // ---- Dataset / weights ----
    /// A dataset query failed.
    #[error("query `{query}` failed: {reason}")]
    QueryFailed { query: String, reason: String },

    /// Weight normalisation requires at least one case.
    #[error("cannot compute an average weight over zero cases")]
    EmptyDataset,

    /// Weight total must be finite and non-zero to derive a scale factor.
    #[error("weight total must be finite and non-zero; got: {total}")]
    InvalidWeightTotal { total: f64 },

    // ---- Parameters ----
    /// Wrapper for registry failures.
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Errors specific to the parameter registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    /// No parameter with this name is registered.
    #[error("parameter '{name}' is not registered")]
    UnknownParameter { name: String },

    /// Parameter id does not belong to this registry.
    #[error("parameter id {id} is out of range for a registry of {len} parameters")]
    UnknownParameterId { id: usize, len: usize },

    /// Parameter values must be finite.
    #[error("value for parameter '{name}' must be finite; got {value}")]
    NonFiniteValue { name: String, value: f64 },

    /// Hold-fast parameters keep their value.
    #[error("parameter '{name}' is held fast and cannot be changed")]
    HeldFast { name: String },
}

/// Convert a [`ChoiceError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<ChoiceError> for PyErr {
    fn from(err: ChoiceError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Convert a [`ParamError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<ParamError> for PyErr {
    fn from(err: ParamError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
