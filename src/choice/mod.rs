//! choice — specification binding and data provisioning for discrete-choice models.
//!
//! Purpose
//! -------
//! Provide the setup layer of a multinomial / nested logit estimator: a
//! declarative model specification is validated against supplied data,
//! compiled into slot-indexed parameter arrays bound to a shared parameter
//! registry, and kept consistent with a nested alternative network.
//!
//! Key behaviors
//! -------------
//! - [`core`]: terms and declarations, data arrays and requirements, the
//!   parameter registry, parameter arrays, the network and dataset traits,
//!   and setup options.
//! - [`models`]: the stateful [`ChoiceModel`] with provisioning, binding, and
//!   the setup lifecycle.
//! - [`errors`]: [`ChoiceError`] / [`ParamError`] with result aliases and
//!   Python conversions behind `python-bindings`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Data arrays are shared read-only through `Arc`; nothing here mutates a
//!   caller's array.
//! - Specification errors are raised at the first offending term; provisioning
//!   errors are aggregated.
//!
//! Conventions
//! -----------
//! - Aspect labels (`UtilityCA`, `UtilityCO`, `SamplingCA`, `SamplingCO`,
//!   `Avail`, `Choice`, `Weight`) are the external names of data categories.
//! - Progress and diagnostics are emitted through `tracing`; the crate never
//!   installs a subscriber.
pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    AltCode, AltTree, AlternativeNetwork, Aspect, DataArray, DataHandle, Dataset, ModelSpec,
    NestDecl, ParameterRegistry, ProvisionStatus, Requirement, RequirementSet, SetupOptions,
    SharedRegistry, Term, TermList,
};

pub use self::errors::{ChoiceError, ChoiceResult, ParamError, ParamResult, ProvisionIssue};

pub use self::models::{ChoiceModel, DispatchPlan, ModelShape, SetupLevel};

// ---- Prelude ----------------------------------------------------------------
//
//     use rust_choice::choice::prelude::*;

pub mod prelude {
    pub use super::{
        AltCode, AltTree, AlternativeNetwork, Aspect, ChoiceError, ChoiceModel, ChoiceResult,
        DataArray, DataHandle, Dataset, ModelSpec, NestDecl, ParameterRegistry, ProvisionStatus,
        Requirement, RequirementSet, SetupLevel, SetupOptions, SharedRegistry, Term,
    };
}
