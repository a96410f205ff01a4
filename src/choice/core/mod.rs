//! core — declarations, data arrays, requirements, registry, and network.
//!
//! Purpose
//! -------
//! Collect the building blocks the model layer compiles and validates:
//! term declarations, case-indexed data arrays, per-aspect requirements, the
//! shared parameter registry, slot-indexed parameter arrays, and the
//! collaborator traits for the alternative network and the dataset.
//!
//! Key behaviors
//! -------------
//! - Describe what a model declares ([`Term`], [`TermList`], [`ModelSpec`],
//!   [`NestDecl`]) and assign first-seen variable slots ([`VariableSlots`]).
//! - Hold supplied data in shared, validated arrays ([`DataArray`],
//!   [`DataHandle`]) and compare them against [`Requirement`]s.
//! - Own parameters by name in a [`ParameterRegistry`] shared through
//!   [`SharedRegistry`], and compile bindings into [`ParamArray`]s.
//! - Resolve alternative and edge slots through [`AlternativeNetwork`]
//!   ([`AltTree`] is the bundled implementation).
//!
//! Invariants & assumptions
//! ------------------------
//! - Data arrays are never mutated after construction; derived arrays (e.g.
//!   rescaled weights) are new allocations.
//! - Slot assignment is deterministic: first-seen order within each list.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based. Case axis is axis 0 for every data array.
//! - Logging goes through `tracing`; nothing in this module installs a
//!   subscriber.
pub mod aspect;
pub mod data;
pub mod dataset;
pub mod declaration;
pub mod network;
pub mod options;
pub mod param_array;
pub mod params;
pub mod requirement;
pub mod term;
pub mod validation;

pub use self::{
    aspect::{Aspect, ElementType},
    data::{DataArray, DataHandle, DataValues},
    dataset::{Dataset, weight_expression},
    declaration::{DEFAULT_ROOT_CODE, EdgeDecl, ModelSpec, NestDecl},
    network::{AltTree, AlternativeNetwork},
    options::SetupOptions,
    param_array::{ParamArray, ParamBinding, ParamCells},
    params::{Parameter, ParameterId, ParameterRegistry, SharedRegistry},
    requirement::{Mismatch, ProvisionStatus, Requirement, RequirementSet},
    term::{AltCode, Term, TermList, TermTarget, VariableSlots},
};

pub mod prelude {
    pub use super::{
        AltCode, AltTree, AlternativeNetwork, Aspect, DataArray, DataHandle, Dataset, ModelSpec,
        NestDecl, ParameterRegistry, ProvisionStatus, Requirement, RequirementSet, SetupOptions,
        SharedRegistry, Term,
    };
}
