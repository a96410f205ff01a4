//! models — the choice model, its provisioning, binding, and setup lifecycle.
//!
//! Purpose
//! -------
//! Wire the `choice::core` building blocks into a stateful [`ChoiceModel`]:
//! requirements are resolved from the declaration, supplied data is
//! validated against them, term lists are compiled into parameter arrays, and
//! the model moves through its setup levels.
//!
//! Key behaviors
//! -------------
//! - [`model`]: the [`ChoiceModel`] struct, accessors, and weight rescaling.
//! - [`provision`]: `needs`, `provision`, `is_provisioned`, and the data
//!   accessor, all built on [`check_aspect`].
//! - [`binder`]: CA, CO, allocation, and logsum binding through [`Binder`].
//! - [`multichoice`]: the per-case multi-choice scan.
//! - [`setup`]: `set_up`, `tear_down`, the flat/nested [`ModelShape`], working
//!   arrays, and the cached [`DispatchPlan`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Every state-changing operation stages its result and commits only on
//!   success; an error leaves the model as it was.
//! - A model is single-threaded; share parameters across models through the
//!   registry handle, not by sharing the model.
//!
//! Downstream usage
//! ----------------
//! 1. Build a [`ModelSpec`](crate::choice::core::ModelSpec) and an
//!    [`AltTree`](crate::choice::core::AltTree).
//! 2. `ChoiceModel::new(spec, network)`, optionally `with_options` and
//!    `link_dataset`.
//! 3. Query `needs()`, load the arrays, and `provision` them.
//! 4. `set_up(true)`; read `state()` for the compiled bindings.
pub mod binder;
pub mod model;
pub mod multichoice;
pub mod provision;
pub mod setup;

pub use self::{
    binder::Binder,
    model::ChoiceModel,
    multichoice::scan_multiple_choices,
    provision::check_aspect,
    setup::{
        DispatchPlan, ModelBindings, ModelShape, SetupDiagnostics, SetupLevel, SetupState,
        WorkArrays,
    },
};

pub mod prelude {
    pub use super::{ChoiceModel, DispatchPlan, ModelShape, SetupLevel, SetupState};
}
