//! rust_choice — specification binding and data provisioning for
//! discrete-choice models.
//!
//! Purpose
//! -------
//! Serve as the crate root. All functionality lives in [`choice`]: declaring
//! utility, sampling, and allocation terms; resolving which data arrays a
//! model needs; validating supplied arrays; compiling terms into
//! parameter arrays over a shared registry; and staging the model through its
//! setup levels.
//!
//! Invariants & assumptions
//! ------------------------
//! - Estimation itself (likelihoods, gradients, logsum propagation) is out of
//!   scope; this crate prepares the structures an estimator consumes.
//! - The crate performs no I/O. The dataset collaborator is a trait that
//!   callers implement.
//!
//! Conventions
//! -----------
//! - Errors are rich enums ([`choice::ChoiceError`], [`choice::ParamError`]);
//!   with the `python-bindings` feature they convert into Python
//!   `ValueError`s.
//! - Logging uses `tracing`. Install a subscriber in the application to see
//!   setup progress, bound-array dumps, and duplicate-binding warnings.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; `tests/` holds the end-to-end
//!   provisioning and setup pipeline.

pub mod choice;
