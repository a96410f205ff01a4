//! Setup options — configuration for provisioning and setup.
//!
//! Purpose
//! -------
//! Collect the knobs that change how a model provisions data and sets itself
//! up: automatic weight rescaling, the duplicate-binding diagnostic, and the
//! dispatch plan's worker count.
//!
//! Key behaviors
//! -------------
//! - [`SetupOptions::new`] validates every field and never panics.
//! - [`SetupOptions::default`] disables rescaling, enables the duplicate
//!   binding warning, and uses a single dispatch worker.
//!
//! Invariants & assumptions
//! ------------------------
//! - `rescale_mean_weight`, when set, is finite and strictly positive.
//! - `dispatch_workers >= 1`.
//!
//! Downstream usage
//! ----------------
//! - Pass to `ChoiceModel::with_options`; provisioning consults
//!   `rescale_mean_weight`, the binder consults `warn_duplicate_bindings`, and
//!   the dispatch plan consults `dispatch_workers`.
use crate::choice::errors::{ChoiceError, ChoiceResult};

/// SetupOptions — validated configuration for model setup.
///
/// Fields
/// ------
/// - `rescale_mean_weight`: `Option<f64>`
///   When `Some(mean)`, weights are rescaled to this mean after every
///   successful provisioning.
/// - `warn_duplicate_bindings`: `bool`
///   Emit a `warn` event when a term overwrites an already-bound cell.
/// - `dispatch_workers`: `usize`
///   Number of case chunks in the dispatch plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupOptions {
    pub rescale_mean_weight: Option<f64>,
    pub warn_duplicate_bindings: bool,
    pub dispatch_workers: usize,
}

impl SetupOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::InvalidMeanWeight` if the mean is not finite or `<= 0`.
    /// - `ChoiceError::InvalidDispatchWorkers` if `dispatch_workers == 0`.
    pub fn new(
        rescale_mean_weight: Option<f64>, warn_duplicate_bindings: bool, dispatch_workers: usize,
    ) -> ChoiceResult<SetupOptions> {
        if let Some(mean) = rescale_mean_weight {
            validate_mean_weight(mean)?;
        }
        if dispatch_workers == 0 {
            return Err(ChoiceError::InvalidDispatchWorkers { value: dispatch_workers });
        }
        Ok(SetupOptions { rescale_mean_weight, warn_duplicate_bindings, dispatch_workers })
    }
}

impl Default for SetupOptions {
    fn default() -> Self {
        SetupOptions { rescale_mean_weight: None, warn_duplicate_bindings: true, dispatch_workers: 1 }
    }
}

/// Reject non-finite or non-positive target mean weights.
pub(crate) fn validate_mean_weight(mean: f64) -> ChoiceResult<()> {
    if !mean.is_finite() || mean <= 0.0 {
        return Err(ChoiceError::InvalidMeanWeight { value: mean });
    }
    Ok(())
}
