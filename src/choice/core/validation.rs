//! Variable validation — check term variables against attached data.
//!
//! Before a term list is compiled, every distinct variable it names must be
//! exposed by the data array attached for its aspect and, when a dataset is
//! linked, must be valid in the matching dataset space (case-alternative for
//! CA aspects, case-only otherwise). The first unknown name is an error; no
//! aggregation happens here.
use crate::choice::{
    core::{aspect::Aspect, data::DataArray, dataset::Dataset, term::VariableSlots},
    errors::{ChoiceError, ChoiceResult},
};
use tracing::debug;

/// Dataset space label used in errors and logs.
pub fn dataset_space(is_ca: bool) -> &'static str {
    if is_ca { "idca" } else { "idco" }
}

/// Check each variable in `slots` against `data` and `dataset`.
///
/// Parameters
/// ----------
/// - `aspect`: [`Aspect`]
///   Aspect whose terms are being compiled; selects the dataset space.
/// - `slots`: `&VariableSlots`
///   Distinct variables in slot order.
/// - `data`: `Option<&DataArray>`
///   Array attached for the aspect; skipped when `None`.
/// - `dataset`: `Option<&dyn Dataset>`
///   Linked dataset; skipped when `None`.
///
/// Errors
/// ------
/// - `ChoiceError::UnknownVariable` if `data` does not expose a variable.
/// - `ChoiceError::UnknownDatasetVariable` if the dataset rejects it.
pub fn validate_variables(
    aspect: Aspect, slots: &VariableSlots, data: Option<&DataArray>, dataset: Option<&dyn Dataset>,
) -> ChoiceResult<()> {
    validate_in_space(aspect.is_ca(), slots, dataset)?;
    if let Some(data) = data {
        if let Some(variable) = slots.iter().find(|name| !data.has_variable(name)) {
            return Err(ChoiceError::UnknownVariable { aspect, variable: variable.to_string() });
        }
    }
    Ok(())
}

/// Check each variable in `slots` against one dataset space only.
pub fn validate_in_space(
    is_ca: bool, slots: &VariableSlots, dataset: Option<&dyn Dataset>,
) -> ChoiceResult<()> {
    let Some(dataset) = dataset else {
        return Ok(());
    };
    let space = dataset_space(is_ca);
    for variable in slots.iter() {
        let valid = if is_ca { dataset.check_ca(variable) } else { dataset.check_co(variable) };
        debug!(variable, space, valid, "checking validity of variable");
        if !valid {
            return Err(ChoiceError::UnknownDatasetVariable { space, variable: variable.to_string() });
        }
    }
    Ok(())
}
