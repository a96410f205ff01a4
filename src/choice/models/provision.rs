//! Provisioning — resolve data requirements and validate supplied arrays.
//!
//! Purpose
//! -------
//! Decide what data a model needs ([`ChoiceModel::needs`]), attach supplied
//! arrays against those needs ([`ChoiceModel::provision`]), and report whether
//! the currently attached data still satisfies them
//! ([`ChoiceModel::is_provisioned`]).
//!
//! Key behaviors
//! -------------
//! - `needs` is pure: CA aspects are 3D float over the elemental alternatives,
//!   CO aspects are 2D float, and `Avail` (3D bool), `Choice` (3D float) and
//!   `Weight` (2D float) are always required. `Avail` and `Choice` leave the
//!   alternative axis open. Term aspects are only required
//!   when their term list is non-empty.
//! - `provision` checks every aspect before deciding and reports all problems
//!   in one [`ChoiceError::ProvisioningFailed`]. On success the case counts
//!   must agree. Nothing is committed unless both checks pass.
//! - `is_provisioned` either summarizes (`Satisfied` / `Missing` /
//!   `Malformed`, malformed winning) or raises the first problem.
//! - Both entry points go through [`check_aspect`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Supplied arrays for aspects that are not required are ignored and not
//!   bound; so are keys that are not aspect labels.
//! - After a successful provisioning only required aspects are bound.
//! - Derived weights are recomputed (or dropped) on every successful
//!   provisioning; a scan of the choice data follows whenever choice data is
//!   bound.
use crate::choice::{
    core::{
        aspect::{Aspect, ElementType},
        data::DataHandle,
        network::AlternativeNetwork,
        requirement::{ProvisionStatus, Requirement, RequirementSet},
        term::TermList,
    },
    errors::{ChoiceError, ChoiceResult, ProvisionIssue},
    models::{model::{ChoiceModel, rescale_weights}, multichoice::scan_multiple_choices},
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Check one aspect's supplied array against its requirement.
///
/// Returns
/// -------
/// - `Ok(None)` when the aspect is not required.
/// - `Ok(Some(n_cases))` when the array satisfies the requirement.
/// - `Err(ProvisionIssue)` when a required array is missing or incompatible.
pub fn check_aspect(
    aspect: Aspect, requirement: Option<&Requirement>, supplied: Option<&DataHandle>,
) -> Result<Option<usize>, ProvisionIssue> {
    let Some(requirement) = requirement else {
        return Ok(None);
    };
    let Some(array) = supplied else {
        return Err(ProvisionIssue::Missing { aspect });
    };
    requirement
        .satisfied_by(array)
        .map(|()| Some(array.n_cases()))
        .map_err(|mismatch| ProvisionIssue::Unsatisfied { aspect, reason: mismatch.to_string() })
}

fn term_requirement(terms: &TermList, ndim: usize, n_alts: Option<usize>) -> Option<Requirement> {
    if terms.is_empty() {
        return None;
    }
    Some(
        Requirement::new(ndim, ElementType::Float, n_alts)
            .with_variables(terms.identify_needs().to_vec()),
    )
}

impl<N: AlternativeNetwork> ChoiceModel<N> {
    /// Requirement for every aspect the current declaration needs.
    pub fn needs(&self) -> RequirementSet {
        let n_elemental = Some(self.network.n_elemental());
        let spec = &self.spec;
        let mut needs = RequirementSet::new();
        let term_aspects = [
            (Aspect::UtilityCA, term_requirement(&spec.utility_ca, 3, n_elemental)),
            (Aspect::UtilityCO, term_requirement(&spec.utility_co, 2, None)),
            (Aspect::SamplingCA, term_requirement(&spec.sampling_ca, 3, n_elemental)),
            (Aspect::SamplingCO, term_requirement(&spec.sampling_co, 2, None)),
        ];
        for (aspect, requirement) in term_aspects {
            if let Some(requirement) = requirement {
                needs.insert(aspect, requirement);
            }
        }
        needs.insert(Aspect::Avail, Requirement::new(3, ElementType::Bool, None));
        needs.insert(Aspect::Choice, Requirement::new(3, ElementType::Float, None));
        needs.insert(Aspect::Weight, Requirement::new(2, ElementType::Float, None));
        needs
    }

    /// Attach and validate data arrays keyed by aspect label.
    ///
    /// Parameters
    /// ----------
    /// - `input`: `&HashMap<String, DataHandle>`
    ///   Arrays keyed by aspect label (`"UtilityCA"`, `"Avail"`, ...). Other
    ///   keys are ignored.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::ProvisioningFailed` listing every missing or
    ///   incompatible required aspect.
    /// - `ChoiceError::InconsistentCaseCounts` if accepted arrays disagree on
    ///   the number of cases.
    /// - Weight rescaling errors when `rescale_mean_weight` is configured.
    ///
    /// On any error the model is unchanged.
    pub fn provision(&mut self, input: &HashMap<String, DataHandle>) -> ChoiceResult<()> {
        debug!(n_arrays = input.len(), "Provisioning model data...");
        let mut supplied = BTreeMap::new();
        for (label, handle) in input {
            match label.parse::<Aspect>() {
                Ok(aspect) => {
                    supplied.insert(aspect, handle);
                }
                Err(_) => debug!(%label, "ignoring data under an unknown label"),
            }
        }

        let needs = self.needs();
        let mut issues = Vec::new();
        let mut staged = BTreeMap::new();
        let mut counts = Vec::new();
        for aspect in Aspect::PROVISION_ORDER {
            let handle = supplied.get(&aspect).copied();
            match check_aspect(aspect, needs.get(&aspect), handle) {
                Ok(Some(n_cases)) => {
                    if let Some(handle) = handle {
                        staged.insert(aspect, DataHandle::clone(handle));
                    }
                    counts.push((aspect, n_cases));
                }
                Ok(None) => {
                    if handle.is_some() {
                        debug!(%aspect, "ignoring data for an aspect the model does not need");
                    }
                }
                Err(issue) => issues.push(issue),
            }
        }
        if !issues.is_empty() {
            return Err(ChoiceError::ProvisioningFailed { issues });
        }
        let distinct: BTreeSet<usize> = counts.iter().map(|(_, n)| *n).collect();
        if distinct.len() > 1 {
            return Err(ChoiceError::InconsistentCaseCounts { counts });
        }
        let n_cases = distinct.into_iter().next().unwrap_or(0);

        let rescaled = match (self.options.rescale_mean_weight, staged.get(&Aspect::Weight)) {
            (Some(mean), Some(weight)) => Some(rescale_weights(weight, mean)?),
            _ => None,
        };
        let multichoice = staged
            .get(&Aspect::Choice)
            .map(|choice| scan_multiple_choices(choice, self.network.n_elemental(), n_cases));

        self.data = staged;
        self.n_cases = Some(n_cases);
        (self.weight_rescaled, self.weight_scale_factor) = match rescaled {
            Some((array, factor)) => (Some(array), factor),
            None => (None, 1.0),
        };
        if let Some(flags) = multichoice {
            self.multichoice = flags;
            self.diagnostics.multichoice_scans += 1;
        }
        self.dispatchers.release();
        debug!(n_cases, aspects = ?self.data.keys().collect::<Vec<_>>(), "provisioning complete");
        Ok(())
    }

    /// Summarize whether the attached data satisfies the current needs.
    ///
    /// Aspects are visited in [`Aspect::STATUS_ORDER`].
    ///
    /// Returns
    /// -------
    /// - `Satisfied` if every required aspect is bound and compatible.
    /// - `Malformed` if any bound array is incompatible (wins over missing).
    /// - `Missing` otherwise.
    ///
    /// Errors
    /// ------
    /// - With `fail_fast`, `ChoiceError::NotProvisioned` for the first problem,
    ///   naming the aspect, its requirement and, when an array is bound, that
    ///   array's description.
    pub fn is_provisioned(&self, fail_fast: bool) -> ChoiceResult<ProvisionStatus> {
        let needs = self.needs();
        let mut status = ProvisionStatus::Satisfied;
        for aspect in Aspect::STATUS_ORDER {
            let requirement = needs.get(&aspect);
            let bound = self.data.get(&aspect);
            let Err(issue) = check_aspect(aspect, requirement, bound) else {
                continue;
            };
            if fail_fast {
                return Err(ChoiceError::NotProvisioned {
                    aspect,
                    requirement: requirement.map(|req| req.to_string()).unwrap_or_default(),
                    provided: bound.map(|array| array.to_string()),
                });
            }
            status = match (issue, status) {
                (ProvisionIssue::Unsatisfied { .. }, _) => ProvisionStatus::Malformed,
                (ProvisionIssue::Missing { .. }, ProvisionStatus::Satisfied) => {
                    ProvisionStatus::Missing
                }
                (ProvisionIssue::Missing { .. }, current) => current,
            };
        }
        Ok(status)
    }

    /// Bound array for an aspect label.
    ///
    /// Returns `Ok(None)` when the aspect is valid but nothing is bound.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::UnknownDataLabel` if `label` is not an aspect label.
    pub fn data(&self, label: &str) -> ChoiceResult<Option<DataHandle>> {
        let aspect: Aspect = label.parse()?;
        Ok(self.data_for(aspect))
    }

    /// Bound array for `aspect`.
    pub fn data_for(&self, aspect: Aspect) -> Option<DataHandle> {
        self.data.get(&aspect).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::core::{
        data::DataArray, declaration::ModelSpec, network::AltTree, options::SetupOptions, term::Term,
    };
    use ndarray::{Array2, Array3};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Requirement resolution (`needs`) and its determinism.
    // - Aggregated provisioning, case-count agreement, and atomicity.
    // - The three-valued and fail-fast status queries.
    // - The data accessor's label handling.
    // -------------------------------------------------------------------------

    fn tree() -> AltTree {
        AltTree::new(vec![(1, "car".to_string()), (2, "bus".to_string()), (3, "rail".to_string())])
            .unwrap()
    }

    fn spec() -> ModelSpec {
        ModelSpec::new()
            .utility_ca(Term::new("time", "b_time"))
            .utility_ca(Term::new("cost", "b_cost"))
            .utility_co(Term::for_code("hhinc", "b_inc_bus", 2))
    }

    fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|v| v.to_string()).collect()
    }

    fn full_input(n: usize) -> HashMap<String, DataHandle> {
        HashMap::from([
            (
                "UtilityCA".to_string(),
                DataArray::idca(Array3::zeros((n, 3, 2)), names(&["time", "cost"])).unwrap().shared(),
            ),
            (
                "UtilityCO".to_string(),
                DataArray::idco(Array2::zeros((n, 1)), names(&["hhinc"])).unwrap().shared(),
            ),
            ("Avail".to_string(), DataArray::flags(Array3::from_elem((n, 3, 1), true)).unwrap().shared()),
            ("Choice".to_string(), DataArray::idca(choice_values(n), Vec::new()).unwrap().shared()),
            ("Weight".to_string(), DataArray::idco(Array2::ones((n, 1)), Vec::new()).unwrap().shared()),
        ])
    }

    fn choice_values(n: usize) -> Array3<f64> {
        let mut values = Array3::zeros((n, 3, 1));
        for c in 0..n {
            values[[c, c % 3, 0]] = 1.0;
        }
        values
    }

    #[test]
    // Purpose
    // -------
    // Requirements cover exactly the declared term aspects plus the three
    // always-required aspects, with variables in first-seen order.
    //
    // Given
    // -----
    // - UtilityCA terms `time, cost`; one UtilityCO term; no sampling.
    //
    // Expect
    // ------
    // - Keys UtilityCA, UtilityCO, Avail, Choice, Weight.
    // - UtilityCA is 3D float over 3 alternatives; repeated calls are equal.
    fn needs_is_deterministic_and_complete() {
        let model = ChoiceModel::new(spec(), tree());

        let first = model.needs();
        let second = model.needs();

        assert_eq!(first, second);
        assert_eq!(
            first.keys().copied().collect::<Vec<_>>(),
            vec![Aspect::UtilityCA, Aspect::UtilityCO, Aspect::Avail, Aspect::Choice, Aspect::Weight]
        );
        let ca = &first[&Aspect::UtilityCA];
        assert_eq!((ca.ndim, ca.element_type, ca.n_alts), (3, ElementType::Float, Some(3)));
        assert_eq!(ca.variables, names(&["time", "cost"]));
        assert_eq!(first[&Aspect::Avail].element_type, ElementType::Bool);
        assert_eq!(first[&Aspect::Weight].ndim, 2);
    }

    #[test]
    // Purpose
    // -------
    // Availability and choice arrays are accepted whatever their alternative
    // axis length.
    //
    // Given
    // -----
    // - A 3-alternative network; Avail shaped `(2, 5, 1)` and Choice `(2, 4, 1)`.
    //
    // Expect
    // ------
    // - Both requirements leave `n_alts` open; provisioning succeeds.
    fn avail_and_choice_accept_any_alternative_axis() {
        let mut model = ChoiceModel::new(spec(), tree());
        let mut input = full_input(2);
        input.insert("Avail".to_string(), DataArray::flags(Array3::from_elem((2, 5, 1), true)).unwrap().shared());
        input.insert("Choice".to_string(), DataArray::idca(Array3::zeros((2, 4, 1)), Vec::new()).unwrap().shared());

        let needs = model.needs();
        assert_eq!(needs[&Aspect::Avail].n_alts, None);
        assert_eq!(needs[&Aspect::Choice].n_alts, None);

        model.provision(&input).unwrap();

        assert_eq!(model.is_provisioned(false).unwrap(), ProvisionStatus::Satisfied);
        assert_eq!(model.data_for(Aspect::Avail).unwrap().n_alts(), Some(5));
    }

    #[test]
    fn complete_input_provisions_and_sets_case_count() {
        let mut model = ChoiceModel::new(spec(), tree());

        model.provision(&full_input(6)).unwrap();

        assert_eq!(model.n_cases(), Some(6));
        assert_eq!(model.is_provisioned(false).unwrap(), ProvisionStatus::Satisfied);
        assert_eq!(model.multichoice().len(), 6);
        assert!(model.data("UtilityCO").unwrap().is_some());
    }

    #[test]
    // Purpose
    // -------
    // Provisioning aggregates every problem into one message.
    //
    // Given
    // -----
    // - Avail removed; Choice replaced by a 2D array.
    //
    // Expect
    // ------
    // - `ProvisioningFailed` with a Missing(Avail) and an Unsatisfied(Choice)
    //   issue; nothing is committed.
    fn missing_and_malformed_are_reported_together() {
        let mut model = ChoiceModel::new(spec(), tree());
        let mut input = full_input(4);
        input.remove("Avail");
        input.insert(
            "Choice".to_string(),
            DataArray::idco(Array2::zeros((4, 3)), Vec::new()).unwrap().shared(),
        );

        let err = model.provision(&input).unwrap_err();

        let ChoiceError::ProvisioningFailed { issues } = &err else {
            panic!("expected ProvisioningFailed, got {err:?}");
        };
        assert_eq!(issues.iter().map(ProvisionIssue::aspect).collect::<Vec<_>>(), vec![
            Aspect::Avail,
            Aspect::Choice
        ]);
        let msg = err.to_string();
        assert!(msg.contains("data for Avail is needed but not provisioned"));
        assert!(msg.contains("data for Choice is provisioned by an array that does not satisfy"));
        assert_eq!(model.n_cases(), None);
    }

    #[test]
    // Purpose
    // -------
    // Disagreeing case counts are rejected and the previous count survives.
    //
    // Given
    // -----
    // - A model already provisioned with 4 cases.
    // - New input whose Weight array has 5 rows.
    //
    // Expect
    // ------
    // - `InconsistentCaseCounts`; `n_cases` stays 4 and the old Weight stays bound.
    fn mismatched_case_counts_keep_previous_state() {
        let mut model = ChoiceModel::new(spec(), tree());
        model.provision(&full_input(4)).unwrap();
        let mut input = full_input(4);
        input.insert(
            "Weight".to_string(),
            DataArray::idco(Array2::ones((5, 1)), Vec::new()).unwrap().shared(),
        );

        let err = model.provision(&input).unwrap_err();

        assert!(matches!(err, ChoiceError::InconsistentCaseCounts { .. }));
        assert!(err.to_string().starts_with("provisioning error: inconsistent numbers of cases"));
        assert_eq!(model.n_cases(), Some(4));
        assert_eq!(model.data_for(Aspect::Weight).unwrap().n_cases(), 4);
    }

    #[test]
    fn unrequired_aspects_are_ignored() {
        let mut model = ChoiceModel::new(ModelSpec::new(), tree());

        model.provision(&full_input(3)).unwrap();

        assert!(model.data_for(Aspect::UtilityCA).is_none());
        assert!(model.data_for(Aspect::Avail).is_some());
    }

    #[test]
    // Purpose
    // -------
    // Provisioning skips keys that are not aspect labels; the accessor does not.
    //
    // Given
    // -----
    // - A complete input plus an extra `Utility` key with a mismatched case count.
    //
    // Expect
    // ------
    // - `provision` succeeds with 2 cases.
    // - `data("Quantity")` raises `UnknownDataLabel`.
    fn unknown_labels_are_skipped_by_provision_but_not_by_lookup() {
        let mut model = ChoiceModel::new(spec(), tree());
        let mut input = full_input(2);
        input.insert("Utility".to_string(), DataArray::idco(Array2::zeros((7, 1)), Vec::new()).unwrap().shared());

        model.provision(&input).unwrap();

        assert_eq!(model.n_cases(), Some(2));
        assert_eq!(
            model.data("Quantity").unwrap_err(),
            ChoiceError::UnknownDataLabel { label: "Quantity".to_string() }
        );
    }

    #[test]
    // Purpose
    // -------
    // Status turns `Missing` when the declaration grows, `Malformed` when a
    // bound array no longer fits, and fail-fast names the aspect.
    //
    // Given
    // -----
    // - A model provisioned for `spec()`.
    // - Then a SamplingCO term is added (missing data).
    // - Then a UtilityCA term on an absent variable is added (malformed data).
    //
    // Expect
    // ------
    // - `Missing`, then `Malformed`; fail-fast errors on UtilityCA first.
    fn status_reflects_declaration_changes() {
        let mut model = ChoiceModel::new(spec(), tree());
        model.provision(&full_input(3)).unwrap();

        model.spec.sampling_co.push(Term::for_code("size", "s_size", 1));
        assert_eq!(model.is_provisioned(false).unwrap(), ProvisionStatus::Missing);
        assert!(matches!(
            model.is_provisioned(true),
            Err(ChoiceError::NotProvisioned { aspect: Aspect::SamplingCO, provided: None, .. })
        ));

        model.spec.utility_ca.push(Term::new("wait", "b_wait"));
        assert_eq!(model.is_provisioned(false).unwrap(), ProvisionStatus::Malformed);
        let err = model.is_provisioned(true).unwrap_err();
        assert!(matches!(
            &err,
            ChoiceError::NotProvisioned { aspect: Aspect::UtilityCA, provided: Some(_), .. }
        ));
        assert!(err.to_string().starts_with("UtilityCA is provisioned incorrectly"));
    }

    #[test]
    fn configured_rescaling_runs_on_provision() {
        let options = SetupOptions::new(Some(0.5), true, 1).unwrap();
        let mut model = ChoiceModel::new(spec(), tree()).with_options(options);

        model.provision(&full_input(4)).unwrap();

        approx::assert_relative_eq!(model.weight_scale_factor(), 0.5, epsilon = 1e-12);
        approx::assert_relative_eq!(model.effective_weight().unwrap().sum(), 2.0, epsilon = 1e-12);
    }
}
