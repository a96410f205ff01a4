//! Choice model — declaration, provisioned data, bindings, and lifecycle state.
//!
//! Purpose
//! -------
//! Own everything a discrete-choice model carries between declaration and
//! estimation: the [`ModelSpec`], the alternative network, a handle to the
//! shared parameter registry, the provisioned data arrays, the setup level,
//! and the compiled bindings. Provisioning lives in `models::provision`, the
//! setup lifecycle in `models::setup`; this module holds the struct, its
//! accessors, and weight rescaling.
//!
//! Key behaviors
//! -------------
//! - Construct a model over a network with a fresh or shared registry.
//! - Derive a rescaled weight array with a target mean
//!   ([`ChoiceModel::auto_rescale_weights`]) without touching the caller's
//!   array, and drop it again ([`ChoiceModel::restore_scale_weights`]).
//! - Link an optional [`Dataset`] used for variable validation and for the
//!   weight expression.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data` only holds arrays that passed provisioning for the current
//!   requirement set at the time they were committed.
//! - `weight_rescaled` is `Some` only while a `Weight` array is bound;
//!   `weight_scale_factor` is `1.0` whenever it is `None`.
//! - Changing the declaration tears the model down.
//!
//! Conventions
//! -----------
//! - Single-threaded: the registry is `Rc<RefCell<_>>` and the dispatch cache
//!   is a `RefCell`. A `RefCell` borrow panic indicates a re-entrant call, not
//!   bad input.
use crate::choice::{
    core::{
        aspect::Aspect,
        data::{DataArray, DataHandle},
        dataset::{Dataset, weight_expression},
        declaration::ModelSpec,
        network::{AltTree, AlternativeNetwork},
        options::{SetupOptions, validate_mean_weight},
        params::{ParameterRegistry, SharedRegistry},
    },
    errors::{ChoiceError, ChoiceResult},
    models::setup::{DispatcherCache, SetupDiagnostics, SetupLevel, SetupState},
};
use ndarray::Array1;
use std::{collections::BTreeMap, rc::Rc};
use tracing::info;

/// A discrete-choice model at the setup/binding stage.
///
/// Fields
/// ------
/// - `spec`: declared terms, nests, and edges.
/// - `network`: alternative network, rebuilt during setup.
/// - `registry`: shared parameter registry.
/// - `options`: validated [`SetupOptions`].
/// - `data`: provisioned arrays keyed by aspect.
/// - `weight_rescaled` / `weight_scale_factor`: derived weights, if any.
/// - `n_cases`: case count agreed by the last successful provisioning.
/// - `multichoice`: per-case multi-choice flags from the last scan.
/// - `level`: lifecycle state.
/// - `state`: compiled bindings and working arrays (level ≥ 1).
/// - `dispatchers`: lazily built dispatch plan.
/// - `diagnostics`: lifecycle counters.
/// - `dataset`: optional linked dataset.
pub struct ChoiceModel<N: AlternativeNetwork = AltTree> {
    pub(crate) spec: ModelSpec,
    pub(crate) network: N,
    pub(crate) registry: SharedRegistry,
    pub(crate) options: SetupOptions,
    pub(crate) data: BTreeMap<Aspect, DataHandle>,
    pub(crate) weight_rescaled: Option<DataHandle>,
    pub(crate) weight_scale_factor: f64,
    pub(crate) n_cases: Option<usize>,
    pub(crate) multichoice: Array1<bool>,
    pub(crate) level: SetupLevel,
    pub(crate) state: Option<SetupState>,
    pub(crate) dispatchers: DispatcherCache,
    pub(crate) diagnostics: SetupDiagnostics,
    pub(crate) dataset: Option<Box<dyn Dataset>>,
}

impl<N: AlternativeNetwork> std::fmt::Debug for ChoiceModel<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChoiceModel")
            .field("spec", &self.spec)
            .field("network", &self.network)
            .field("options", &self.options)
            .field("aspects", &self.data.keys().collect::<Vec<_>>())
            .field("n_cases", &self.n_cases)
            .field("level", &self.level)
            .field("weight_scale_factor", &self.weight_scale_factor)
            .field("dataset_linked", &self.dataset.is_some())
            .finish()
    }
}

impl<N: AlternativeNetwork> ChoiceModel<N> {
    /// Model over `network` with its own, empty registry.
    pub fn new(spec: ModelSpec, network: N) -> ChoiceModel<N> {
        ChoiceModel::with_registry(spec, network, ParameterRegistry::shared())
    }

    /// Model over `network` sharing `registry` with other models.
    pub fn with_registry(spec: ModelSpec, network: N, registry: SharedRegistry) -> ChoiceModel<N> {
        ChoiceModel {
            spec,
            network,
            registry,
            options: SetupOptions::default(),
            data: BTreeMap::new(),
            weight_rescaled: None,
            weight_scale_factor: 1.0,
            n_cases: None,
            multichoice: Array1::from_elem(0, false),
            level: SetupLevel::NotSetUp,
            state: None,
            dispatchers: DispatcherCache::default(),
            diagnostics: SetupDiagnostics::default(),
            dataset: None,
        }
    }

    pub fn with_options(mut self, options: SetupOptions) -> ChoiceModel<N> {
        self.options = options;
        self
    }

    /// Link a dataset used for variable checks and weight expressions.
    pub fn link_dataset(&mut self, dataset: Box<dyn Dataset>) {
        self.dataset = Some(dataset);
    }

    pub fn unlink_dataset(&mut self) -> Option<Box<dyn Dataset>> {
        self.dataset.take()
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Replace the declaration; the model is torn down.
    pub fn set_spec(&mut self, spec: ModelSpec) {
        self.spec = spec;
        self.tear_down();
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Another handle to the shared registry.
    pub fn registry(&self) -> SharedRegistry {
        Rc::clone(&self.registry)
    }

    pub fn options(&self) -> &SetupOptions {
        &self.options
    }

    pub fn n_cases(&self) -> Option<usize> {
        self.n_cases
    }

    pub fn multichoice(&self) -> &Array1<bool> {
        &self.multichoice
    }

    pub fn level(&self) -> SetupLevel {
        self.level
    }

    /// Bindings and working arrays, once set up.
    pub fn state(&self) -> Option<&SetupState> {
        self.state.as_ref()
    }

    pub fn weight_scale_factor(&self) -> f64 {
        self.weight_scale_factor
    }

    /// Rescaled weights if present, else the provisioned weights.
    pub fn effective_weight(&self) -> Option<&DataHandle> {
        self.weight_rescaled.as_ref().or_else(|| self.data.get(&Aspect::Weight))
    }

    /// Rescale the bound weights so their mean is `mean_weight`.
    ///
    /// The factor is `mean_weight * len / total`. A new array is derived and
    /// held alongside the provisioned one, which is left untouched.
    ///
    /// Returns
    /// -------
    /// The scale factor applied.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::InvalidMeanWeight` if `mean_weight` is not finite or `<= 0`.
    /// - `ChoiceError::NotProvisioned` if no `Weight` array is bound.
    /// - `ChoiceError::InvalidWeightTotal` if the weights sum to 0 or a
    ///   non-finite value.
    pub fn auto_rescale_weights(&mut self, mean_weight: f64) -> ChoiceResult<f64> {
        let weight = self.data.get(&Aspect::Weight).ok_or_else(|| ChoiceError::NotProvisioned {
            aspect: Aspect::Weight,
            requirement: self
                .needs()
                .get(&Aspect::Weight)
                .map(|req| req.to_string())
                .unwrap_or_default(),
            provided: None,
        })?;
        let (rescaled, factor) = rescale_weights(weight, mean_weight)?;
        self.weight_rescaled = Some(rescaled);
        self.weight_scale_factor = factor;
        Ok(factor)
    }

    /// Drop any derived weights; the provisioned array is used again.
    pub fn restore_scale_weights(&mut self) {
        self.weight_rescaled = None;
        self.weight_scale_factor = 1.0;
    }

    /// Weight source expression for `varname` from the linked dataset.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::NoDatasetLinked` if no dataset is linked.
    /// - Errors from [`weight_expression`].
    pub fn weight_expression(&self, varname: &str, reweight: bool) -> ChoiceResult<String> {
        let dataset = self.dataset.as_deref().ok_or(ChoiceError::NoDatasetLinked)?;
        weight_expression(dataset, varname, reweight)
    }
}

/// Derive weights with mean `mean_weight`; returns the new array and factor.
pub(crate) fn rescale_weights(
    weight: &DataArray, mean_weight: f64,
) -> ChoiceResult<(DataHandle, f64)> {
    validate_mean_weight(mean_weight)?;
    let total = weight.sum();
    if !total.is_finite() || total == 0.0 {
        return Err(ChoiceError::InvalidWeightTotal { total });
    }
    let factor = mean_weight * weight.len() as f64 / total;
    info!(
        total,
        factor,
        n_cases = weight.n_cases(),
        "automatically rescaled weights"
    );
    Ok((weight.rescaled(factor).shared(), factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::core::term::Term;
    use ndarray::{Array2, Array3, array, s};
    use std::collections::HashMap;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover weight rescaling, restoration, the weight expression
    // path through a linked dataset, and declaration replacement. Provisioning
    // and setup have their own test modules.
    // -------------------------------------------------------------------------

    fn tree() -> AltTree {
        AltTree::new(vec![(1, "car".to_string()), (2, "bus".to_string())]).unwrap()
    }

    fn provisioned(weights: Array2<f64>) -> ChoiceModel {
        let n = weights.nrows();
        let mut model = ChoiceModel::new(ModelSpec::new(), tree());
        let mut choice = Array3::zeros((n, 2, 1));
        choice.slice_mut(s![.., 0, 0]).fill(1.0);
        let input = HashMap::from([
            ("Avail".to_string(), DataArray::flags(Array3::from_elem((n, 2, 1), true)).unwrap().shared()),
            ("Choice".to_string(), DataArray::idca(choice, Vec::new()).unwrap().shared()),
            ("Weight".to_string(), DataArray::idco(weights, Vec::new()).unwrap().shared()),
        ]);
        model.provision(&input).unwrap();
        model
    }

    #[test]
    // Purpose
    // -------
    // Rescaling hits the target mean and leaves the provisioned array alone.
    //
    // Given
    // -----
    // - Weights `[1, 2, 3, 6]` (mean 3); target mean 1.
    //
    // Expect
    // ------
    // - Factor 1/3; effective weights sum to 4; bound weights still sum to 12.
    fn auto_rescale_hits_target_mean() {
        let mut model = provisioned(array![[1.0], [2.0], [3.0], [6.0]]);

        let factor = model.auto_rescale_weights(1.0).unwrap();

        approx::assert_relative_eq!(factor, 1.0 / 3.0, epsilon = 1e-12);
        approx::assert_relative_eq!(model.effective_weight().unwrap().sum(), 4.0, epsilon = 1e-12);
        assert_eq!(model.data(Aspect::Weight.label()).unwrap().unwrap().sum(), 12.0);
    }

    #[test]
    fn restore_drops_derived_weights() {
        let mut model = provisioned(array![[2.0], [4.0]]);
        model.auto_rescale_weights(1.0).unwrap();

        model.restore_scale_weights();

        assert_eq!(model.weight_scale_factor(), 1.0);
        assert_eq!(model.effective_weight().unwrap().sum(), 6.0);
    }

    #[test]
    fn rescale_rejects_zero_total_and_bad_mean() {
        let mut model = provisioned(array![[0.0], [0.0]]);

        assert_eq!(
            model.auto_rescale_weights(1.0),
            Err(ChoiceError::InvalidWeightTotal { total: 0.0 })
        );
        assert_eq!(
            model.auto_rescale_weights(-2.0),
            Err(ChoiceError::InvalidMeanWeight { value: -2.0 })
        );
        assert!(model.effective_weight().is_some());
        assert_eq!(model.weight_scale_factor(), 1.0);
    }

    #[test]
    fn rescale_without_weights_is_not_provisioned() {
        let mut model = ChoiceModel::new(ModelSpec::new(), tree());

        assert!(matches!(
            model.auto_rescale_weights(1.0),
            Err(ChoiceError::NotProvisioned { aspect: Aspect::Weight, provided: None, .. })
        ));
    }

    #[test]
    fn weight_expression_needs_a_dataset() {
        let model = ChoiceModel::new(ModelSpec::new(), tree());

        assert_eq!(model.weight_expression("wgt", true), Err(ChoiceError::NoDatasetLinked));
        assert_eq!(model.weight_expression("wgt", false), Err(ChoiceError::NoDatasetLinked));
    }

    #[test]
    fn set_spec_tears_down() {
        let mut model = provisioned(array![[1.0], [1.0]]);
        model.set_up(false).unwrap();
        assert_eq!(model.level(), SetupLevel::Structure);

        model.set_spec(ModelSpec::new().utility_ca(Term::new("time", "b_time")));

        assert_eq!(model.level(), SetupLevel::NotSetUp);
        assert!(model.state().is_none());
    }
}
