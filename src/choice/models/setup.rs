//! Setup lifecycle — compile bindings and working arrays in stages.
//!
//! Purpose
//! -------
//! Drive a provisioned [`ChoiceModel`] through its setup levels:
//! `NotSetUp -> Structure` (network rebuilt, parameters bound, working arrays
//! allocated) and `Structure -> Loaded` (choice data scanned). `tear_down`
//! returns the model to `NotSetUp` and releases cached dispatch resources.
//!
//! Key behaviors
//! -------------
//! - `set_up(load_data)` is a no-op when the requested level is already
//!   reached. Otherwise it requires satisfied provisioning, rebuilds the
//!   network, binds utility terms, selects a [`ModelShape`] (flat or nested),
//!   optionally scans choices, binds sampling terms, allocates and fills
//!   coefficient arrays, and, for nested shapes, pushes logsum values into the
//!   network before rebuilding it once more.
//! - Everything is staged on local copies (network, registry, bindings) and
//!   committed only after the last step succeeds.
//! - A [`DispatchPlan`] partitions cases into worker chunks; it is built on
//!   first request at level `Loaded` and cached until `tear_down` or the next
//!   provisioning.
//!
//! Invariants & assumptions
//! ------------------------
//! - `level` only increases through `set_up`; only `tear_down` (or a
//!   declaration change) lowers it.
//! - `state` is `Some` exactly when `level >= Structure`.
//! - Coefficient arrays have the shapes of their parameter arrays; the
//!   gradient has one entry per registry parameter at setup time.
//!
//! Testing notes
//! -------------
//! - Unit tests below cover level transitions, the flat/nested split,
//!   atomicity on failure, and dispatch-plan caching.
//! - `tests/integration_setup_pipeline.rs` runs the full declaration ->
//!   provisioning -> setup pipeline with a linked dataset and log capture.
use crate::choice::{
    core::{
        aspect::Aspect,
        network::AlternativeNetwork,
        param_array::ParamArray,
        params::ParameterRegistry,
        term::TermTarget,
    },
    errors::{ChoiceError, ChoiceResult},
    models::{binder::Binder, model::ChoiceModel, multichoice::scan_multiple_choices},
};
use ndarray::{Array1, Array2, ArrayD, Ix1, IxDyn};
use std::{
    cell::{Cell, RefCell},
    ops::Range,
    rc::Rc,
};
use tracing::{debug, info};

/// Lifecycle state of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SetupLevel {
    NotSetUp,
    /// Structure compiled; no data-dependent passes yet.
    Structure,
    /// Structure compiled and choice data scanned.
    Loaded,
}

impl SetupLevel {
    /// Numeric level (0, 1, 2).
    pub fn code(self) -> u8 {
        match self {
            SetupLevel::NotSetUp => 0,
            SetupLevel::Structure => 1,
            SetupLevel::Loaded => 2,
        }
    }
}

/// Flat or nested model structure, selected once per `set_up`.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelShape {
    /// Multinomial structure; per-case buffers span the elemental alternatives.
    Flat { buffer_len: usize },
    /// Nested structure; per-case buffers span every network node.
    Nested { logsums: ParamArray, allocation: ParamArray, buffer_len: usize },
}

impl ModelShape {
    pub fn is_nested(&self) -> bool {
        matches!(self, ModelShape::Nested { .. })
    }

    /// Width of the per-case utility and probability buffers.
    pub fn buffer_len(&self) -> usize {
        match self {
            ModelShape::Flat { buffer_len } | ModelShape::Nested { buffer_len, .. } => *buffer_len,
        }
    }
}

/// Compiled parameter arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBindings {
    pub utility_ca: ParamArray,
    pub utility_co: ParamArray,
    /// `(ca, co)` sampling arrays, when sampling terms are declared.
    pub sampling: Option<(ParamArray, ParamArray)>,
    pub shape: ModelShape,
}

/// Coefficient values pulled from the registry plus per-case buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkArrays {
    pub utility_ca: ArrayD<f64>,
    pub utility_co: ArrayD<f64>,
    pub sampling_ca: Option<ArrayD<f64>>,
    pub sampling_co: Option<ArrayD<f64>>,
    pub logsums: Option<ArrayD<f64>>,
    pub allocation: Option<ArrayD<f64>>,
    /// One entry per registry parameter.
    pub gradient: Array1<f64>,
    /// `n_cases x buffer_len`.
    pub utility: Array2<f64>,
    /// `n_cases x buffer_len`.
    pub probability: Array2<f64>,
}

fn zeros_like(array: &ParamArray) -> ArrayD<f64> {
    ArrayD::zeros(IxDyn(array.shape()))
}

impl WorkArrays {
    /// Zero-filled arrays shaped after `bindings`.
    pub fn allocate(bindings: &ModelBindings, n_params: usize, n_cases: usize) -> WorkArrays {
        let (logsums, allocation) = match &bindings.shape {
            ModelShape::Nested { logsums, allocation, .. } => {
                (Some(zeros_like(logsums)), Some(zeros_like(allocation)))
            }
            ModelShape::Flat { .. } => (None, None),
        };
        let buffer = (n_cases, bindings.shape.buffer_len());
        WorkArrays {
            utility_ca: zeros_like(&bindings.utility_ca),
            utility_co: zeros_like(&bindings.utility_co),
            sampling_ca: bindings.sampling.as_ref().map(|(ca, _)| zeros_like(ca)),
            sampling_co: bindings.sampling.as_ref().map(|(_, co)| zeros_like(co)),
            logsums,
            allocation,
            gradient: Array1::zeros(n_params),
            utility: Array2::zeros(buffer),
            probability: Array2::zeros(buffer),
        }
    }

    /// Fill coefficient arrays with `value * multiplier` from `registry`.
    pub fn pull(&mut self, bindings: &ModelBindings, registry: &ParameterRegistry) -> ChoiceResult<()> {
        self.utility_ca.assign(&bindings.utility_ca.coefficients(registry)?);
        self.utility_co.assign(&bindings.utility_co.coefficients(registry)?);
        if let (Some((ca, co)), Some(out_ca), Some(out_co)) =
            (&bindings.sampling, self.sampling_ca.as_mut(), self.sampling_co.as_mut())
        {
            out_ca.assign(&ca.coefficients(registry)?);
            out_co.assign(&co.coefficients(registry)?);
        }
        if let (ModelShape::Nested { logsums, allocation, .. }, Some(out_mu), Some(out_alloc)) =
            (&bindings.shape, self.logsums.as_mut(), self.allocation.as_mut())
        {
            out_mu.assign(&logsums.coefficients(registry)?);
            out_alloc.assign(&allocation.coefficients(registry)?);
        }
        Ok(())
    }
}

/// Everything compiled by a successful `set_up`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupState {
    pub bindings: ModelBindings,
    pub work: WorkArrays,
}

/// Partition of cases into contiguous worker chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    pub chunks: Vec<Range<usize>>,
}

impl DispatchPlan {
    /// Split `0..n_cases` into at most `workers` near-equal chunks.
    pub fn new(n_cases: usize, workers: usize) -> DispatchPlan {
        let workers = workers.clamp(1, n_cases.max(1));
        let base = n_cases / workers;
        let extra = n_cases % workers;
        let mut chunks = Vec::with_capacity(workers);
        let mut start = 0;
        for w in 0..workers {
            let len = base + usize::from(w < extra);
            chunks.push(start..start + len);
            start += len;
        }
        DispatchPlan { chunks }
    }

    pub fn n_cases(&self) -> usize {
        self.chunks.last().map_or(0, |chunk| chunk.end)
    }
}

/// Lazily built dispatch plan, released by `tear_down`.
#[derive(Debug, Default)]
pub struct DispatcherCache {
    plan: RefCell<Option<Rc<DispatchPlan>>>,
    built: Cell<usize>,
}

impl DispatcherCache {
    fn get_or_build(&self, build: impl FnOnce() -> DispatchPlan) -> Rc<DispatchPlan> {
        let mut slot = self.plan.borrow_mut();
        if let Some(plan) = slot.as_ref() {
            return Rc::clone(plan);
        }
        let plan = Rc::new(build());
        self.built.set(self.built.get() + 1);
        *slot = Some(Rc::clone(&plan));
        plan
    }

    pub(crate) fn release(&self) {
        self.plan.borrow_mut().take();
    }

    pub fn is_cached(&self) -> bool {
        self.plan.borrow().is_some()
    }
}

/// Lifecycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupDiagnostics {
    pub multichoice_scans: usize,
    pub network_rebuilds: usize,
    pub setups_completed: usize,
    pub dispatch_plans_built: usize,
}

impl<N: AlternativeNetwork> ChoiceModel<N> {
    /// Compile the model up to `Structure`, or `Loaded` with `load_data`.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::SetupWithoutProvisioning` if provisioning is not
    ///   satisfied.
    /// - Network rebuild errors (unknown nodes, duplicate codes, cycles).
    /// - Binding errors (unknown variables, unresolvable alternatives/edges).
    ///   A flat network has no allocation links, so any allocation term is
    ///   unresolvable there.
    ///
    /// On error the model is unchanged: no level change, no new parameters
    /// in the registry, no network change.
    pub fn set_up(&mut self, load_data: bool) -> ChoiceResult<()> {
        if self.level >= SetupLevel::Loaded || (self.level >= SetupLevel::Structure && !load_data) {
            debug!(level = self.level.code(), "The model is already set up.");
            return Ok(());
        }
        info!(load_data, "Setting up the model...");
        let status = self.is_provisioned(false)?;
        if !status.is_satisfied() {
            return Err(ChoiceError::SetupWithoutProvisioning { status });
        }

        let spec = &self.spec;
        let dataset = self.dataset.as_deref();
        let warn_duplicates = self.options.warn_duplicate_bindings;
        let mut network = self.network.clone();
        let mut registry = self.registry.borrow().clone();
        let mut rebuilds = 0;

        network.regrow(&spec.nests, &spec.edges, spec.root_code)?;
        rebuilds += 1;

        debug!("Setting up utility parameters...");
        let (utility_ca, utility_co) = {
            let mut binder =
                Binder { registry: &mut registry, network: &network, dataset, warn_duplicates };
            let ca = binder.linear_ca(
                Aspect::UtilityCA,
                &spec.utility_ca,
                self.data.get(&Aspect::UtilityCA).map(|h| &**h),
            )?;
            let co = binder.linear_co(
                Aspect::UtilityCO,
                &spec.utility_co,
                self.data.get(&Aspect::UtilityCO).map(|h| &**h),
            )?;
            (ca, co)
        };

        let shape = if network.n_branches() > 0 {
            debug!(n_branches = network.n_branches(), "Setting model features to include nesting.");
            network.regrow(&spec.nests, &spec.edges, spec.root_code)?;
            rebuilds += 1;
            let mut binder =
                Binder { registry: &mut registry, network: &network, dataset, warn_duplicates };
            let logsums = binder.logsums(&spec.nests)?;
            let allocation = binder.allocation(&spec.allocation)?;
            ModelShape::Nested { logsums, allocation, buffer_len: network.n_nodes() }
        } else {
            if let Some(term) = spec.allocation.iter().next() {
                return Err(match term.target {
                    TermTarget::Edge { upcode, dncode } => ChoiceError::UnresolvedEdge {
                        param_name: term.param_name.clone(),
                        upcode,
                        dncode,
                    },
                    _ => ChoiceError::MissingEdge { param_name: term.param_name.clone() },
                });
            }
            ModelShape::Flat { buffer_len: network.n_elemental() }
        };

        let n_cases = self.n_cases.unwrap_or(0);
        let multichoice = match (load_data, self.data.get(&Aspect::Choice)) {
            (true, Some(choice)) => Some(scan_multiple_choices(choice, network.n_elemental(), n_cases)),
            _ => None,
        };

        let sampling = if spec.has_sampling() {
            debug!("Setting up sampling parameters...");
            let mut binder =
                Binder { registry: &mut registry, network: &network, dataset, warn_duplicates };
            let ca = binder.linear_ca(
                Aspect::SamplingCA,
                &spec.sampling_ca,
                self.data.get(&Aspect::SamplingCA).map(|h| &**h),
            )?;
            let co = binder.linear_co(
                Aspect::SamplingCO,
                &spec.sampling_co,
                self.data.get(&Aspect::SamplingCO).map(|h| &**h),
            )?;
            Some((ca, co))
        } else {
            None
        };

        let bindings = ModelBindings { utility_ca, utility_co, sampling, shape };
        let mut work = WorkArrays::allocate(&bindings, registry.len(), n_cases);

        if let ModelShape::Nested { logsums, .. } = &bindings.shape {
            let mu = logsums
                .coefficients(&registry)?
                .into_dimensionality::<Ix1>()
                .map_err(|_| ChoiceError::StructuralLengthMismatch {
                    expected: network.n_branches(),
                    actual: logsums.shape().iter().product(),
                })?;
            network.repoint_parameters(mu.view())?;
            network.regrow(&spec.nests, &spec.edges, spec.root_code)?;
            rebuilds += 1;
        }

        work.pull(&bindings, &registry)?;

        let level = if load_data { SetupLevel::Loaded } else { SetupLevel::Structure };
        self.network = network;
        *self.registry.borrow_mut() = registry;
        self.state = Some(SetupState { bindings, work });
        if let Some(flags) = multichoice {
            self.multichoice = flags;
            self.diagnostics.multichoice_scans += 1;
        }
        self.diagnostics.network_rebuilds += rebuilds;
        self.diagnostics.setups_completed += 1;
        self.dispatchers.release();
        self.level = level;
        info!(level = level.code(), "model set up");
        Ok(())
    }

    /// Return to `NotSetUp`, dropping bindings and cached dispatch resources.
    pub fn tear_down(&mut self) {
        self.level = SetupLevel::NotSetUp;
        self.state = None;
        self.dispatchers.release();
    }

    /// Refresh coefficient arrays from the registry's current values.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::NotSetUp` below `Structure`.
    pub fn pull_coefficients(&mut self) -> ChoiceResult<()> {
        let state = self.state.as_mut().ok_or(ChoiceError::NotSetUp {
            required: SetupLevel::Structure.code(),
            level: self.level.code(),
        })?;
        let registry = self.registry.borrow();
        state.work.pull(&state.bindings, &registry)
    }

    /// Case partition for parallel evaluation, built on first use.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::NotSetUp` below `Loaded`.
    pub fn dispatch_plan(&self) -> ChoiceResult<Rc<DispatchPlan>> {
        if self.level < SetupLevel::Loaded {
            return Err(ChoiceError::NotSetUp {
                required: SetupLevel::Loaded.code(),
                level: self.level.code(),
            });
        }
        let n_cases = self.n_cases.unwrap_or(0);
        let workers = self.options.dispatch_workers;
        Ok(self.dispatchers.get_or_build(|| {
            debug!(n_cases, workers, "building dispatch plan");
            DispatchPlan::new(n_cases, workers)
        }))
    }

    /// Lifecycle counters.
    pub fn diagnostics(&self) -> SetupDiagnostics {
        SetupDiagnostics { dispatch_plans_built: self.dispatchers.built.get(), ..self.diagnostics }
    }

    pub fn is_nested(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.bindings.shape.is_nested())
    }
}
