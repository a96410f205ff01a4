//! Linear specification binder — compile term lists into parameter arrays.
//!
//! Purpose
//! -------
//! Turn a declared [`TermList`] into a slot-indexed [`ParamArray`] whose cells
//! point at registry parameters, ready for the estimator to evaluate.
//!
//! Key behaviors
//! -------------
//! - CA terms compile into a 1D array indexed by variable slot.
//! - CO terms compile into a `variables x elementals` array; the alternative is
//!   resolved by name first and by code second.
//! - Allocation terms compile into a `variables x competitive edges` array.
//! - Nest logsum parameters compile into a 1D array indexed by branch slot.
//! - Two terms landing in the same cell: the later one wins and, when enabled,
//!   a `warn` event reports the overwrite.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every term is resolved to a cell before any parameter is created, so a
//!   failing term leaves both the registry and the caller's arrays untouched.
//! - Arrays are built locally and only returned on success.
//!
//! Conventions
//! -----------
//! - Variable slots follow [`TermList::identify_needs`] (first-seen order).
//! - Allocation variables are case-only data: they are checked against the
//!   dataset's case-only space when a dataset is linked.
use crate::choice::{
    core::{
        aspect::Aspect,
        data::DataArray,
        dataset::Dataset,
        declaration::NestDecl,
        network::AlternativeNetwork,
        param_array::{ParamArray, ParamBinding},
        params::ParameterRegistry,
        term::{Term, TermList, TermTarget},
        validation::{validate_in_space, validate_variables},
    },
    errors::{ChoiceError, ChoiceResult},
};
use tracing::{debug, warn};

/// Binding context: the registry to write into plus the collaborators used
/// for slot resolution and variable validation.
pub struct Binder<'a, N: AlternativeNetwork> {
    pub registry: &'a mut ParameterRegistry,
    pub network: &'a N,
    pub dataset: Option<&'a dyn Dataset>,
    pub warn_duplicates: bool,
}

/// A resolved term: target cell and the parameter to bind there.
struct Placement<'t> {
    row: usize,
    col: usize,
    term: &'t Term,
}

impl<'a, N: AlternativeNetwork> Binder<'a, N> {
    /// Compile case-alternative terms into a 1D array.
    ///
    /// Parameters
    /// ----------
    /// - `aspect`: [`Aspect`]
    ///   `UtilityCA` or `SamplingCA`; used for validation and messages.
    /// - `terms`: `&TermList`
    /// - `data`: `Option<&DataArray>`
    ///   Array provisioned for `aspect`, if any.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::UnknownVariable` / `ChoiceError::UnknownDatasetVariable`
    ///   for the first variable the data does not expose.
    pub fn linear_ca(
        &mut self, aspect: Aspect, terms: &TermList, data: Option<&DataArray>,
    ) -> ChoiceResult<ParamArray> {
        let mut slots = terms.identify_needs();
        validate_variables(aspect, &slots, data, self.dataset)?;
        let placements: Vec<Placement> = terms
            .iter()
            .map(|term| Placement { row: slots.slot_of(&term.data_name), col: 0, term })
            .collect();
        let array = ParamArray::vector(slots.to_vec());
        Ok(self.commit(aspect.label(), array, placements))
    }

    /// Compile case-only terms into a `variables x elementals` array.
    ///
    /// Errors
    /// ------
    /// - Variable validation errors as in [`Binder::linear_ca`].
    /// - `ChoiceError::MissingAlternative` if a term names no alternative.
    /// - `ChoiceError::UnresolvedAlternative` if neither its name nor its code
    ///   resolves to an elemental slot.
    pub fn linear_co(
        &mut self, aspect: Aspect, terms: &TermList, data: Option<&DataArray>,
    ) -> ChoiceResult<ParamArray> {
        let mut slots = terms.identify_needs();
        validate_variables(aspect, &slots, data, self.dataset)?;
        let mut placements = Vec::with_capacity(terms.len());
        for term in terms {
            let col = self.alternative_slot(aspect, term)?;
            placements.push(Placement { row: slots.slot_of(&term.data_name), col, term });
        }
        let array = ParamArray::matrix(slots.to_vec(), self.network.n_elemental());
        Ok(self.commit(aspect.label(), array, placements))
    }

    /// Compile allocation terms into a `variables x competitive edges` array.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::UnknownDatasetVariable` if a linked dataset rejects a
    ///   variable in its case-only space.
    /// - `ChoiceError::MissingEdge` if a term names no edge.
    /// - `ChoiceError::UnresolvedEdge` if the edge is not a competitive link.
    pub fn allocation(&mut self, terms: &TermList) -> ChoiceResult<ParamArray> {
        let mut slots = terms.identify_needs();
        validate_in_space(false, &slots, self.dataset)?;
        let mut placements = Vec::with_capacity(terms.len());
        for term in terms {
            let TermTarget::Edge { upcode, dncode } = term.target else {
                return Err(ChoiceError::MissingEdge { param_name: term.param_name.clone() });
            };
            let col = self.network.alloc_slot_from_codes(upcode, dncode).ok_or_else(|| {
                ChoiceError::UnresolvedEdge { param_name: term.param_name.clone(), upcode, dncode }
            })?;
            placements.push(Placement { row: slots.slot_of(&term.data_name), col, term });
        }
        let array = ParamArray::matrix(slots.to_vec(), self.network.n_alloc_edges());
        Ok(self.commit("Allocation", array, placements))
    }

    /// Bind one logsum parameter per branch slot.
    ///
    /// Rows are labelled with the nest names in branch order. Each nest's
    /// multiplier scales its logsum parameter. New logsum parameters start at
    /// `1.0`.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::UnknownNetworkNode` if the network reports a branch
    ///   with no matching nest declaration.
    pub fn logsums(&mut self, nests: &[NestDecl]) -> ChoiceResult<ParamArray> {
        let branches = self.network.branch_codes();
        let mut decls = Vec::with_capacity(branches.len());
        for code in branches {
            let decl = nests
                .iter()
                .find(|nest| nest.code == code)
                .ok_or(ChoiceError::UnknownNetworkNode { code })?;
            decls.push(decl);
        }
        let mut array =
            ParamArray::vector(decls.iter().map(|decl| decl.name.clone()).collect());
        for (slot, decl) in decls.iter().enumerate() {
            let param = self.registry.get_or_create_at(decl.logsum_param(), 1.0);
            array.bind(slot, 0, ParamBinding { param, multiplier: decl.multiplier });
        }
        debug!("bound LogSum parameters:\n{array}");
        Ok(array)
    }

    fn alternative_slot(&self, aspect: Aspect, term: &Term) -> ChoiceResult<usize> {
        let (altname, altcode) = match &term.target {
            TermTarget::Alternative { altname, altcode } if altname.is_some() || altcode.is_some() => {
                (altname, altcode)
            }
            _ => {
                return Err(ChoiceError::MissingAlternative {
                    aspect,
                    param_name: term.param_name.clone(),
                });
            }
        };
        altname
            .as_deref()
            .and_then(|name| self.network.slot_from_name(name))
            .or_else(|| altcode.and_then(|code| self.network.slot_from_code(code)))
            .ok_or_else(|| ChoiceError::UnresolvedAlternative {
                aspect,
                param_name: term.param_name.clone(),
                altname: altname.clone(),
                altcode: *altcode,
            })
    }

    /// Create parameters and write every placement, in declaration order.
    fn commit(&mut self, label: &str, mut array: ParamArray, placements: Vec<Placement>) -> ParamArray {
        for Placement { row, col, term } in placements {
            let param = self.registry.get_or_create(&term.param_name);
            let replaced = array.bind(row, col, ParamBinding { param, multiplier: term.multiplier });
            if let (Some(previous), true) = (replaced, self.warn_duplicates) {
                warn!(
                    aspect = label,
                    variable = %term.data_name,
                    column = col,
                    previous = %previous.param,
                    param = %term.param_name,
                    "duplicate binding overwrites an existing parameter cell"
                );
            }
        }
        debug!("bound {label} parameters:\n{array}");
        array
    }
}
