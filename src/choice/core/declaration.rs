//! Model declaration — every term list and network declaration a model owns.
//!
//! Purpose
//! -------
//! Bundle the user-facing declaration of a discrete-choice model: utility and
//! sampling term lists (CA and CO), allocation terms, nest declarations
//! (each carrying its logsum parameter), extra network edges, and the root
//! code. The requirement resolver, binder, and network rebuild all read from
//! a [`ModelSpec`]; none of them mutate it.
//!
//! Conventions
//! -----------
//! - Nest codes share the code space of elemental alternatives; the network
//!   rejects duplicates on rebuild.
//! - A nest without an explicit logsum parameter uses its own name.
//! - Edges declared here are added to the network in order; nests that end up
//!   without a parent are attached to the root.
use crate::choice::core::term::{AltCode, Term, TermList};
use serde::{Deserialize, Serialize};

/// Default code of the network root.
pub const DEFAULT_ROOT_CODE: AltCode = 0;

/// One nest (branch) of the alternative network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestDecl {
    pub code: AltCode,
    pub name: String,
    /// Logsum parameter name; `None` uses `name`.
    pub param_name: Option<String>,
    /// Scale on the logsum parameter.
    pub multiplier: f64,
    /// Child codes (elementals or other nests).
    pub children: Vec<AltCode>,
}

impl NestDecl {
    pub fn new(code: AltCode, name: impl Into<String>, children: Vec<AltCode>) -> NestDecl {
        NestDecl { code, name: name.into(), param_name: None, multiplier: 1.0, children }
    }

    /// Use `param_name` for the logsum parameter instead of the nest's name.
    pub fn with_param(mut self, param_name: impl Into<String>) -> NestDecl {
        self.param_name = Some(param_name.into());
        self
    }

    /// Name of the logsum parameter bound to this nest.
    pub fn logsum_param(&self) -> &str {
        self.param_name.as_deref().unwrap_or(&self.name)
    }
}

/// One extra network edge `up -> dn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDecl {
    pub upcode: AltCode,
    pub dncode: AltCode,
}

/// Complete declaration of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub utility_ca: TermList,
    pub utility_co: TermList,
    pub sampling_ca: TermList,
    pub sampling_co: TermList,
    pub allocation: TermList,
    pub nests: Vec<NestDecl>,
    pub edges: Vec<EdgeDecl>,
    pub root_code: AltCode,
}

impl Default for ModelSpec {
    fn default() -> Self {
        ModelSpec {
            utility_ca: TermList::new(),
            utility_co: TermList::new(),
            sampling_ca: TermList::new(),
            sampling_co: TermList::new(),
            allocation: TermList::new(),
            nests: Vec::new(),
            edges: Vec::new(),
            root_code: DEFAULT_ROOT_CODE,
        }
    }
}

impl ModelSpec {
    pub fn new() -> ModelSpec {
        ModelSpec::default()
    }

    pub fn utility_ca(mut self, term: Term) -> ModelSpec {
        self.utility_ca.push(term);
        self
    }

    pub fn utility_co(mut self, term: Term) -> ModelSpec {
        self.utility_co.push(term);
        self
    }

    pub fn sampling_ca(mut self, term: Term) -> ModelSpec {
        self.sampling_ca.push(term);
        self
    }

    pub fn sampling_co(mut self, term: Term) -> ModelSpec {
        self.sampling_co.push(term);
        self
    }

    pub fn allocation(mut self, term: Term) -> ModelSpec {
        self.allocation.push(term);
        self
    }

    pub fn nest(mut self, nest: NestDecl) -> ModelSpec {
        self.nests.push(nest);
        self
    }

    pub fn edge(mut self, upcode: AltCode, dncode: AltCode) -> ModelSpec {
        self.edges.push(EdgeDecl { upcode, dncode });
        self
    }

    pub fn root(mut self, root_code: AltCode) -> ModelSpec {
        self.root_code = root_code;
        self
    }

    /// `true` when any sampling term is declared.
    pub fn has_sampling(&self) -> bool {
        !self.sampling_ca.is_empty() || !self.sampling_co.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logsum_param_defaults_to_nest_name() {
        let plain = NestDecl::new(10, "motorized", vec![1, 2]);
        let named = NestDecl::new(11, "transit", vec![3, 4]).with_param("mu_transit");

        assert_eq!(plain.logsum_param(), "motorized");
        assert_eq!(named.logsum_param(), "mu_transit");
    }

    #[test]
    fn builder_appends_in_declaration_order() {
        let spec = ModelSpec::new()
            .utility_ca(Term::new("time", "b_time"))
            .utility_ca(Term::new("cost", "b_cost"))
            .sampling_co(Term::for_code("size", "s_size", 1));

        let names: Vec<_> = spec.utility_ca.iter().map(|t| t.data_name.as_str()).collect();
        assert_eq!(names, vec!["time", "cost"]);
        assert!(spec.has_sampling());
        assert_eq!(spec.root_code, DEFAULT_ROOT_CODE);
    }
}
