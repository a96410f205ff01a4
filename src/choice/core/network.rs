//! Alternative network — slot resolution and nesting structure.
//!
//! Purpose
//! -------
//! Define the interface the setup layer needs from a nested alternative
//! network ([`AlternativeNetwork`]) and provide a reference implementation
//! ([`AltTree`]) that rebuilds itself from nest and edge declarations.
//!
//! Key behaviors
//! -------------
//! - Elemental alternatives occupy slots `0..n_elemental` in the order they
//!   were supplied; alternative-specific terms resolve into these slots by name
//!   or code.
//! - Nests (branches) occupy branch slots `0..n_branches` in declaration order;
//!   their structural (logsum) parameters are repointed by branch slot.
//! - [`AltTree::regrow`] replaces every nest and edge. Nest children become
//!   edges, declared edges are appended, and every node left without a parent
//!   is attached to the root.
//! - Only competitive edges, i.e. edges into a node with more than one parent,
//!   receive allocation slots, in edge insertion order.
//!
//! Invariants & assumptions
//! ------------------------
//! - Node codes are unique across elementals, nests, and the root.
//! - The graph is acyclic; an edge that would make a node its own ancestor is
//!   rejected.
//! - Structural parameters default to `1.0` (a flat logit inside the nest) and
//!   survive a rebuild for nests whose code is unchanged.
//!
//! Conventions
//! -----------
//! - Logsum propagation and probability calculations are not part of this
//!   module; the estimator reads the structure through the trait accessors.
use crate::choice::{
    core::{
        declaration::{DEFAULT_ROOT_CODE, EdgeDecl, NestDecl},
        term::AltCode,
    },
    errors::{ChoiceError, ChoiceResult},
};
use indexmap::{IndexMap, IndexSet};
use ndarray::{Array1, ArrayView1};
use std::collections::BTreeMap;
use tracing::debug;

/// What the setup layer needs from an alternative network.
pub trait AlternativeNetwork: Clone + std::fmt::Debug {
    /// Number of elemental (leaf) alternatives.
    fn n_elemental(&self) -> usize;

    /// Number of nests.
    fn n_branches(&self) -> usize;

    /// Elementals + nests + root.
    fn n_nodes(&self) -> usize {
        self.n_elemental() + self.n_branches() + 1
    }

    /// Number of competitive allocation edges.
    fn n_alloc_edges(&self) -> usize;

    fn root_code(&self) -> AltCode;

    /// Elemental slot of the alternative called `name`.
    fn slot_from_name(&self, name: &str) -> Option<usize>;

    /// Elemental slot of the alternative with code `code`.
    fn slot_from_code(&self, code: AltCode) -> Option<usize>;

    /// Allocation slot of the competitive edge `upcode -> dncode`.
    fn alloc_slot_from_codes(&self, upcode: AltCode, dncode: AltCode) -> Option<usize>;

    /// Nest codes in branch-slot order.
    fn branch_codes(&self) -> Vec<AltCode>;

    /// Replace all nests and edges.
    fn regrow(&mut self, nests: &[NestDecl], edges: &[EdgeDecl], root: AltCode)
    -> ChoiceResult<()>;

    /// Install one structural parameter per branch slot.
    fn repoint_parameters(&mut self, mu: ArrayView1<f64>) -> ChoiceResult<()>;
}

/// Reference network: elementals, nests, edges, and nest structural parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AltTree {
    elementals: IndexMap<AltCode, String>,
    nests: IndexMap<AltCode, String>,
    root: AltCode,
    edges: IndexSet<(AltCode, AltCode)>,
    alloc_edges: IndexSet<(AltCode, AltCode)>,
    mu: Array1<f64>,
}

impl AltTree {
    /// Flat network over `elementals` (code, name) pairs, in slot order.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::DuplicateNetworkNode` if a code repeats or collides
    ///   with the default root code.
    pub fn new(elementals: Vec<(AltCode, String)>) -> ChoiceResult<AltTree> {
        let mut map = IndexMap::with_capacity(elementals.len());
        for (code, name) in elementals {
            if code == DEFAULT_ROOT_CODE || map.insert(code, name).is_some() {
                return Err(ChoiceError::DuplicateNetworkNode { code });
            }
        }
        let mut tree = AltTree {
            elementals: map,
            nests: IndexMap::new(),
            root: DEFAULT_ROOT_CODE,
            edges: IndexSet::new(),
            alloc_edges: IndexSet::new(),
            mu: Array1::zeros(0),
        };
        tree.regrow(&[], &[], DEFAULT_ROOT_CODE)?;
        Ok(tree)
    }

    /// Elemental codes in slot order.
    pub fn elemental_codes(&self) -> Vec<AltCode> {
        self.elementals.keys().copied().collect()
    }

    /// Every edge `(up, dn)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &(AltCode, AltCode)> {
        self.edges.iter()
    }

    /// Parents of `code` in edge order.
    pub fn parents_of(&self, code: AltCode) -> Vec<AltCode> {
        self.edges.iter().filter(|(_, dn)| *dn == code).map(|(up, _)| *up).collect()
    }

    /// Structural parameters by branch slot.
    pub fn mu(&self) -> ArrayView1<'_, f64> {
        self.mu.view()
    }

    fn is_node(&self, code: AltCode) -> bool {
        code == self.root || self.elementals.contains_key(&code) || self.nests.contains_key(&code)
    }

    /// `true` if `to` is reachable from `from` along child edges.
    fn reaches(&self, from: AltCode, to: AltCode) -> bool {
        let mut stack = vec![from];
        let mut seen = IndexSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if seen.insert(node) {
                stack.extend(self.edges.iter().filter(|(up, _)| *up == node).map(|(_, dn)| *dn));
            }
        }
        false
    }

    fn add_edge(&mut self, upcode: AltCode, dncode: AltCode) -> ChoiceResult<()> {
        for code in [upcode, dncode] {
            if !self.is_node(code) {
                return Err(ChoiceError::UnknownNetworkNode { code });
            }
        }
        if dncode == self.root || self.reaches(dncode, upcode) {
            return Err(ChoiceError::NetworkCycle { upcode, dncode });
        }
        self.edges.insert((upcode, dncode));
        Ok(())
    }
}

impl AlternativeNetwork for AltTree {
    fn n_elemental(&self) -> usize {
        self.elementals.len()
    }

    fn n_branches(&self) -> usize {
        self.nests.len()
    }

    fn n_alloc_edges(&self) -> usize {
        self.alloc_edges.len()
    }

    fn root_code(&self) -> AltCode {
        self.root
    }

    fn slot_from_name(&self, name: &str) -> Option<usize> {
        self.elementals.values().position(|n| n == name)
    }

    fn slot_from_code(&self, code: AltCode) -> Option<usize> {
        self.elementals.get_index_of(&code)
    }

    fn alloc_slot_from_codes(&self, upcode: AltCode, dncode: AltCode) -> Option<usize> {
        self.alloc_edges.get_index_of(&(upcode, dncode))
    }

    fn branch_codes(&self) -> Vec<AltCode> {
        self.nests.keys().copied().collect()
    }

    /// Rebuild nests and edges from declarations.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::DuplicateNetworkNode` if a nest or the root reuses a code.
    /// - `ChoiceError::UnknownNetworkNode` if a child or edge endpoint is not a node.
    /// - `ChoiceError::NetworkCycle` if an edge would create a cycle.
    ///
    /// On error the network is left unchanged.
    fn regrow(
        &mut self, nests: &[NestDecl], edges: &[EdgeDecl], root: AltCode,
    ) -> ChoiceResult<()> {
        debug!(n_nests = nests.len(), n_edges = edges.len(), root, "Rebuilding network...");
        let previous_mu: BTreeMap<AltCode, f64> =
            self.nests.keys().copied().zip(self.mu.iter().copied()).collect();

        let mut next = AltTree {
            elementals: self.elementals.clone(),
            nests: IndexMap::with_capacity(nests.len()),
            root,
            edges: IndexSet::new(),
            alloc_edges: IndexSet::new(),
            mu: Array1::zeros(0),
        };
        if next.elementals.contains_key(&root) {
            return Err(ChoiceError::DuplicateNetworkNode { code: root });
        }
        for nest in nests {
            if nest.code == root
                || next.elementals.contains_key(&nest.code)
                || next.nests.insert(nest.code, nest.name.clone()).is_some()
            {
                return Err(ChoiceError::DuplicateNetworkNode { code: nest.code });
            }
        }
        for nest in nests {
            for &child in &nest.children {
                next.add_edge(nest.code, child)?;
            }
        }
        for edge in edges {
            next.add_edge(edge.upcode, edge.dncode)?;
        }

        let orphans: Vec<AltCode> = next
            .elementals
            .keys()
            .chain(next.nests.keys())
            .copied()
            .filter(|&code| next.edges.iter().all(|(_, dn)| *dn != code))
            .collect();
        for code in orphans {
            next.edges.insert((root, code));
        }

        let mut n_parents: BTreeMap<AltCode, usize> = BTreeMap::new();
        for (_, dn) in &next.edges {
            *n_parents.entry(*dn).or_default() += 1;
        }
        next.alloc_edges = next
            .edges
            .iter()
            .filter(|(_, dn)| n_parents.get(dn).copied().unwrap_or(0) > 1)
            .copied()
            .collect();
        next.mu =
            next.nests.keys().map(|code| previous_mu.get(code).copied().unwrap_or(1.0)).collect();

        *self = next;
        Ok(())
    }

    /// Errors with `ChoiceError::StructuralLengthMismatch` if `mu` does not
    /// have one value per branch.
    fn repoint_parameters(&mut self, mu: ArrayView1<f64>) -> ChoiceResult<()> {
        if mu.len() != self.nests.len() {
            return Err(ChoiceError::StructuralLengthMismatch {
                expected: self.nests.len(),
                actual: mu.len(),
            });
        }
        self.mu = mu.to_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover slot resolution, rebuilds from nest/edge declarations
    // (root attachment, competitive edges, rejection paths), and structural
    // parameter repointing.
    // -------------------------------------------------------------------------

    fn three_modes() -> AltTree {
        AltTree::new(vec![(1, "car".to_string()), (2, "bus".to_string()), (3, "rail".to_string())])
            .unwrap()
    }

    #[test]
    fn flat_network_resolves_elemental_slots() {
        let tree = three_modes();

        assert_eq!(tree.n_elemental(), 3);
        assert_eq!(tree.n_branches(), 0);
        assert_eq!(tree.n_nodes(), 4);
        assert_eq!(tree.slot_from_name("rail"), Some(2));
        assert_eq!(tree.slot_from_code(2), Some(1));
        assert_eq!(tree.slot_from_code(9), None);
        assert_eq!(tree.parents_of(1), vec![DEFAULT_ROOT_CODE]);
    }

    #[test]
    // Purpose
    // -------
    // A node with two parents makes both of its incoming edges competitive.
    //
    // Given
    // -----
    // - Nests 10 = {car, bus}, 11 = {bus, rail}.
    //
    // Expect
    // ------
    // - Two branches; allocation slots for (10, 2) then (11, 2) only.
    // - Both nests hang off the root.
    fn shared_child_creates_competitive_edges() {
        let mut tree = three_modes();
        let nests = vec![
            NestDecl::new(10, "private", vec![1, 2]),
            NestDecl::new(11, "public", vec![2, 3]),
        ];

        tree.regrow(&nests, &[], DEFAULT_ROOT_CODE).unwrap();

        assert_eq!(tree.n_branches(), 2);
        assert_eq!(tree.branch_codes(), vec![10, 11]);
        assert_eq!(tree.n_alloc_edges(), 2);
        assert_eq!(tree.alloc_slot_from_codes(10, 2), Some(0));
        assert_eq!(tree.alloc_slot_from_codes(11, 2), Some(1));
        assert_eq!(tree.alloc_slot_from_codes(10, 1), None);
        assert_eq!(tree.parents_of(10), vec![DEFAULT_ROOT_CODE]);
    }

    #[test]
    fn regrow_rejects_bad_declarations_and_keeps_state() {
        let mut tree = three_modes();
        let before = tree.clone();

        let dup = vec![NestDecl::new(2, "clash", vec![1])];
        assert_eq!(
            tree.regrow(&dup, &[], DEFAULT_ROOT_CODE),
            Err(ChoiceError::DuplicateNetworkNode { code: 2 })
        );
        let unknown = vec![NestDecl::new(10, "n", vec![7])];
        assert_eq!(
            tree.regrow(&unknown, &[], DEFAULT_ROOT_CODE),
            Err(ChoiceError::UnknownNetworkNode { code: 7 })
        );
        let nests = vec![NestDecl::new(10, "a", vec![11]), NestDecl::new(11, "b", vec![1])];
        let cycle = vec![EdgeDecl { upcode: 11, dncode: 10 }];
        assert_eq!(
            tree.regrow(&nests, &cycle, DEFAULT_ROOT_CODE),
            Err(ChoiceError::NetworkCycle { upcode: 11, dncode: 10 })
        );

        assert_eq!(tree, before);
    }

    #[test]
    fn structural_parameters_follow_branches() {
        let mut tree = three_modes();
        tree.regrow(&[NestDecl::new(10, "motor", vec![1, 2])], &[], DEFAULT_ROOT_CODE).unwrap();

        assert_eq!(tree.mu(), array![1.0]);
        assert_eq!(
            tree.repoint_parameters(array![0.5, 0.6].view()),
            Err(ChoiceError::StructuralLengthMismatch { expected: 1, actual: 2 })
        );

        tree.repoint_parameters(array![0.5].view()).unwrap();
        tree.regrow(&[NestDecl::new(10, "motor", vec![1, 2])], &[], DEFAULT_ROOT_CODE).unwrap();

        assert_eq!(tree.mu(), array![0.5]);
    }

    #[test]
    fn duplicate_elemental_codes_are_rejected() {
        let err = AltTree::new(vec![(1, "a".to_string()), (1, "b".to_string())]).unwrap_err();

        assert_eq!(err, ChoiceError::DuplicateNetworkNode { code: 1 });
    }
}
