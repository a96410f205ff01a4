//! Terms and term lists — the declarative lines of a linear specification.
//!
//! Purpose
//! -------
//! Represent one line of a linear-in-parameters specification ([`Term`]) and
//! an ordered list of such lines for one aspect ([`TermList`]). Provide the
//! first-seen variable deduplication ([`VariableSlots`]) that both the
//! requirement resolver and the binder rely on.
//!
//! Key behaviors
//! -------------
//! - A [`Term`] carries a source variable, a target parameter, a multiplier,
//!   and a [`TermTarget`]: none (CA / generic), an alternative, or an edge.
//! - [`TermList::identify_needs`] deduplicates `data_name`s while preserving
//!   declaration order; [`VariableSlots::slot_of`] then reuses slots for
//!   repeated names.
//!
//! Invariants & assumptions
//! ------------------------
//! - Terms are immutable once declared; lists only grow.
//! - Within one list distinct variables map to distinct, stable slots in
//!   first-seen order.
//!
//! Conventions
//! -----------
//! - Alternative codes are signed 64-bit integers ([`AltCode`]); an empty
//!   alternative name is treated as "no name".
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Integer code identifying an alternative or nest in the network.
pub type AltCode = i64;

/// What a term targets in the second dimension of its parameter array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TermTarget {
    /// Generic / case-alternative term: one parameter per variable.
    Generic,
    /// Alternative-specific term, resolved by name first and code second.
    Alternative { altname: Option<String>, altcode: Option<AltCode> },
    /// Allocation term on the network edge `upcode -> dncode`.
    Edge { upcode: AltCode, dncode: AltCode },
}

/// One line of a linear specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Source variable name.
    pub data_name: String,
    /// Target parameter name in the registry.
    pub param_name: String,
    /// Scale applied to the parameter when evaluated.
    pub multiplier: f64,
    /// Alternative / edge reference.
    pub target: TermTarget,
}

impl Term {
    /// Generic term `param_name * data_name`.
    pub fn new(data_name: impl Into<String>, param_name: impl Into<String>) -> Term {
        Term {
            data_name: data_name.into(),
            param_name: param_name.into(),
            multiplier: 1.0,
            target: TermTarget::Generic,
        }
    }

    /// Alternative-specific term targeting the alternative with code `altcode`.
    pub fn for_code(
        data_name: impl Into<String>, param_name: impl Into<String>, altcode: AltCode,
    ) -> Term {
        Term {
            target: TermTarget::Alternative { altname: None, altcode: Some(altcode) },
            ..Term::new(data_name, param_name)
        }
    }

    /// Alternative-specific term targeting the alternative named `altname`.
    pub fn for_name(
        data_name: impl Into<String>, param_name: impl Into<String>, altname: impl Into<String>,
    ) -> Term {
        let altname = altname.into();
        let altname = if altname.is_empty() { None } else { Some(altname) };
        Term {
            target: TermTarget::Alternative { altname, altcode: None },
            ..Term::new(data_name, param_name)
        }
    }

    /// Allocation term on the edge `upcode -> dncode`.
    pub fn for_edge(
        data_name: impl Into<String>, param_name: impl Into<String>, upcode: AltCode,
        dncode: AltCode,
    ) -> Term {
        Term { target: TermTarget::Edge { upcode, dncode }, ..Term::new(data_name, param_name) }
    }

    /// Return the same term with a different multiplier.
    pub fn scaled(mut self, multiplier: f64) -> Term {
        self.multiplier = multiplier;
        self
    }
}

/// Ordered sequence of terms for one aspect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermList {
    terms: Vec<Term>,
}

impl TermList {
    pub fn new() -> TermList {
        TermList::default()
    }

    /// Append a term (declaration order is binding order).
    pub fn push(&mut self, term: Term) {
        self.terms.push(term);
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }

    /// Distinct variable names in first-seen order.
    pub fn identify_needs(&self) -> VariableSlots {
        let mut slots = VariableSlots::default();
        for term in &self.terms {
            slots.slot_of(&term.data_name);
        }
        slots
    }
}

impl FromIterator<Term> for TermList {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        TermList { terms: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a TermList {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

/// First-seen slot assignment for variable names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSlots {
    names: IndexSet<String>,
}

impl VariableSlots {
    /// Slot for `name`, assigning the next free slot on first sight.
    pub fn slot_of(&mut self, name: &str) -> usize {
        match self.names.get_index_of(name) {
            Some(slot) => slot,
            None => self.names.insert_full(name.to_string()).0,
        }
    }

    /// Slot for `name` if it has been seen.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Owned names in slot order.
    pub fn to_vec(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover first-seen slot assignment and the term constructors.
    // Binding of terms into parameter arrays is covered in `models::binder`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Distinct variables receive distinct slots in first-seen order and
    // repeated names reuse their slot.
    //
    // Given
    // -----
    // - Terms on `time, cost, time, wait, cost`.
    //
    // Expect
    // ------
    // - `identify_needs` yields `[time, cost, wait]`.
    // - `slot_of` is idempotent for names already seen.
    fn identify_needs_preserves_first_seen_order() {
        let list: TermList = ["time", "cost", "time", "wait", "cost"]
            .iter()
            .map(|v| Term::new(*v, format!("b_{v}")))
            .collect();

        let mut slots = list.identify_needs();

        assert_eq!(slots.to_vec(), vec!["time", "cost", "wait"]);
        assert_eq!(slots.slot_of("cost"), 1);
        assert_eq!(slots.slot_of("time"), 0);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots.slot_of("tolls"), 3);
    }

    #[test]
    fn empty_altname_is_treated_as_absent() {
        let term = Term::for_name("hhinc", "b_inc", "");

        assert_eq!(term.target, TermTarget::Alternative { altname: None, altcode: None });
    }

    #[test]
    fn scaled_sets_multiplier_only() {
        let term = Term::for_code("hhinc", "b_inc", 3).scaled(0.01);

        assert_eq!(term.multiplier, 0.01);
        assert_eq!(term.target, TermTarget::Alternative { altname: None, altcode: Some(3) });
    }
}
