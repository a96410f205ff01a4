//! Aspects and element types — the vocabulary shared by requirements,
//! provisioning, and the data accessor.
//!
//! - [`Aspect`] names one category of model data (`UtilityCA`, `Choice`, ...).
//! - [`ElementType`] is the element type a data array carries.
//!
//! Notes
//! -----
//! - Labels are case-sensitive and match the external provisioning interface
//!   exactly (`"UtilityCA"`, `"SamplingCO"`, `"Avail"`, ...).
//! - [`Aspect::PROVISION_ORDER`] and [`Aspect::STATUS_ORDER`] fix the order in
//!   which provisioning and status checks visit aspects, so aggregated
//!   messages and fail-fast errors are reproducible.
use crate::choice::errors::{ChoiceError, ChoiceResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One named category of model data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Aspect {
    /// Case-alternative utility variables (3D float).
    UtilityCA,
    /// Case-only utility variables (2D float).
    UtilityCO,
    /// Case-alternative sampling-weight variables (3D float).
    SamplingCA,
    /// Case-only sampling-weight variables (2D float).
    SamplingCO,
    /// Availability flags (3D bool).
    Avail,
    /// Observed choices (3D float).
    Choice,
    /// Case weights (2D float).
    Weight,
}

impl Aspect {
    /// Order used by `provision` (choice is bound before weight).
    pub const PROVISION_ORDER: [Aspect; 7] = [
        Aspect::UtilityCA,
        Aspect::UtilityCO,
        Aspect::SamplingCA,
        Aspect::SamplingCO,
        Aspect::Avail,
        Aspect::Choice,
        Aspect::Weight,
    ];

    /// Order used by `is_provisioned` (weight is checked before choice).
    pub const STATUS_ORDER: [Aspect; 7] = [
        Aspect::UtilityCA,
        Aspect::UtilityCO,
        Aspect::SamplingCA,
        Aspect::SamplingCO,
        Aspect::Avail,
        Aspect::Weight,
        Aspect::Choice,
    ];

    /// External label of this aspect.
    pub fn label(self) -> &'static str {
        match self {
            Aspect::UtilityCA => "UtilityCA",
            Aspect::UtilityCO => "UtilityCO",
            Aspect::SamplingCA => "SamplingCA",
            Aspect::SamplingCO => "SamplingCO",
            Aspect::Avail => "Avail",
            Aspect::Choice => "Choice",
            Aspect::Weight => "Weight",
        }
    }

    /// `true` for the aspects whose variables live in the case-alternative space.
    pub fn is_ca(self) -> bool {
        matches!(self, Aspect::UtilityCA | Aspect::SamplingCA)
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Aspect {
    type Err = ChoiceError;

    /// Parse an external aspect label.
    ///
    /// Any label outside the fixed set returns
    /// [`ChoiceError::UnknownDataLabel`].
    fn from_str(s: &str) -> ChoiceResult<Self> {
        Aspect::PROVISION_ORDER
            .iter()
            .copied()
            .find(|aspect| aspect.label() == s)
            .ok_or_else(|| ChoiceError::UnknownDataLabel { label: s.to_string() })
    }
}

/// Element type of a data array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    Bool,
    Float,
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::Bool => f.write_str("bool"),
            ElementType::Float => f.write_str("float"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Every label round-trips through `FromStr` and unknown labels are fatal.
    //
    // Given
    // -----
    // - All seven aspects plus the label "QuantityCA".
    //
    // Expect
    // ------
    // - Each label parses back to its aspect.
    // - "QuantityCA" yields `ChoiceError::UnknownDataLabel`.
    fn labels_parse_and_unknown_labels_fail() {
        for aspect in Aspect::PROVISION_ORDER {
            assert_eq!(aspect.label().parse::<Aspect>().unwrap(), aspect);
        }

        let err = "QuantityCA".parse::<Aspect>().unwrap_err();

        assert_eq!(err, ChoiceError::UnknownDataLabel { label: "QuantityCA".to_string() });
    }

    #[test]
    fn status_order_checks_weight_before_choice() {
        let weight = Aspect::STATUS_ORDER.iter().position(|a| *a == Aspect::Weight).unwrap();
        let choice = Aspect::STATUS_ORDER.iter().position(|a| *a == Aspect::Choice).unwrap();

        assert!(weight < choice);
    }
}
