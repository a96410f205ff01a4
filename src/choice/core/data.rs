//! Case-indexed data arrays handed to a model by a data-loading collaborator.
//!
//! Purpose
//! -------
//! Provide a small, validated container for one aspect's data: a dense
//! `ndarray` of floats or booleans plus the names of the variables on its last
//! axis. Arrays are shared between aspects and models through [`DataHandle`]
//! (`Arc<DataArray>`); the setup layer never mutates one in place.
//!
//! Key behaviors
//! -------------
//! - [`DataArray::new`] checks dimensionality (1, 2 or 3) and that variable
//!   names, when given, match the variable axis.
//! - Shape accessors expose the case count (axis 0), the alternative axis
//!   (axis 1 of a 3D array), and the variable list.
//! - [`DataArray::rescaled`] derives a new array with every float value
//!   multiplied by a factor, leaving the original untouched.
//!
//! Invariants & assumptions
//! ------------------------
//! - Axis 0 is always the case axis.
//! - 3D arrays are laid out `(case, alternative, variable)`; 2D arrays
//!   `(case, variable)`; 1D arrays carry one value per case.
//! - An empty variable list means "anonymous": the array satisfies any
//!   requirement that needs no named variables.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based and follows `ndarray` semantics; out-of-bounds
//!   indexing in [`DataArray::value`] panics like `ndarray` indexing does.
use crate::choice::{
    core::aspect::ElementType,
    errors::{ChoiceError, ChoiceResult},
};
use ndarray::{Array2, Array3, ArrayD, IxDyn};
use std::sync::Arc;

/// Shared, read-only handle to a data array.
pub type DataHandle = Arc<DataArray>;

/// Dense storage of a data array.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValues {
    Float(ArrayD<f64>),
    Bool(ArrayD<bool>),
}

impl DataValues {
    fn shape(&self) -> &[usize] {
        match self {
            DataValues::Float(values) => values.shape(),
            DataValues::Bool(values) => values.shape(),
        }
    }
}

/// `DataArray` — validated case-indexed array plus its variable names.
///
/// Fields
/// ------
/// - `values`: [`DataValues`]
///   Float or boolean storage with 1 to 3 axes, case axis first.
/// - `variables`: `Vec<String>`
///   Names along the last axis (2D/3D) or the single name of a 1D array;
///   empty when anonymous.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    values: DataValues,
    variables: Vec<String>,
}

impl DataArray {
    /// Construct a validated [`DataArray`].
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::UnsupportedDimensionality`
    ///   Returned when the storage has 0 or more than 3 axes.
    /// - `ChoiceError::VariableAxisMismatch`
    ///   Returned when `variables` is non-empty and its length differs from
    ///   the variable axis (1 for a 1D array).
    pub fn new(values: DataValues, variables: Vec<String>) -> ChoiceResult<DataArray> {
        let shape = values.shape();
        let ndim = shape.len();
        if ndim == 0 || ndim > 3 {
            return Err(ChoiceError::UnsupportedDimensionality { ndim });
        }
        let n_vars = if ndim == 1 { 1 } else { shape[ndim - 1] };
        if !variables.is_empty() && variables.len() != n_vars {
            return Err(ChoiceError::VariableAxisMismatch {
                expected: n_vars,
                actual: variables.len(),
            });
        }
        Ok(DataArray { values, variables })
    }

    /// 3D float array laid out `(case, alternative, variable)`.
    pub fn idca(values: Array3<f64>, variables: Vec<String>) -> ChoiceResult<DataArray> {
        DataArray::new(DataValues::Float(values.into_dyn()), variables)
    }

    /// 2D float array laid out `(case, variable)`.
    pub fn idco(values: Array2<f64>, variables: Vec<String>) -> ChoiceResult<DataArray> {
        DataArray::new(DataValues::Float(values.into_dyn()), variables)
    }

    /// Anonymous 3D boolean array `(case, alternative, 1)`, e.g. availability.
    pub fn flags(values: Array3<bool>) -> ChoiceResult<DataArray> {
        DataArray::new(DataValues::Bool(values.into_dyn()), Vec::new())
    }

    /// Wrap into a shared handle.
    pub fn shared(self) -> DataHandle {
        Arc::new(self)
    }

    pub fn ndim(&self) -> usize {
        self.values.shape().len()
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn element_type(&self) -> ElementType {
        match self.values {
            DataValues::Float(_) => ElementType::Float,
            DataValues::Bool(_) => ElementType::Bool,
        }
    }

    /// Number of cases (length of axis 0).
    pub fn n_cases(&self) -> usize {
        self.values.shape()[0]
    }

    /// Length of the alternative axis of a 3D array.
    pub fn n_alts(&self) -> Option<usize> {
        let shape = self.values.shape();
        if shape.len() == 3 { Some(shape[1]) } else { None }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    pub fn values(&self) -> &DataValues {
        &self.values
    }

    /// Float storage, if this is a float array.
    pub fn as_float(&self) -> Option<&ArrayD<f64>> {
        match &self.values {
            DataValues::Float(values) => Some(values),
            DataValues::Bool(_) => None,
        }
    }

    /// Value at `(case, alt, var)` of a 3D array, with booleans read as 0/1.
    ///
    /// Panics
    /// ------
    /// - If the array is not 3D or the index is out of bounds.
    pub fn value(&self, case: usize, alt: usize, var: usize) -> f64 {
        let index = IxDyn(&[case, alt, var]);
        match &self.values {
            DataValues::Float(values) => values[index],
            DataValues::Bool(values) => {
                if values[index] {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Sum of every value (booleans count as 1).
    pub fn sum(&self) -> f64 {
        match &self.values {
            DataValues::Float(values) => values.sum(),
            DataValues::Bool(values) => values.iter().filter(|&&b| b).count() as f64,
        }
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        match &self.values {
            DataValues::Float(values) => values.len(),
            DataValues::Bool(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// New array with every float value multiplied by `factor`.
    ///
    /// Boolean arrays are copied unchanged. Variable names are preserved.
    pub fn rescaled(&self, factor: f64) -> DataArray {
        let values = match &self.values {
            DataValues::Float(values) => DataValues::Float(values * factor),
            DataValues::Bool(values) => DataValues::Bool(values.clone()),
        };
        DataArray { values, variables: self.variables.clone() }
    }
}

impl std::fmt::Display for DataArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = self.shape().iter().map(|n| n.to_string()).collect::<Vec<_>>().join("x");
        write!(f, "{}D {} array [{shape}]", self.ndim(), self.element_type())?;
        if !self.variables.is_empty() {
            write!(f, " ({})", self.variables.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array3, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction checks in `DataArray::new` (dimensionality and the
    //   variable axis).
    // - Shape accessors and the non-mutating `rescaled` derivation.
    // -------------------------------------------------------------------------

    fn names(vars: &[&str]) -> Vec<String> {
        vars.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    // Purpose
    // -------
    // A 3D float array exposes case, alternative, and variable metadata.
    //
    // Given
    // -----
    // - A `(4, 3, 2)` zero array with variables `time, cost`.
    //
    // Expect
    // ------
    // - `n_cases = 4`, `n_alts = Some(3)`, element type float.
    fn idca_reports_shape_metadata() {
        let arr = DataArray::idca(Array3::zeros((4, 3, 2)), names(&["time", "cost"])).unwrap();

        assert_eq!(arr.ndim(), 3);
        assert_eq!(arr.n_cases(), 4);
        assert_eq!(arr.n_alts(), Some(3));
        assert_eq!(arr.element_type(), ElementType::Float);
        assert!(arr.has_variable("cost"));
        assert!(!arr.has_variable("wait"));
        assert_eq!(arr.to_string(), "3D float array [4x3x2] (time, cost)");
    }

    #[test]
    // Purpose
    // -------
    // Variable names must match the last axis.
    //
    // Given
    // -----
    // - A `(5, 2)` array with three names.
    //
    // Expect
    // ------
    // - `ChoiceError::VariableAxisMismatch { expected: 2, actual: 3 }`.
    fn idco_rejects_wrong_variable_count() {
        let err = DataArray::idco(Array2::zeros((5, 2)), names(&["a", "b", "c"])).unwrap_err();

        assert_eq!(err, ChoiceError::VariableAxisMismatch { expected: 2, actual: 3 });
    }

    #[test]
    fn zero_and_four_dimensional_storage_is_rejected() {
        let scalar = ndarray::arr0(1.0).into_dyn();
        let four = ArrayD::<f64>::zeros(IxDyn(&[1, 1, 1, 1]));

        assert_eq!(
            DataArray::new(DataValues::Float(scalar), Vec::new()).unwrap_err(),
            ChoiceError::UnsupportedDimensionality { ndim: 0 }
        );
        assert_eq!(
            DataArray::new(DataValues::Float(four), Vec::new()).unwrap_err(),
            ChoiceError::UnsupportedDimensionality { ndim: 4 }
        );
    }

    #[test]
    fn one_dimensional_array_takes_a_single_name() {
        let values = DataValues::Float(Array1::from(vec![1.0, 2.0]).into_dyn());

        let arr = DataArray::new(values, names(&["wgt"])).unwrap();

        assert_eq!(arr.n_cases(), 2);
        assert_eq!(arr.n_alts(), None);
    }

    #[test]
    // Purpose
    // -------
    // Rescaling derives a new array and never touches the original.
    //
    // Given
    // -----
    // - Weights `[[1], [3]]` behind a shared handle.
    //
    // Expect
    // ------
    // - The derived array holds `[[0.5], [1.5]]`; the original still sums to 4.
    fn rescaled_leaves_original_untouched() {
        let original = DataArray::idco(array![[1.0], [3.0]], names(&["wgt"])).unwrap().shared();

        let derived = original.rescaled(0.5);

        assert_eq!(derived.as_float().unwrap().iter().copied().collect::<Vec<_>>(), vec![0.5, 1.5]);
        assert_eq!(original.sum(), 4.0);
        assert_eq!(derived.variables(), original.variables());
    }

    #[test]
    fn boolean_values_read_as_zero_or_one() {
        let mut flags = Array3::from_elem((1, 2, 1), false);
        flags[[0, 1, 0]] = true;

        let arr = DataArray::flags(flags).unwrap();

        assert_eq!(arr.value(0, 0, 0), 0.0);
        assert_eq!(arr.value(0, 1, 0), 1.0);
        assert_eq!(arr.sum(), 1.0);
    }
}
