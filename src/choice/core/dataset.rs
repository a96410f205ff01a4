//! Dataset collaborator — variable lookup and scalar queries.
//!
//! The setup layer never reads case data through this trait; it only asks
//! whether variables exist in the CA or CO space and, for weight
//! normalisation, runs one aggregate query against the case-only table.
use crate::choice::errors::{ChoiceError, ChoiceResult};
use tracing::debug;

/// Data store a model can be linked to.
pub trait Dataset {
    /// `true` if `expression` is valid in the case-alternative space.
    fn check_ca(&self, expression: &str) -> bool;

    /// `true` if `expression` is valid in the case-only space.
    fn check_co(&self, expression: &str) -> bool;

    fn n_cases(&self) -> usize;

    /// Name of the case-only table.
    fn idco_table(&self) -> &str;

    /// Run a query returning one scalar.
    fn query_scalar(&self, query: &str) -> ChoiceResult<f64>;
}

/// Weight source expression for `varname`.
///
/// With `reweight == false` the variable is returned unchanged. Otherwise the
/// total weight is queried from the case-only table and the expression divides
/// by the average weight per case: `(<var>)/<average>`.
///
/// Errors
/// ------
/// - `ChoiceError::EmptyDataset` if the dataset has no cases.
/// - `ChoiceError::InvalidWeightTotal` if the queried total is not finite or is zero.
/// - Any error from [`Dataset::query_scalar`].
pub fn weight_expression(
    dataset: &dyn Dataset, varname: &str, reweight: bool,
) -> ChoiceResult<String> {
    if !reweight {
        return Ok(varname.to_string());
    }
    let n_cases = dataset.n_cases();
    if n_cases == 0 {
        return Err(ChoiceError::EmptyDataset);
    }
    let query = format!("SELECT SUM({varname}) FROM {}", dataset.idco_table());
    let total = dataset.query_scalar(&query)?;
    if !total.is_finite() || total == 0.0 {
        return Err(ChoiceError::InvalidWeightTotal { total });
    }
    let average = total / n_cases as f64;
    debug!(%query, total, average, "weight average computed");
    Ok(format!("({varname})/{average}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        total: f64,
        n_cases: usize,
        queries: RefCell<Vec<String>>,
    }

    impl Dataset for Recorder {
        fn check_ca(&self, _: &str) -> bool {
            true
        }

        fn check_co(&self, _: &str) -> bool {
            true
        }

        fn n_cases(&self) -> usize {
            self.n_cases
        }

        fn idco_table(&self) -> &str {
            "data_co"
        }

        fn query_scalar(&self, query: &str) -> ChoiceResult<f64> {
            self.queries.borrow_mut().push(query.to_string());
            Ok(self.total)
        }
    }

    fn recorder(total: f64, n_cases: usize) -> Recorder {
        Recorder { total, n_cases, queries: RefCell::new(Vec::new()) }
    }

    #[test]
    // Purpose
    // -------
    // Reweighting divides by the average weight per case.
    //
    // Given
    // -----
    // - Total weight 50 over 20 cases.
    //
    // Expect
    // ------
    // - One `SELECT SUM(wgt) FROM data_co` query; expression `(wgt)/2.5`.
    fn reweighted_expression_divides_by_average() {
        let data = recorder(50.0, 20);

        let expr = weight_expression(&data, "wgt", true).unwrap();

        assert_eq!(expr, "(wgt)/2.5");
        assert_eq!(*data.queries.borrow(), vec!["SELECT SUM(wgt) FROM data_co".to_string()]);
    }

    #[test]
    fn plain_expression_skips_the_query() {
        let data = recorder(50.0, 20);

        assert_eq!(weight_expression(&data, "wgt", false).unwrap(), "wgt");
        assert!(data.queries.borrow().is_empty());
    }

    #[test]
    fn degenerate_totals_are_rejected() {
        assert_eq!(weight_expression(&recorder(1.0, 0), "w", true), Err(ChoiceError::EmptyDataset));
        assert_eq!(
            weight_expression(&recorder(0.0, 5), "w", true),
            Err(ChoiceError::InvalidWeightTotal { total: 0.0 })
        );
    }
}
