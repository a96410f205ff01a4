//! Multi-choice scan — flag cases whose choice data is not one clean unit choice.
//!
//! A case is flagged when more than one elemental alternative carries a
//! strictly positive choice value, or when exactly one does but the case total
//! is not exactly `1.0` (fractional or scaled choices). Cases with no positive
//! value are not flagged.
use crate::choice::core::data::DataArray;
use ndarray::Array1;
use tracing::debug;

/// Scan the first `n_cases` cases of a 3D choice array.
///
/// Parameters
/// ----------
/// - `choice`: `&DataArray`
///   Choice data laid out `(case, alternative, 1)`.
/// - `n_elemental`: `usize`
///   Number of elemental alternatives to sum over (clamped to the array's
///   alternative axis).
/// - `n_cases`: `usize`
///   Length of the returned flag array (clamped to the array's case axis;
///   cases beyond it stay `false`).
///
/// Returns
/// -------
/// `Array1<bool>` of length `n_cases`, `true` for multi-choice cases.
///
/// Panics
/// ------
/// - Never panics on a 3D array; callers pass provisioned choice data.
pub fn scan_multiple_choices(choice: &DataArray, n_elemental: usize, n_cases: usize) -> Array1<bool> {
    debug!("Scanning choice data for instances of multiple or non-unit choice...");
    let mut flags = Array1::from_elem(n_cases, false);
    let n_alts = n_elemental.min(choice.n_alts().unwrap_or(0));
    let scanned = n_cases.min(choice.n_cases());
    for (case, flag) in flags.iter_mut().take(scanned).enumerate() {
        let mut positives = 0usize;
        let mut total = 0.0;
        for alt in 0..n_alts {
            let value = choice.value(case, alt, 0);
            if value > 0.0 {
                positives += 1;
            }
            total += value;
        }
        *flag = positives > 1 || (positives == 1 && total != 1.0);
    }
    debug!(n_flagged = flags.iter().filter(|&&f| f).count(), "multi-choice scan complete");
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn choices(rows: &[[f64; 3]]) -> DataArray {
        let mut values = Array3::zeros((rows.len(), 3, 1));
        for (c, row) in rows.iter().enumerate() {
            for (a, v) in row.iter().enumerate() {
                values[[c, a, 0]] = *v;
            }
        }
        DataArray::idca(values, Vec::new()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Only clean unit choices pass unflagged.
    //
    // Given
    // -----
    // - Cases `[1,0,0]`, `[1,1,0]`, `[0.5,0.5,0]`, `[2,0,0]`, `[0,0,0]`.
    //
    // Expect
    // ------
    // - Flags `[false, true, true, true, false]`.
    fn flags_multiple_and_non_unit_choices() {
        let data = choices(&[
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.5, 0.5, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ]);

        let flags = scan_multiple_choices(&data, 3, 5);

        assert_eq!(flags.to_vec(), vec![false, true, true, true, false]);
    }

    #[test]
    fn repeated_unit_choices_yield_no_flags() {
        let data = choices(&[[1.0, 0.0, 0.0]; 6]);

        let flags = scan_multiple_choices(&data, 3, 6);

        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn output_is_sized_to_case_count() {
        let data = choices(&[[1.0, 1.0, 0.0]]);

        let flags = scan_multiple_choices(&data, 3, 3);

        assert_eq!(flags.to_vec(), vec![true, false, false]);
    }
}
