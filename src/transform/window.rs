//! Rolling window smoothing.
//!
//! Windows are evaluated only where the full window fits inside the series;
//! positions without a complete window, or whose window holds a missing value,
//! are `NaN`.

use crate::core::{is_missing, Column, ObservationTable};
use crate::error::{ForecastError, Result};

/// Prefix given to smoothed column names.
pub const SMOOTHED_PREFIX: &str = "smoothed_";

/// Rolling median over full windows.
///
/// With `center` the window at `i` covers `i - window/2 .. i - window/2 + window`;
/// otherwise it ends at `i`.
pub fn rolling_median(series: &[f64], window: usize, center: bool) -> Vec<f64> {
    let mut result = vec![f64::NAN; series.len()];
    if window == 0 || window > series.len() {
        return result;
    }

    // a window starting at `start` is reported at `start + anchor`
    let anchor = if center { window / 2 } else { window - 1 };
    let mut scratch = Vec::with_capacity(window);
    for (start, values) in series.windows(window).enumerate() {
        if values.iter().any(|v| is_missing(*v)) {
            continue;
        }
        scratch.clear();
        scratch.extend_from_slice(values);
        result[start + anchor] = median(&mut scratch);
    }
    result
}

/// Median of a non-empty slice of finite values; reorders `values`.
fn median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Centered rolling median of each named column.
///
/// Returns a separate table (same timestamps) with one `smoothed_<name>`
/// column per feature; the input table is left untouched.
pub fn apply_rolling_median(
    table: &ObservationTable,
    features: &[&str],
    window: usize,
) -> Result<ObservationTable> {
    if window == 0 {
        return Err(ForecastError::InvalidParameter(
            "smoothing window must be positive".to_string(),
        ));
    }

    let columns = features
        .iter()
        .map(|name| {
            let values = table.require_column(name)?;
            Ok(Column::new(
                format!("{SMOOTHED_PREFIX}{name}"),
                rolling_median(values, window, true),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    ObservationTable::new(table.timestamps().to_vec(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn assert_series(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            if e.is_nan() {
                assert!(a.is_nan(), "expected NaN, got {a}");
            } else {
                assert_relative_eq!(*a, *e, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn centered_median_window_5() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let result = rolling_median(&series, 5, true);
        let nan = f64::NAN;
        assert_series(&result, &[nan, nan, 3.0, 4.0, 5.0, nan, nan]);
    }

    #[test]
    fn centered_median_rejects_outlier() {
        let series = vec![1.0, 1.0, 100.0, 1.0, 1.0];
        let result = rolling_median(&series, 5, true);
        assert_relative_eq!(result[2], 1.0);
    }

    #[test]
    fn centered_even_window() {
        // window 4 at i covers [i-2, i+1]
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = rolling_median(&series, 4, true);
        let nan = f64::NAN;
        assert_series(&result, &[nan, nan, 2.5, 3.5, nan]);
    }

    #[test]
    fn trailing_median() {
        let series = vec![5.0, 1.0, 3.0, 2.0];
        let result = rolling_median(&series, 3, false);
        let nan = f64::NAN;
        assert_series(&result, &[nan, nan, 3.0, 2.0]);
    }

    #[test]
    fn missing_value_poisons_window() {
        let series = vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0, 7.0];
        let result = rolling_median(&series, 3, true);
        assert!(result[1].is_nan());
        assert!(result[3].is_nan());
        assert_relative_eq!(result[4], 5.0);
    }

    #[test]
    fn median_of_even_and_odd() {
        assert_relative_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn window_larger_than_series() {
        assert!(rolling_median(&[1.0, 2.0], 5, true).iter().all(|v| v.is_nan()));
        assert!(rolling_median(&[], 5, true).is_empty());
    }

    #[test]
    fn smoothed_table_is_separate() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts: Vec<_> = (0..7).map(|i| base + Duration::hours(i)).collect();
        let table = ObservationTable::from_pairs(
            ts,
            vec![("load".to_string(), (1..=7).map(|v| v as f64).collect())],
        )
        .unwrap();

        let smoothed = apply_rolling_median(&table, &["load"], 5).unwrap();
        assert_eq!(smoothed.column_names(), vec!["smoothed_load"]);
        assert_eq!(smoothed.timestamps(), table.timestamps());
        assert_relative_eq!(smoothed.column("smoothed_load").unwrap()[3], 4.0);
        assert_eq!(table.column_names(), vec!["load"]);
    }

    #[test]
    fn smoothing_unknown_feature_fails() {
        let table = ObservationTable::new(vec![], vec![]).unwrap();
        assert!(apply_rolling_median(&table, &["nope"], 5).is_err());
        assert!(apply_rolling_median(&table, &[], 0).is_err());
    }
}
