//! Lag and pairwise interaction features.

use crate::core::{Column, ObservationTable};
use crate::error::{ForecastError, Result};

/// Shift a series forward by `k` rows, filling the head with `NaN`.
pub fn lag(series: &[f64], k: usize) -> Vec<f64> {
    let n = series.len();
    let k = k.min(n);
    let mut result = vec![f64::NAN; k];
    result.extend_from_slice(&series[..n - k]);
    result
}

/// Name of the `k`-th lag of `column`.
pub fn lag_name(column: &str, k: usize) -> String {
    format!("{column}_lag_{k}")
}

/// Add `<column>_lag_1` .. `<column>_lag_<max_lag>`.
pub fn add_lag_features(
    table: &ObservationTable,
    column: &str,
    max_lag: usize,
) -> Result<ObservationTable> {
    let values = table.require_column(column)?;
    let lags = (1..=max_lag)
        .map(|k| Column::new(lag_name(column, k), lag(values, k)))
        .collect();
    table.with_columns(lags)
}

/// Element-wise product of two columns.
pub fn interaction(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    if a.len() != b.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).collect())
}

/// Name of the interaction between `a` and `b`.
pub fn interaction_name(a: &str, b: &str) -> String {
    format!("{a}_x_{b}")
}

/// Unordered pairs of `items` in combination order: (0,1), (0,2), .., (1,2), ..
pub fn pairs<T: Copy>(items: &[T]) -> Vec<(T, T)> {
    let mut out = Vec::with_capacity(items.len() * items.len().saturating_sub(1) / 2);
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            out.push((items[i], items[j]));
        }
    }
    out
}

/// Add the product of every unordered pair of `bases` as `<a>_x_<b>`.
///
/// Every base must already be in the table.
pub fn add_interaction_features(
    table: &ObservationTable,
    bases: &[&str],
) -> Result<ObservationTable> {
    let columns = pairs(bases)
        .into_iter()
        .map(|(a, b)| {
            let product = interaction(table.require_column(a)?, table.require_column(b)?)?;
            Ok(Column::new(interaction_name(a, b), product))
        })
        .collect::<Result<Vec<_>>>()?;
    table.with_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn table(pairs: Vec<(&str, Vec<f64>)>) -> ObservationTable {
        let n = pairs[0].1.len();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts = (0..n).map(|i| base + Duration::hours(i as i64)).collect();
        ObservationTable::from_pairs(
            ts,
            pairs.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn lag_one() {
        let lagged = lag(&[10.0, 20.0, 30.0], 1);
        assert!(lagged[0].is_nan());
        assert_eq!(&lagged[1..], &[10.0, 20.0]);
    }

    #[test]
    fn lag_beyond_length() {
        assert!(lag(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
        assert!(lag(&[], 1).is_empty());
        assert_eq!(lag(&[1.0, 2.0], 0), vec![1.0, 2.0]);
    }

    #[test]
    fn lag_24_needs_25_rows() {
        let series: Vec<f64> = (0..24).map(|i| i as f64).collect();
        assert!(lag(&series, 24).iter().all(|v| v.is_nan()));

        let series: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let lagged = lag(&series, 24);
        assert_eq!(lagged.iter().filter(|v| !v.is_nan()).count(), 1);
        assert_eq!(lagged[24], 0.0);
    }

    #[test]
    fn lag_columns_named_per_lag() {
        let t = table(vec![("y", vec![1.0, 2.0, 3.0, 4.0])]);
        let t = add_lag_features(&t, "y", 3).unwrap();
        assert_eq!(t.column_names(), vec!["y", "y_lag_1", "y_lag_2", "y_lag_3"]);
        assert_eq!(t.column("y_lag_3").unwrap()[3], 1.0);
    }

    #[test]
    fn interaction_product() {
        let t = table(vec![("a", vec![2.0, 3.0]), ("b", vec![5.0, 7.0])]);
        let t = add_interaction_features(&t, &["a", "b"]).unwrap();
        assert_eq!(t.column("a_x_b").unwrap(), &[10.0, 21.0]);
    }

    #[test]
    fn four_bases_give_six_pairs() {
        let t = table(vec![
            ("p", vec![1.0]),
            ("q", vec![2.0]),
            ("r", vec![3.0]),
            ("s", vec![4.0]),
        ]);
        let t = add_interaction_features(&t, &["p", "q", "r", "s"]).unwrap();
        let names = t.column_names();
        assert_eq!(
            &names[4..],
            &["p_x_q", "p_x_r", "p_x_s", "q_x_r", "q_x_s", "r_x_s"]
        );
        assert_eq!(t.column("r_x_s").unwrap(), &[12.0]);
    }

    #[test]
    fn interaction_requires_present_bases() {
        let t = table(vec![("a", vec![1.0])]);
        assert!(matches!(
            add_interaction_features(&t, &["a", "missing"]),
            Err(ForecastError::MissingColumn(_))
        ));
    }
}
