//! K-nearest-neighbour imputation.
//!
//! Each missing cell is replaced by the mean of that column over the `k`
//! complete rows closest to the incomplete row. Distance is Euclidean over
//! the columns the incomplete row has, rescaled by `total / present` so rows
//! with different numbers of present values stay comparable.

use crate::core::{is_missing, Column, ObservationTable};
use crate::error::{ForecastError, Result};
use tracing::{debug, info};

/// KNN imputer over every column of a table.
#[derive(Debug, Clone)]
pub struct KnnImputer {
    n_neighbors: usize,
}

impl KnnImputer {
    /// Create an imputer using `n_neighbors` donor rows.
    pub fn new(n_neighbors: usize) -> Result<Self> {
        if n_neighbors == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_neighbors must be positive".to_string(),
            ));
        }
        Ok(Self { n_neighbors })
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Fill the missing cells of `table`.
    ///
    /// Returns the imputed table and the number of filled cells. Fails with
    /// [`ForecastError::InsufficientData`] when something must be imputed but
    /// fewer than `n_neighbors` complete rows exist.
    pub fn impute(&self, table: &ObservationTable) -> Result<(ObservationTable, usize)> {
        let missing = table.missing_count();
        if missing == 0 {
            return Ok((table.clone(), 0));
        }

        let n_rows = table.len();
        let n_cols = table.n_columns();
        let rows: Vec<Vec<f64>> = (0..n_rows)
            .map(|i| table.row(i))
            .collect::<Result<_>>()?;

        let donors: Vec<usize> = (0..n_rows)
            .filter(|&i| !rows[i].iter().any(|v| is_missing(*v)))
            .collect();
        if donors.len() < self.n_neighbors {
            return Err(ForecastError::InsufficientData {
                needed: self.n_neighbors,
                got: donors.len(),
            });
        }

        let mut columns: Vec<Vec<f64>> = table
            .columns()
            .iter()
            .map(|c| c.values().to_vec())
            .collect();
        let column_means: Vec<f64> = (0..n_cols)
            .map(|c| donors.iter().map(|&d| rows[d][c]).sum::<f64>() / donors.len() as f64)
            .collect();

        let mut filled = 0;
        for (i, row) in rows.iter().enumerate() {
            let gaps: Vec<usize> = (0..n_cols).filter(|&c| is_missing(row[c])).collect();
            if gaps.is_empty() {
                continue;
            }

            let neighbors = self.nearest(row, &rows, &donors);
            for &c in &gaps {
                columns[c][i] = match &neighbors {
                    Some(idx) => idx.iter().map(|&d| rows[d][c]).sum::<f64>() / idx.len() as f64,
                    None => column_means[c],
                };
                filled += 1;
            }
        }

        let imputed = ObservationTable::new(
            table.timestamps().to_vec(),
            table
                .columns()
                .iter()
                .zip(columns)
                .map(|(c, values)| Column::new(c.name().to_string(), values))
                .collect(),
        )?;
        info!(
            filled,
            neighbors = self.n_neighbors,
            remaining = imputed.missing_count(),
            "knn imputation done"
        );
        Ok((imputed, filled))
    }

    /// The `k` donors nearest to `row`, ties broken by row order.
    ///
    /// `None` when the row shares no present column with the donors.
    fn nearest(&self, row: &[f64], rows: &[Vec<f64>], donors: &[usize]) -> Option<Vec<usize>> {
        let present = row.iter().filter(|v| !is_missing(**v)).count();
        if present == 0 {
            debug!("row has no present values, falling back to column means");
            return None;
        }
        let weight = row.len() as f64 / present as f64;

        let mut distances: Vec<(f64, usize)> = donors
            .iter()
            .map(|&d| (nan_euclidean(row, &rows[d], weight), d))
            .collect();
        distances.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        Some(
            distances
                .into_iter()
                .take(self.n_neighbors)
                .map(|(_, d)| d)
                .collect(),
        )
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self { n_neighbors: 5 }
    }
}

/// Euclidean distance over coordinates present in `a`, scaled by `weight`.
fn nan_euclidean(a: &[f64], b: &[f64], weight: f64) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .filter(|(x, y)| !is_missing(**x) && !is_missing(**y))
        .map(|(x, y)| (x - y).powi(2))
        .sum();
    (weight * sum).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
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
    fn complete_table_is_untouched() {
        let t = table(vec![("a", vec![1.0, 2.0])]);
        let (out, filled) = KnnImputer::default().impute(&t).unwrap();
        assert_eq!(filled, 0);
        assert_eq!(out, t);
    }

    #[test]
    fn fills_from_nearest_rows() {
        // the incomplete row is closest to the rows with a = 10, 11
        let t = table(vec![
            ("a", vec![1.0, 2.0, 10.0, 11.0, 10.5]),
            ("b", vec![100.0, 200.0, 5.0, 7.0, f64::NAN]),
        ]);
        let (out, filled) = KnnImputer::new(2).unwrap().impute(&t).unwrap();
        assert_eq!(filled, 1);
        assert_relative_eq!(out.column("b").unwrap()[4], 6.0, epsilon = 1e-12);
        assert!(!out.has_missing_values());
        // input untouched
        assert!(t.column("b").unwrap()[4].is_nan());
    }

    #[test]
    fn uses_k_neighbors() {
        let t = table(vec![
            ("a", vec![0.0, 1.0, 2.0, 3.0, 4.0, 100.0, 0.5]),
            ("b", vec![1.0, 2.0, 3.0, 4.0, 5.0, 1000.0, f64::NAN]),
        ]);
        let (out, _) = KnnImputer::default().impute(&t).unwrap();
        // five nearest to a = 0.5 are a = 0..4, b mean = 3
        assert_relative_eq!(out.column("b").unwrap()[6], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn too_few_complete_rows() {
        let t = table(vec![
            ("a", vec![1.0, 2.0, 3.0, f64::NAN]),
            ("b", vec![1.0, 2.0, 3.0, 4.0]),
        ]);
        assert_eq!(
            KnnImputer::default().impute(&t).unwrap_err(),
            ForecastError::InsufficientData { needed: 5, got: 3 }
        );
    }

    #[test]
    fn row_without_values_uses_column_mean() {
        let t = table(vec![
            ("a", vec![1.0, 3.0, f64::NAN]),
            ("b", vec![2.0, 4.0, f64::NAN]),
        ]);
        let (out, filled) = KnnImputer::new(1).unwrap().impute(&t).unwrap();
        assert_eq!(filled, 2);
        assert_relative_eq!(out.column("a").unwrap()[2], 2.0);
        assert_relative_eq!(out.column("b").unwrap()[2], 3.0);
    }

    #[test]
    fn equal_distances_prefer_earlier_rows() {
        let t = table(vec![
            ("a", vec![1.0, -1.0, 0.0]),
            ("b", vec![10.0, 20.0, f64::NAN]),
        ]);
        let (out, _) = KnnImputer::new(1).unwrap().impute(&t).unwrap();
        assert_relative_eq!(out.column("b").unwrap()[2], 10.0);
    }

    #[test]
    fn zero_neighbors_rejected() {
        assert!(KnnImputer::new(0).is_err());
    }

    #[test]
    fn nan_euclidean_scales_by_present() {
        let a = [1.0, f64::NAN];
        let b = [4.0, 9.0];
        assert_relative_eq!(nan_euclidean(&a, &b, 2.0), (2.0_f64 * 9.0).sqrt());
    }
}
