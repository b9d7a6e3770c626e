//! Standardization of feature columns.
//!
//! Fit once, then transform any table holding the fitted columns. The fit
//! uses the population standard deviation; a constant column keeps scale 1.

use crate::core::{is_missing, Column, ObservationTable};
use crate::error::{ForecastError, Result};

/// Center and scale learned for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnScale {
    /// Mean of the fitted values
    pub center: f64,
    /// Population standard deviation (1.0 for constant columns)
    pub scale: f64,
}

impl ColumnScale {
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&x| (x - self.center) / self.scale)
            .collect()
    }

    pub fn inverse(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&x| x * self.scale + self.center)
            .collect()
    }
}

/// Learn the center and scale of a series, ignoring missing cells.
pub fn standardize_params(series: &[f64]) -> ColumnScale {
    let present: Vec<f64> = series.iter().copied().filter(|v| !is_missing(*v)).collect();
    if present.is_empty() {
        return ColumnScale {
            center: 0.0,
            scale: 1.0,
        };
    }

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    ColumnScale {
        center: mean,
        scale: if std < 1e-10 { 1.0 } else { std },
    }
}

/// Zero-mean / unit-variance scaler over every column except the excluded ones.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    exclude: Vec<String>,
}

impl StandardScaler {
    /// Create a scaler leaving the named columns (typically the target) untouched.
    pub fn new(exclude: &[&str]) -> Self {
        Self {
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Learn per-column parameters from `table`.
    pub fn fit(&self, table: &ObservationTable) -> Result<FittedScaler> {
        if table.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let params = table
            .columns()
            .iter()
            .filter(|c| !self.exclude.iter().any(|e| e == c.name()))
            .map(|c| (c.name().to_string(), standardize_params(c.values())))
            .collect();
        Ok(FittedScaler { params })
    }

    /// Fit on `table` and return the scaled table with the fitted scaler.
    pub fn fit_transform(
        &self,
        table: &ObservationTable,
    ) -> Result<(ObservationTable, FittedScaler)> {
        let fitted = self.fit(table)?;
        let scaled = fitted.transform(table)?;
        Ok((scaled, fitted))
    }
}

/// Parameters learned by [`StandardScaler::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedScaler {
    params: Vec<(String, ColumnScale)>,
}

impl FittedScaler {
    /// Names of the scaled columns, in fit order.
    pub fn columns(&self) -> Vec<&str> {
        self.params.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn params(&self, column: &str) -> Option<ColumnScale> {
        self.params
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, p)| *p)
    }

    /// Apply the fitted parameters. Every fitted column must be present;
    /// columns that were not fitted pass through unchanged.
    pub fn transform(&self, table: &ObservationTable) -> Result<ObservationTable> {
        let columns = self
            .params
            .iter()
            .map(|(name, p)| {
                let values = p.transform(table.require_column(name)?);
                Ok(Column::new(name.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;
        table.with_columns(columns)
    }

    /// Undo the scaling.
    pub fn inverse_transform(&self, table: &ObservationTable) -> Result<ObservationTable> {
        let columns = self
            .params
            .iter()
            .map(|(name, p)| {
                let values = p.inverse(table.require_column(name)?);
                Ok(Column::new(name.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;
        table.with_columns(columns)
    }
}
