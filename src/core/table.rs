//! ObservationTable: the time-indexed column table every pipeline stage consumes.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// Whether a cell counts as missing (NaN or infinite).
#[inline]
pub fn is_missing(value: f64) -> bool {
    !value.is_finite()
}

/// A named numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of missing cells in the column.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| is_missing(**v)).count()
    }
}

/// Time-indexed table of numeric columns.
///
/// Timestamps are strictly increasing and every column holds exactly one
/// value per timestamp. Missing cells are stored as `NaN`. All operations
/// return a new table; none of them mutate `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl ObservationTable {
    /// Create a table, validating timestamp order, column lengths and names.
    pub fn new(timestamps: Vec<DateTime<Utc>>, columns: Vec<Column>) -> Result<Self> {
        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(format!(
                    "timestamps must be strictly increasing (row {} at {} follows {})",
                    i,
                    timestamps[i],
                    timestamps[i - 1]
                )));
            }
        }

        for (i, column) in columns.iter().enumerate() {
            if column.values.len() != timestamps.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: timestamps.len(),
                    got: column.values.len(),
                });
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(ForecastError::InvalidParameter(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        Ok(Self {
            timestamps,
            columns,
        })
    }

    /// Build a table from `(name, values)` pairs.
    pub fn from_pairs(
        timestamps: Vec<DateTime<Utc>>,
        pairs: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let columns = pairs
            .into_iter()
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self::new(timestamps, columns)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of columns (the timestamp index is not counted).
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`, used for stage logging.
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.n_columns())
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a column, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Values of a column that must be present.
    pub fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    }

    /// Return a table with the given columns appended.
    ///
    /// A column whose name already exists is replaced in place.
    pub fn with_columns(&self, added: Vec<Column>) -> Result<Self> {
        let mut columns = self.columns.clone();
        for column in added {
            if column.values.len() != self.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: self.len(),
                    got: column.values.len(),
                });
            }
            match columns.iter_mut().find(|c| c.name == column.name) {
                Some(existing) => *existing = column,
                None => columns.push(column),
            }
        }
        Ok(Self {
            timestamps: self.timestamps.clone(),
            columns,
        })
    }

    /// Return a table with a single column appended or replaced.
    pub fn with_column(&self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.with_columns(vec![Column::new(name, values)])
    }

    /// Return a table without the named columns. Absent names are ignored.
    pub fn without_columns(&self, names: &[&str]) -> Self {
        Self {
            timestamps: self.timestamps.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| !names.contains(&c.name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Return a table holding exactly the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| {
                self.columns
                    .iter()
                    .find(|c| c.name == *name)
                    .cloned()
                    .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            timestamps: self.timestamps.clone(),
            columns,
        })
    }

    /// Extract the rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(ForecastError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }

        Ok(Self {
            timestamps: self.timestamps[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[start..end].to_vec()))
                .collect(),
        })
    }

    fn keep_rows(&self, keep: &[bool]) -> Self {
        let pick = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| *v)
                .collect()
        };
        Self {
            timestamps: self
                .timestamps
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(t, _)| *t)
                .collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), pick(&c.values)))
                .collect(),
        }
    }

    /// Drop every row that has a missing value in any column.
    ///
    /// Returns the reduced table and the number of rows dropped.
    pub fn drop_incomplete_rows(&self) -> (Self, usize) {
        let keep: Vec<bool> = (0..self.len())
            .map(|row| !self.columns.iter().any(|c| is_missing(c.values[row])))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        (self.keep_rows(&keep), dropped)
    }

    /// Append the rows of `other`, which must have identical columns and
    /// strictly later timestamps.
    pub fn concat(&self, other: &ObservationTable) -> Result<Self> {
        if self.column_names() != other.column_names() {
            return Err(ForecastError::InvalidParameter(
                "cannot concatenate tables with different columns".to_string(),
            ));
        }
        let mut timestamps = self.timestamps.clone();
        timestamps.extend_from_slice(&other.timestamps);
        let columns = self
            .columns
            .iter()
            .zip(&other.columns)
            .map(|(a, b)| {
                let mut values = a.values.clone();
                values.extend_from_slice(&b.values);
                Column::new(a.name.clone(), values)
            })
            .collect();
        Self::new(timestamps, columns)
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index,
                size: self.len(),
            });
        }
        Ok(self.columns.iter().map(|c| c.values[index]).collect())
    }

    /// Total number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    pub fn has_missing_values(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.values.iter().any(|v| is_missing(*v)))
    }
}
