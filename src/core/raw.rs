//! RawTable: untyped delimited input before cleaning.

use crate::error::{ForecastError, Result};

/// Header plus string cells as read from a delimited file.
///
/// Empty cells are stored as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Create a raw table, checking every row has one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        for row in &rows {
            if row.len() != headers.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: headers.len(),
                    got: row.len(),
                });
            }
        }
        Ok(Self { headers, rows })
    }

    /// Build a raw table from string records, treating blank cells as missing.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<String>>) -> Result<Self> {
        let rows = records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|cell| {
                        let trimmed = cell.trim();
                        if trimmed.is_empty() {
                            None
                        } else {
                            Some(trimmed.to_string())
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_columns())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[idx].as_deref()).collect())
    }

    /// Return a table keeping only the columns whose mask entry is `true`.
    pub fn keep_columns(&self, keep: &[bool]) -> Self {
        let headers = self
            .headers
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(h, _)| h.clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(c, _)| c.clone())
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    /// Return a table keeping only the rows whose mask entry is `true`.
    pub fn keep_rows(&self, keep: &[bool]) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(r, _)| r.clone())
                .collect(),
        }
    }
}
