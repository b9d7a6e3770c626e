//! Cleaning of the raw grid table into a typed, time-sorted ObservationTable.
//!
//! Steps, in order:
//! 1. drop columns with no values at all
//! 2. drop rows with fewer non-missing cells than `min_non_missing`
//! 3. drop administrative columns (`production_sources`, `timestamp`)
//! 4. one-hot encode the zone column, or collapse a single zone to a constant
//! 5. parse the datetime column and sort rows by it
//!
//! Numeric columns keep their missing cells as `NaN`; see
//! [`KnnImputer`](super::KnnImputer) for filling them.

use crate::core::{parse_timestamp, Column, ObservationTable, RawTable};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Name of the forecasting target.
pub const TARGET_COLUMN: &str = "carbon_intensity_avg";

/// Prefix of one-hot zone indicator columns.
pub const ZONE_PREFIX: &str = "zone_";

/// Configuration for [`clean`].
#[derive(Debug, Clone)]
pub struct CleanerConfig {
    /// Column holding the observation time.
    pub datetime_column: String,
    /// Categorical zone identity column.
    pub zone_column: String,
    /// Target column; must survive cleaning.
    pub target: String,
    /// Minimum number of non-missing cells a row needs to be kept.
    pub min_non_missing: usize,
    /// Non-predictive columns removed when present.
    pub drop_columns: Vec<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            datetime_column: "datetime".to_string(),
            zone_column: "zone_name".to_string(),
            target: TARGET_COLUMN.to_string(),
            min_non_missing: 57,
            drop_columns: vec!["production_sources".to_string(), "timestamp".to_string()],
        }
    }
}

impl CleanerConfig {
    /// Set the minimum number of non-missing cells per row.
    pub fn with_min_non_missing(mut self, threshold: usize) -> Self {
        self.min_non_missing = threshold;
        self
    }

    /// Replace the list of dropped columns.
    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    /// Set the target column.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// What cleaning removed or produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    /// `(rows, columns)` of the raw input.
    pub initial_shape: (usize, usize),
    /// Columns dropped because every cell was missing.
    pub empty_columns: Vec<String>,
    /// Rows dropped for having too few values.
    pub sparse_rows: usize,
    /// Configured columns that were present and dropped.
    pub dropped_columns: Vec<String>,
    /// One-hot zone columns, empty when a single zone was collapsed.
    pub zone_columns: Vec<String>,
    /// Columns dropped because their cells are not numeric.
    pub non_numeric_columns: Vec<String>,
}

/// Clean a raw table.
pub fn clean(raw: &RawTable, config: &CleanerConfig) -> Result<(ObservationTable, CleanReport)> {
    let mut report = CleanReport {
        initial_shape: raw.shape(),
        ..CleanReport::default()
    };
    info!(rows = raw.n_rows(), columns = raw.n_columns(), "initial shape");

    if raw.n_rows() == 0 {
        return Err(ForecastError::EmptyData);
    }
    for required in [&config.datetime_column, &config.zone_column, &config.target] {
        if raw.column_index(required).is_none() {
            return Err(ForecastError::MissingColumn(required.clone()));
        }
    }

    // 1. columns with no values
    let keep: Vec<bool> = (0..raw.n_columns())
        .map(|c| raw.rows().iter().any(|row| row[c].is_some()))
        .collect();
    report.empty_columns = raw
        .headers()
        .iter()
        .zip(&keep)
        .filter(|(_, k)| !**k)
        .map(|(h, _)| h.clone())
        .collect();
    let table = raw.keep_columns(&keep);
    info!(
        rows = table.n_rows(),
        columns = table.n_columns(),
        "dropped columns with all values missing"
    );
    for required in [&config.datetime_column, &config.zone_column, &config.target] {
        if table.column_index(required).is_none() {
            return Err(ForecastError::MissingColumn(required.clone()));
        }
    }

    // 2. sparse rows
    let keep: Vec<bool> = table
        .rows()
        .iter()
        .map(|row| row.iter().filter(|c| c.is_some()).count() >= config.min_non_missing)
        .collect();
    report.sparse_rows = keep.iter().filter(|k| !**k).count();
    let table = table.keep_rows(&keep);
    info!(
        rows = table.n_rows(),
        columns = table.n_columns(),
        threshold = config.min_non_missing,
        "dropped rows below the non-missing threshold"
    );
    if table.n_rows() == 0 {
        return Err(ForecastError::EmptyData);
    }

    // 3. administrative columns
    let keep: Vec<bool> = table
        .headers()
        .iter()
        .map(|h| !config.drop_columns.contains(h))
        .collect();
    report.dropped_columns = table
        .headers()
        .iter()
        .filter(|h| config.drop_columns.contains(h))
        .cloned()
        .collect();
    let table = table.keep_columns(&keep);
    info!(
        rows = table.n_rows(),
        columns = table.n_columns(),
        "dropped non-predictive columns"
    );

    // 4. zone identity
    let zone_cells = table.column(&config.zone_column)?;
    let zones = encode_zones(&zone_cells, &config.zone_column);
    report.zone_columns = if zones.len() > 1 {
        zones.iter().map(|c| c.name().to_string()).collect()
    } else {
        Vec::new()
    };
    info!(zones = zones.len(), "encoded zone identity");

    // 5. datetime
    let timestamps = table
        .column(&config.datetime_column)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Some(s) => parse_timestamp(s),
            None => Err(ForecastError::TimestampError(format!(
                "row {row} has no '{}' value",
                config.datetime_column
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut columns = Vec::new();
    for name in table.headers() {
        if *name == config.datetime_column || *name == config.zone_column {
            continue;
        }
        match parse_numeric(&table.column(name)?) {
            Some(values) => columns.push(Column::new(name.clone(), values)),
            None if *name == config.target => {
                return Err(ForecastError::InvalidParameter(format!(
                    "target column '{name}' is not numeric"
                )));
            }
            None => {
                warn!(column = %name, "dropping non-numeric column");
                report.non_numeric_columns.push(name.clone());
            }
        }
    }
    columns.extend(zones);

    let order = chronological_order(&timestamps)?;
    let sorted_ts = order.iter().map(|&i| timestamps[i]).collect();
    let sorted_columns = columns
        .into_iter()
        .map(|c| {
            let values = order.iter().map(|&i| c.values()[i]).collect();
            Column::new(c.name().to_string(), values)
        })
        .collect();
    let cleaned = ObservationTable::new(sorted_ts, sorted_columns)?;
    info!(
        rows = cleaned.len(),
        columns = cleaned.n_columns(),
        missing = cleaned.missing_count(),
        "parsed datetimes and sorted rows"
    );

    Ok((cleaned, report))
}

/// One-hot encode zone names, or collapse a single zone to a constant column.
///
/// With several distinct zones, one `zone_<value>` column per zone (sorted)
/// is produced and exactly one of them is 1.0 on each row with a zone.
/// Otherwise a single column named `zone_column` holding 1.0 is returned.
pub fn encode_zones(cells: &[Option<&str>], zone_column: &str) -> Vec<Column> {
    let distinct: BTreeSet<&str> = cells.iter().flatten().copied().collect();
    if distinct.len() <= 1 {
        return vec![Column::new(zone_column, vec![1.0; cells.len()])];
    }

    distinct
        .into_iter()
        .map(|zone| {
            let values = cells
                .iter()
                .map(|c| if *c == Some(zone) { 1.0 } else { 0.0 })
                .collect();
            Column::new(format!("{ZONE_PREFIX}{zone}"), values)
        })
        .collect()
}

/// Parse cells as numbers; `None` becomes `NaN`. Returns `None` when any
/// present cell is not a number.
fn parse_numeric(cells: &[Option<&str>]) -> Option<Vec<f64>> {
    cells
        .iter()
        .map(|cell| match cell {
            Some(s) => s.parse::<f64>().ok(),
            None => Some(f64::NAN),
        })
        .collect()
}

/// Stable ascending order of the timestamps; duplicates are rejected.
fn chronological_order(timestamps: &[DateTime<Utc>]) -> Result<Vec<usize>> {
    let mut order: Vec<usize> = (0..timestamps.len()).collect();
    order.sort_by_key(|&i| timestamps[i]);
    for pair in order.windows(2) {
        if timestamps[pair[0]] == timestamps[pair[1]] {
            return Err(ForecastError::TimestampError(format!(
                "duplicate timestamp {}",
                timestamps[pair[0]]
            )));
        }
    }
    Ok(order)
}
