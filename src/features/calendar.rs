//! Calendar components and cyclical encodings.

use crate::core::{Column, ObservationTable};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

/// Names of the calendar columns added by [`add_calendar_features`].
pub const CALENDAR_COLUMNS: [&str; 5] = ["year", "month", "day", "hour", "dayofweek"];

/// Encode a periodic value as a point on the unit circle.
///
/// Returns `(sin(2π·v/period), cos(2π·v/period))`.
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Add `year`, `month`, `day`, `hour` and `dayofweek` (Monday = 0) columns
/// derived from the UTC timestamps.
pub fn add_calendar_features(table: &ObservationTable) -> Result<ObservationTable> {
    let ts = table.timestamps();
    table.with_columns(vec![
        Column::new("year", component(ts, |t| t.year() as f64)),
        Column::new("month", component(ts, |t| t.month() as f64)),
        Column::new("day", component(ts, |t| t.day() as f64)),
        Column::new("hour", component(ts, |t| t.hour() as f64)),
        Column::new(
            "dayofweek",
            component(ts, |t| t.weekday().num_days_from_monday() as f64),
        ),
    ])
}

fn component<F>(timestamps: &[DateTime<Utc>], f: F) -> Vec<f64>
where
    F: Fn(&DateTime<Utc>) -> f64,
{
    timestamps.iter().map(f).collect()
}

/// Replace `column` with its `<column>_sin` / `<column>_cos` pair.
pub fn encode_cyclical(
    table: &ObservationTable,
    column: &str,
    period: f64,
) -> Result<ObservationTable> {
    if period <= 0.0 {
        return Err(ForecastError::InvalidParameter(format!(
            "period for '{column}' must be positive"
        )));
    }

    let values = table.require_column(column)?;
    let (sin, cos): (Vec<f64>, Vec<f64>) = values.iter().map(|&v| cyclical(v, period)).unzip();

    table
        .with_columns(vec![
            Column::new(format!("{column}_sin"), sin),
            Column::new(format!("{column}_cos"), cos),
        ])
        .map(|t| t.without_columns(&[column]))
}
