//! Delimited-file input and output.
//!
//! Raw input is read as untyped cells; split files are written with the
//! timestamp as the leading `datetime` column and missing values as empty
//! cells, and can be read back into an [`ObservationTable`].

use crate::core::{
    format_timestamp, is_missing, parse_timestamp, Column, ObservationTable, RawTable,
};
use crate::error::{ForecastError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// Name of the leading timestamp column in split files.
pub const DATETIME_HEADER: &str = "datetime";

fn open(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|e| ForecastError::Io(format!("{}: {e}", path.display())))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(BufReader::new(file)))
}

/// Read a delimited file with a header row into a [`RawTable`].
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    let mut reader = open(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let records = reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!(path = %path.display(), rows = records.len(), columns = headers.len(), "read raw table");
    RawTable::from_records(headers, records)
}

/// Write `table` with a leading `datetime` column.
pub fn write_table(path: &Path, table: &ObservationTable) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| ForecastError::Io(format!("{}: {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    let mut header = vec![DATETIME_HEADER];
    header.extend(table.column_names());
    writer.write_record(&header)?;

    let columns = table.columns();
    for (i, ts) in table.timestamps().iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(format_timestamp(ts));
        record.extend(columns.iter().map(|c| format_value(c.values()[i])));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = table.len(), columns = table.n_columns(), "wrote table");
    Ok(())
}

fn format_value(value: f64) -> String {
    if is_missing(value) {
        String::new()
    } else {
        value.to_string()
    }
}

/// Read a file written by [`write_table`].
pub fn read_table(path: &Path) -> Result<ObservationTable> {
    let mut reader = open(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.first().map(String::as_str) != Some(DATETIME_HEADER) {
        return Err(ForecastError::MissingColumn(format!(
            "{DATETIME_HEADER} (leading column of {})",
            path.display()
        )));
    }

    let n_values = headers.len() - 1;
    let mut timestamps = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); n_values];

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        timestamps.push(parse_timestamp(&record[0])?);
        for (c, cell) in record.iter().skip(1).enumerate() {
            values[c].push(parse_value(cell).ok_or_else(|| {
                ForecastError::Csv(format!(
                    "row {}, column '{}': '{cell}' is not a number",
                    line + 1,
                    headers[c + 1]
                ))
            })?);
        }
    }

    let columns = headers
        .into_iter()
        .skip(1)
        .zip(values)
        .map(|(name, v)| Column::new(name, v))
        .collect();
    ObservationTable::new(timestamps, columns)
}

fn parse_value(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        Some(f64::NAN)
    } else {
        cell.parse().ok()
    }
}
