//! Core tabular data structures.

mod raw;
mod table;
mod time;

pub use raw::RawTable;
pub use table::{is_missing, Column, ObservationTable};
pub use time::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
