//! Reading raw input and writing preprocessed splits.

pub mod csv;

pub use self::csv::{read_raw_table, read_table, write_table, DATETIME_HEADER};
