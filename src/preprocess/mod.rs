//! Cleaning, imputation and chronological splitting.

pub mod clean;
pub mod impute;
pub mod split;

pub use clean::{clean, encode_zones, CleanReport, CleanerConfig, TARGET_COLUMN, ZONE_PREFIX};
pub use impute::KnnImputer;
pub use split::{chronological_split, Split, SplitConfig, SplitSizes};
