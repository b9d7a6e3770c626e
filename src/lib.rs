//! # carbon-forecast
//!
//! Carbon intensity forecasting on hourly electricity grid data.
//!
//! Raw observations are cleaned, KNN-imputed, turned into calendar, cyclical,
//! lag and interaction features, standardised and split chronologically into
//! train / validation / test. A trend + seasonality regressor is then tuned by
//! exhaustive grid search on the validation slice, refit on train +
//! validation and scored on the test slice.
//!
//! # Example
//!
//! ```
//! use carbon_forecast::preprocess::SplitConfig;
//! use carbon_forecast::tuning::ParameterGrid;
//!
//! let sizes = SplitConfig::default().sizes(100);
//! assert_eq!((sizes.train, sizes.validation, sizes.test), (70, 15, 15));
//! assert_eq!(ParameterGrid::default().trials().len(), 9);
//! ```

#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod features;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod transform;
pub mod tuning;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Column, ObservationTable, RawTable};
    pub use crate::error::{ForecastError, Result};
    pub use crate::features::{FeatureConfig, FeatureEngineer};
    pub use crate::models::{AdditiveRegressor, HyperParams, Regressor};
    pub use crate::pipeline::{prepare, run, PipelineConfig};
    pub use crate::preprocess::{CleanerConfig, KnnImputer, Split, SplitConfig};
    pub use crate::tuning::{ParameterGrid, Tuner};
    pub use crate::utils::{calculate_metrics, ErrorMetrics};
}
