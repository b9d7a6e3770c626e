//! Column transforms: rolling-median smoothing and standardization.
//!
//! # Example
//!
//! ```
//! use carbon_forecast::transform::rolling_median;
//!
//! let series = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
//! let smoothed = rolling_median(&series, 5, true);
//!
//! assert!(smoothed[0].is_nan());
//! assert_eq!(smoothed[3], 4.0);
//! ```

pub mod scale;
pub mod window;

pub use scale::{standardize_params, ColumnScale, FittedScaler, StandardScaler};
pub use window::{apply_rolling_median, rolling_median, SMOOTHED_PREFIX};
