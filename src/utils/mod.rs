//! Utility functions for regressors and evaluation.

pub mod metrics;
pub mod ridge;

pub use metrics::{calculate_metrics, mean_absolute_error, mean_squared_error, ErrorMetrics};
pub use ridge::{mat_vec, ridge_fit};
