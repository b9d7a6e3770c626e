//! Regressors consumed by the tuner.

mod traits;

pub mod additive;

pub use additive::{AdditiveModel, AdditiveRegressor, Seasonality};
pub use traits::{HyperParams, Regressor};
