//! Regressor capability consumed by the tuner and the trainer.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::fmt;

/// Flexibility scales of a trend + seasonality regressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperParams {
    /// Prior scale on trend changepoint adjustments.
    pub changepoint_prior_scale: f64,
    /// Prior scale on seasonal Fourier coefficients.
    pub seasonality_prior_scale: f64,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
        }
    }
}

impl HyperParams {
    pub fn new(changepoint_prior_scale: f64, seasonality_prior_scale: f64) -> Self {
        Self {
            changepoint_prior_scale,
            seasonality_prior_scale,
        }
    }

    /// Both scales must be finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "changepoint_prior_scale = {}, seasonality_prior_scale = {}",
            self.changepoint_prior_scale, self.seasonality_prior_scale
        )
    }
}

/// A univariate regressor of a target on its timestamps.
///
/// Fitting never mutates the regressor; each call returns an independent
/// fitted model, so trials can share one regressor.
pub trait Regressor {
    /// Fitted state produced by [`Regressor::fit`].
    type Fitted;

    /// Fit on `(timestamp, target)` pairs with the given hyperparameters.
    fn fit(
        &self,
        params: &HyperParams,
        timestamps: &[DateTime<Utc>],
        target: &[f64],
    ) -> Result<Self::Fitted>;

    /// Predict the target at each timestamp.
    fn predict(&self, fitted: &Self::Fitted, timestamps: &[DateTime<Utc>]) -> Result<Vec<f64>>;

    /// Get the model name.
    fn name(&self) -> &str;
}
