//! Hyperparameter grid and trial enumeration.

use crate::error::{ForecastError, Result};
use crate::models::HyperParams;

/// Candidate values for each hyperparameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    pub changepoint_prior_scale: Vec<f64>,
    pub seasonality_prior_scale: Vec<f64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: vec![0.01, 0.1, 0.5],
            seasonality_prior_scale: vec![0.1, 1.0, 10.0],
        }
    }
}

/// One member of the grid's cross product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    /// Position in enumeration order.
    pub index: usize,
    pub params: HyperParams,
}

impl ParameterGrid {
    pub fn new(
        changepoint_prior_scale: Vec<f64>,
        seasonality_prior_scale: Vec<f64>,
    ) -> Result<Self> {
        let grid = Self {
            changepoint_prior_scale,
            seasonality_prior_scale,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn with_changepoint_prior_scale(mut self, values: Vec<f64>) -> Self {
        self.changepoint_prior_scale = values;
        self
    }

    pub fn with_seasonality_prior_scale(mut self, values: Vec<f64>) -> Self {
        self.seasonality_prior_scale = values;
        self
    }

    /// Every candidate list must be non-empty and hold positive finite values.
    pub fn validate(&self) -> Result<()> {
        for (name, values) in [
            ("changepoint_prior_scale", &self.changepoint_prior_scale),
            ("seasonality_prior_scale", &self.seasonality_prior_scale),
        ] {
            if values.is_empty() {
                return Err(ForecastError::InvalidParameter(format!(
                    "no candidates for {name}"
                )));
            }
            if let Some(v) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{name} candidates must be positive and finite, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.changepoint_prior_scale.len() * self.seasonality_prior_scale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trials in enumeration order: changepoint scale outer, seasonality inner.
    pub fn trials(&self) -> Vec<Trial> {
        self.changepoint_prior_scale
            .iter()
            .flat_map(|&cps| {
                self.seasonality_prior_scale
                    .iter()
                    .map(move |&sps| HyperParams::new(cps, sps))
            })
            .enumerate()
            .map(|(index, params)| Trial { index, params })
            .collect()
    }
}
