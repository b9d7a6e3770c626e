//! Exhaustive grid search against the validation slice.
//!
//! Every trial fits the regressor on train + validation and scores its
//! predictions for the validation timestamps by MSE. The incumbent is
//! replaced only on strict improvement, so among equal scores the earliest
//! trial wins.

use super::grid::{ParameterGrid, Trial};
use crate::core::ObservationTable;
use crate::error::{ForecastError, Result};
use crate::models::Regressor;
use crate::preprocess::TARGET_COLUMN;
use crate::utils::mean_squared_error;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A trial and its validation MSE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialResult {
    pub trial: Trial,
    pub mse: f64,
}

/// Best trial plus the full trial log in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningOutcome {
    pub best: TrialResult,
    pub trials: Vec<TrialResult>,
}

/// Pick the minimum-MSE result, keeping the earliest on ties.
pub fn select_best(results: &[TrialResult]) -> Option<TrialResult> {
    let mut best: Option<TrialResult> = None;
    for result in results {
        match best {
            Some(b) if result.mse >= b.mse => {}
            _ => best = Some(*result),
        }
    }
    best
}

/// Grid-search tuner.
#[derive(Debug, Clone)]
pub struct Tuner {
    grid: ParameterGrid,
    target: String,
}

impl Default for Tuner {
    fn default() -> Self {
        Self::new(ParameterGrid::default())
    }
}

/// Borrowed fit/score data shared by all trials.
struct TrialData<'a> {
    history_ts: &'a [DateTime<Utc>],
    history_y: &'a [f64],
    validation_ts: &'a [DateTime<Utc>],
    validation_y: &'a [f64],
}

impl Tuner {
    pub fn new(grid: ParameterGrid) -> Self {
        Self {
            grid,
            target: TARGET_COLUMN.to_string(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    /// Run every trial and return the best one with the trial log.
    ///
    /// Any trial that fails to fit or scores a non-finite MSE aborts the
    /// search with [`ForecastError::NoConvergence`].
    pub fn tune<R>(
        &self,
        regressor: &R,
        train: &ObservationTable,
        validation: &ObservationTable,
    ) -> Result<TuningOutcome>
    where
        R: Regressor + Sync,
    {
        self.grid.validate()?;
        if validation.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let history = train.concat(validation)?;
        let data = TrialData {
            history_ts: history.timestamps(),
            history_y: history.require_column(&self.target)?,
            validation_ts: validation.timestamps(),
            validation_y: validation.require_column(&self.target)?,
        };

        let trials = self.grid.trials();
        info!(
            trials = trials.len(),
            regressor = regressor.name(),
            history = history.len(),
            validation = validation.len(),
            "starting grid search"
        );

        let results = run_trials(regressor, &trials, &data)?;
        let best = select_best(&results).ok_or(ForecastError::EmptyData)?;
        info!(
            best_trial = best.trial.index,
            mse = best.mse,
            params = %best.trial.params,
            "grid search done"
        );

        Ok(TuningOutcome {
            best,
            trials: results,
        })
    }
}

#[cfg(not(feature = "parallel"))]
fn run_trials<R: Regressor>(
    regressor: &R,
    trials: &[Trial],
    data: &TrialData<'_>,
) -> Result<Vec<TrialResult>> {
    trials
        .iter()
        .map(|trial| run_trial(regressor, trial, data))
        .collect()
}

#[cfg(feature = "parallel")]
fn run_trials<R: Regressor + Sync>(
    regressor: &R,
    trials: &[Trial],
    data: &TrialData<'_>,
) -> Result<Vec<TrialResult>> {
    // indexed collect keeps enumeration order
    trials
        .par_iter()
        .map(|trial| run_trial(regressor, trial, data))
        .collect()
}

fn run_trial<R: Regressor>(
    regressor: &R,
    trial: &Trial,
    data: &TrialData<'_>,
) -> Result<TrialResult> {
    let fail = |reason: String| {
        ForecastError::NoConvergence(format!(
            "trial {} ({}) {reason}",
            trial.index, trial.params
        ))
    };

    let fitted = regressor
        .fit(&trial.params, data.history_ts, data.history_y)
        .map_err(|e| fail(format!("failed to fit: {e}")))?;
    let predictions = regressor
        .predict(&fitted, data.validation_ts)
        .map_err(|e| fail(format!("failed to predict: {e}")))?;
    let mse = mean_squared_error(data.validation_y, &predictions)?;
    if !mse.is_finite() {
        return Err(fail(format!("scored non-finite MSE {mse}")));
    }

    debug!(trial = trial.index, params = %trial.params, mse, "trial scored");
    Ok(TrialResult { trial: *trial, mse })
}
