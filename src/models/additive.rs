//! Additive trend + seasonality regressor.
//!
//! The target is modelled as
//!
//! ```text
//! y(t) = k·t + m + Σ δ_j (t - s_j)_+ + Σ_p Σ_k [a_pk sin(2πk·t/P) + b_pk cos(2πk·t/P)]
//! ```
//!
//! a piecewise-linear trend with changepoints `s_j` plus Fourier
//! seasonalities. Coefficients are the maximum a posteriori estimate under
//! Gaussian priors, which reduces to ridge regression: changepoint
//! adjustments are penalised by `σ²/changepoint_prior_scale²` and Fourier
//! coefficients by `σ²/seasonality_prior_scale²`, where `σ²` is the residual
//! variance of a plain linear trend.

use crate::error::{ForecastError, Result};
use crate::models::{HyperParams, Regressor};
use crate::utils::{mat_vec, ridge_fit};
use chrono::{DateTime, Utc};
use std::f64::consts::PI;
use tracing::debug;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A Fourier seasonality included in a fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub order: usize,
}

impl Seasonality {
    fn terms(&self, t_days: f64, out: &mut Vec<f64>) {
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * t_days / self.period_days;
            out.push(angle.sin());
            out.push(angle.cos());
        }
    }
}

/// Piecewise-linear trend + Fourier seasonality regressor.
#[derive(Debug, Clone)]
pub struct AdditiveRegressor {
    n_changepoints: usize,
    changepoint_range: f64,
    daily_order: usize,
    weekly_order: usize,
    yearly_order: usize,
}

impl Default for AdditiveRegressor {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            daily_order: 4,
            weekly_order: 3,
            yearly_order: 10,
        }
    }
}

impl AdditiveRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of trend changepoints.
    pub fn with_changepoints(mut self, n: usize) -> Self {
        self.n_changepoints = n;
        self
    }

    /// Set the leading fraction of history where changepoints may sit.
    pub fn with_changepoint_range(mut self, range: f64) -> Self {
        self.changepoint_range = range;
        self
    }

    /// Set daily, weekly and yearly Fourier orders (0 disables).
    pub fn with_fourier_orders(mut self, daily: usize, weekly: usize, yearly: usize) -> Self {
        self.daily_order = daily;
        self.weekly_order = weekly;
        self.yearly_order = yearly;
        self
    }

    /// Seasonalities resolvable from a history of `span_days` sampled every
    /// `spacing_days`.
    fn seasonalities(&self, span_days: f64, spacing_days: f64) -> Vec<Seasonality> {
        let mut out = Vec::new();
        if self.daily_order > 0 && span_days >= 2.0 && spacing_days < 1.0 {
            out.push(Seasonality {
                name: "daily",
                period_days: 1.0,
                order: self.daily_order,
            });
        }
        if self.weekly_order > 0 && span_days >= 14.0 && spacing_days < 7.0 {
            out.push(Seasonality {
                name: "weekly",
                period_days: 7.0,
                order: self.weekly_order,
            });
        }
        if self.yearly_order > 0 && span_days >= 730.0 {
            out.push(Seasonality {
                name: "yearly",
                period_days: 365.25,
                order: self.yearly_order,
            });
        }
        out
    }

    /// Changepoints at evenly spaced rows of the leading history.
    fn changepoints(&self, t: &[f64]) -> Vec<f64> {
        let hist = ((t.len() as f64) * self.changepoint_range).floor() as usize;
        let n_cp = self.n_changepoints.min(hist.saturating_sub(1));
        if n_cp == 0 {
            return Vec::new();
        }
        let step = (hist - 1) as f64 / n_cp as f64;
        (1..=n_cp)
            .map(|j| t[((j as f64) * step).round() as usize])
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.changepoint_range) {
            return Err(ForecastError::InvalidParameter(format!(
                "changepoint_range must lie in [0, 1], got {}",
                self.changepoint_range
            )));
        }
        Ok(())
    }
}

/// A fitted [`AdditiveRegressor`].
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    params: HyperParams,
    start: DateTime<Utc>,
    t_scale: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    coefficients: Vec<f64>,
    noise_variance: f64,
}

impl AdditiveModel {
    pub fn params(&self) -> &HyperParams {
        &self.params
    }

    /// Changepoint locations on the [0, 1] history scale.
    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    pub fn seasonalities(&self) -> &[Seasonality] {
        &self.seasonalities
    }

    /// Coefficients: intercept, slope, changepoint deltas, Fourier terms.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Residual variance of the plain linear trend (scaled target).
    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    fn scaled_time(&self, ts: &DateTime<Utc>) -> f64 {
        seconds_between(&self.start, ts) / self.t_scale
    }

    fn design(&self, timestamps: &[DateTime<Utc>]) -> Vec<Vec<f64>> {
        timestamps
            .iter()
            .map(|ts| design_row(self.scaled_time(ts), ts, &self.changepoints, &self.seasonalities))
            .collect()
    }
}

fn seconds_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    (*to - *from).num_milliseconds() as f64 / 1000.0
}

fn epoch_days(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0 / SECONDS_PER_DAY
}

fn design_row(
    t: f64,
    ts: &DateTime<Utc>,
    changepoints: &[f64],
    seasonalities: &[Seasonality],
) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|&s| (t - s).max(0.0)));
    let t_days = epoch_days(ts);
    for s in seasonalities {
        s.terms(t_days, &mut row);
    }
    row
}

impl Regressor for AdditiveRegressor {
    type Fitted = AdditiveModel;

    fn fit(
        &self,
        params: &HyperParams,
        timestamps: &[DateTime<Utc>],
        target: &[f64],
    ) -> Result<AdditiveModel> {
        self.validate()?;
        params.validate()?;

        let n = target.len();
        if timestamps.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: timestamps.len(),
            });
        }
        if n < 2 {
            return Err(ForecastError::InsufficientData { needed: 2, got: n });
        }
        if target.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let start = timestamps[0];
        let t_scale = seconds_between(&start, &timestamps[n - 1]);
        if t_scale <= 0.0 {
            return Err(ForecastError::TimestampError(
                "history must span a positive time range".to_string(),
            ));
        }
        let spacing_days = timestamps
            .windows(2)
            .map(|w| seconds_between(&w[0], &w[1]))
            .fold(f64::INFINITY, f64::min)
            / SECONDS_PER_DAY;

        let y_scale = match target.iter().fold(0.0_f64, |m, v| m.max(v.abs())) {
            m if m > 0.0 => m,
            _ => 1.0,
        };
        let y: Vec<f64> = target.iter().map(|v| v / y_scale).collect();
        let t: Vec<f64> = timestamps
            .iter()
            .map(|ts| seconds_between(&start, ts) / t_scale)
            .collect();

        let changepoints = self.changepoints(&t);
        let seasonalities = self.seasonalities(t_scale / SECONDS_PER_DAY, spacing_days);

        let noise_variance = linear_trend_variance(&t, &y)?;
        let cp_penalty = noise_variance / params.changepoint_prior_scale.powi(2);
        let season_penalty = noise_variance / params.seasonality_prior_scale.powi(2);

        let design: Vec<Vec<f64>> = t
            .iter()
            .zip(timestamps)
            .map(|(&ti, ts)| design_row(ti, ts, &changepoints, &seasonalities))
            .collect();
        let n_fourier: usize = seasonalities.iter().map(|s| 2 * s.order).sum();
        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(cp_penalty).take(changepoints.len()));
        penalties.extend(std::iter::repeat(season_penalty).take(n_fourier));

        let coefficients = ridge_fit(&design, &y, &penalties)?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::NoConvergence(
                "non-finite coefficients".to_string(),
            ));
        }

        debug!(
            rows = n,
            changepoints = changepoints.len(),
            seasonalities = seasonalities.len(),
            %params,
            "fitted additive regressor"
        );

        Ok(AdditiveModel {
            params: *params,
            start,
            t_scale,
            y_scale,
            changepoints,
            seasonalities,
            coefficients,
            noise_variance,
        })
    }

    fn predict(&self, fitted: &AdditiveModel, timestamps: &[DateTime<Utc>]) -> Result<Vec<f64>> {
        let design = fitted.design(timestamps);
        Ok(mat_vec(&design, &fitted.coefficients)
            .into_iter()
            .map(|v| v * fitted.y_scale)
            .collect())
    }

    fn name(&self) -> &str {
        "AdditiveRegressor"
    }
}

/// Residual variance of an unpenalised intercept + slope fit.
fn linear_trend_variance(t: &[f64], y: &[f64]) -> Result<f64> {
    let design: Vec<Vec<f64>> = t.iter().map(|&ti| vec![1.0, ti]).collect();
    let beta = ridge_fit(&design, y, &[0.0, 0.0])?;
    let fitted = mat_vec(&design, &beta);
    let variance = y
        .iter()
        .zip(&fitted)
        .map(|(a, f)| (a - f).powi(2))
        .sum::<f64>()
        / y.len() as f64;
    Ok(variance.max(1e-6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mean_squared_error;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn hourly(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn extrapolates_linear_trend() {
        let ts = hourly(24 * 10 + 24);
        let y: Vec<f64> = (0..ts.len()).map(|i| 100.0 + 0.5 * i as f64).collect();
        let model = AdditiveRegressor::new();
        let fitted = model
            .fit(&HyperParams::default(), &ts[..240], &y[..240])
            .unwrap();

        let pred = model.predict(&fitted, &ts[240..]).unwrap();
        for (p, a) in pred.iter().zip(&y[240..]) {
            assert_relative_eq!(*p, *a, epsilon = 1.0);
        }
    }

    #[test]
    fn captures_daily_cycle() {
        let ts = hourly(24 * 15);
        let y: Vec<f64> = (0..ts.len())
            .map(|i| 200.0 + 50.0 * (2.0 * PI * (i % 24) as f64 / 24.0).sin())
            .collect();
        let model = AdditiveRegressor::new();
        let fitted = model
            .fit(&HyperParams::default(), &ts[..24 * 14], &y[..24 * 14])
            .unwrap();
        assert!(fitted.seasonalities().iter().any(|s| s.name == "daily"));

        let pred = model.predict(&fitted, &ts[24 * 14..]).unwrap();
        for (p, a) in pred.iter().zip(&y[24 * 14..]) {
            assert_relative_eq!(*p, *a, epsilon = 1.0);
        }
    }

    #[test]
    fn looser_changepoint_prior_fits_kink_better() {
        let ts = hourly(200);
        let y: Vec<f64> = (0..200)
            .map(|i| if i < 100 { i as f64 } else { 100.0 - 2.0 * (i - 100) as f64 })
            .collect();
        let model = AdditiveRegressor::new().with_fourier_orders(0, 0, 0);

        let mse = |cps: f64| {
            let fitted = model.fit(&HyperParams::new(cps, 10.0), &ts, &y).unwrap();
            let pred = model.predict(&fitted, &ts).unwrap();
            mean_squared_error(&y, &pred).unwrap()
        };
        assert!(mse(0.5) <= mse(0.001));
    }

    #[test]
    fn changepoint_count() {
        let model = AdditiveRegressor::new();
        let t: Vec<f64> = (0..100).map(|i| i as f64 / 99.0).collect();
        let cps = model.changepoints(&t);
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|&c| c > 0.0 && c <= 0.8));

        let t: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        assert_eq!(model.changepoints(&t).len(), 7);
        assert!(model.changepoints(&[0.0, 1.0]).is_empty());
    }

    #[test]
    fn seasonalities_follow_history_span() {
        let model = AdditiveRegressor::new();
        let names = |span, spacing| {
            model
                .seasonalities(span, spacing)
                .into_iter()
                .map(|s| s.name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(1.0, 1.0 / 24.0), Vec::<&str>::new());
        assert_eq!(names(10.0, 1.0 / 24.0), vec!["daily"]);
        assert_eq!(names(60.0, 1.0 / 24.0), vec!["daily", "weekly"]);
        assert_eq!(names(800.0, 1.0), vec!["weekly", "yearly"]);
    }

    #[test]
    fn fit_errors() {
        let model = AdditiveRegressor::new();
        let params = HyperParams::default();
        let ts = hourly(3);

        assert!(matches!(
            model.fit(&params, &ts, &[1.0, 2.0]),
            Err(ForecastError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            model.fit(&params, &ts[..1], &[1.0]),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert_eq!(
            model.fit(&params, &ts, &[1.0, f64::NAN, 3.0]).unwrap_err(),
            ForecastError::MissingValues
        );
        assert!(model
            .fit(&HyperParams::new(0.0, 1.0), &ts, &[1.0, 2.0, 3.0])
            .is_err());
        assert!(matches!(
            model.fit(&params, &[ts[0], ts[0]], &[1.0, 2.0]),
            Err(ForecastError::TimestampError(_))
        ));
    }

    #[test]
    fn constant_zero_target() {
        let ts = hourly(48);
        let model = AdditiveRegressor::new();
        let fitted = model.fit(&HyperParams::default(), &ts, &[0.0; 48]).unwrap();
        let pred = model.predict(&fitted, &ts).unwrap();
        assert!(pred.iter().all(|p| p.abs() < 1e-6));
    }
}
