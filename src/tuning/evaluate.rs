//! Refit with the selected parameters and score the held-out slices.

use crate::core::{is_missing, ObservationTable};
use crate::error::Result;
use crate::models::{HyperParams, Regressor};
use crate::utils::{calculate_metrics, ErrorMetrics};
use tracing::{info, warn};

/// A regressor refit on train + validation.
#[derive(Debug, Clone)]
pub struct TrainedModel<F> {
    pub fitted: F,
    pub params: HyperParams,
    /// In-sample error on the validation slice.
    pub validation: ErrorMetrics,
}

/// Test-slice error and the number of zero-substituted cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub metrics: ErrorMetrics,
    pub substituted_predictions: usize,
    pub substituted_actuals: usize,
}

/// Replace missing values with `0.0`, returning the count replaced.
///
/// Warns once when anything was replaced, naming `label`.
pub fn substitute_missing(values: &[f64], label: &str) -> (Vec<f64>, usize) {
    let count = values.iter().filter(|v| is_missing(**v)).count();
    if count == 0 {
        return (values.to_vec(), 0);
    }
    warn!(
        column = label,
        count, "missing values replaced with 0.0 before scoring"
    );
    let filled = values
        .iter()
        .map(|&v| if is_missing(v) { 0.0 } else { v })
        .collect();
    (filled, count)
}

/// Fit on train + validation with `params` and report validation error.
pub fn train_model<R: Regressor>(
    regressor: &R,
    params: &HyperParams,
    train: &ObservationTable,
    validation: &ObservationTable,
    target: &str,
) -> Result<TrainedModel<R::Fitted>> {
    let history = train.concat(validation)?;
    let fitted = regressor.fit(params, history.timestamps(), history.require_column(target)?)?;

    let predictions = regressor.predict(&fitted, validation.timestamps())?;
    let validation_metrics = calculate_metrics(validation.require_column(target)?, &predictions)?;
    info!(
        regressor = regressor.name(),
        %params,
        mse = validation_metrics.mse,
        mae = validation_metrics.mae,
        "trained on train + validation"
    );

    Ok(TrainedModel {
        fitted,
        params: *params,
        validation: validation_metrics,
    })
}

/// Predict the test slice and score it.
///
/// Missing predictions and missing actuals are replaced with `0.0` first.
pub fn evaluate_model<R: Regressor>(
    regressor: &R,
    trained: &TrainedModel<R::Fitted>,
    test: &ObservationTable,
    target: &str,
) -> Result<Evaluation> {
    let actual = test.require_column(target)?;
    let predictions = regressor.predict(&trained.fitted, test.timestamps())?;

    let (predictions, substituted_predictions) = substitute_missing(&predictions, "predictions");
    let (actual, substituted_actuals) = substitute_missing(actual, target);

    let metrics = calculate_metrics(&actual, &predictions)?;
    info!(
        mse = metrics.mse,
        mae = metrics.mae,
        substituted_predictions,
        substituted_actuals,
        "evaluated on test"
    );

    Ok(Evaluation {
        metrics,
        substituted_predictions,
        substituted_actuals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Counts `WARN` events seen while installed.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&count)));
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, count.load(Ordering::SeqCst))
    }

    /// Replays the last history value, or NaN from a configured row on.
    struct LastValue {
        nan_from: Option<usize>,
    }

    impl Regressor for LastValue {
        type Fitted = f64;

        fn fit(&self, _: &HyperParams, _: &[DateTime<Utc>], target: &[f64]) -> Result<f64> {
            target.last().copied().ok_or(ForecastError::EmptyData)
        }

        fn predict(&self, fitted: &f64, timestamps: &[DateTime<Utc>]) -> Result<Vec<f64>> {
            Ok((0..timestamps.len())
                .map(|i| match self.nan_from {
                    Some(k) if i >= k => f64::NAN,
                    _ => *fitted,
                })
                .collect())
        }

        fn name(&self) -> &str {
            "LastValue"
        }
    }

    fn table(start: usize, values: &[f64]) -> ObservationTable {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let ts = (0..values.len())
            .map(|i| base + Duration::hours((start + i) as i64))
            .collect();
        ObservationTable::from_pairs(ts, vec![("y".to_string(), values.to_vec())]).unwrap()
    }

    #[test]
    fn substitute_counts_and_fills() {
        let (filled, count) = substitute_missing(&[1.0, f64::NAN, 3.0, f64::NAN], "y");
        assert_eq!(count, 2);
        assert_eq!(filled, vec![1.0, 0.0, 3.0, 0.0]);

        let (same, none) = substitute_missing(&[1.0, 2.0], "y");
        assert_eq!(none, 0);
        assert_eq!(same, vec![1.0, 2.0]);
    }

    #[test]
    fn train_reports_validation_error() {
        let train = table(0, &[1.0, 2.0]);
        let validation = table(2, &[3.0, 5.0]);
        let model = LastValue { nan_from: None };

        let trained =
            train_model(&model, &HyperParams::default(), &train, &validation, "y").unwrap();

        assert_eq!(trained.fitted, 5.0);
        // errors 2 and 0
        assert_relative_eq!(trained.validation.mse, 2.0);
        assert_relative_eq!(trained.validation.mae, 1.0);
    }

    #[test]
    fn missing_predictions_become_zero() {
        let train = table(0, &[1.0]);
        let validation = table(1, &[2.0]);
        let test = table(2, &[2.0, 4.0, f64::NAN]);
        let model = LastValue { nan_from: Some(1) };

        let trained =
            train_model(&model, &HyperParams::default(), &train, &validation, "y").unwrap();
        let eval = evaluate_model(&model, &trained, &test, "y").unwrap();

        assert_eq!(eval.substituted_predictions, 2);
        assert_eq!(eval.substituted_actuals, 1);
        // predictions [2, 0, 0], actuals [2, 4, 0]
        assert_relative_eq!(eval.metrics.mse, 16.0 / 3.0);
        assert_relative_eq!(eval.metrics.mae, 4.0 / 3.0);
    }

    #[test]
    fn one_warning_per_offending_column() {
        let train = table(0, &[1.0]);
        let validation = table(1, &[2.0]);
        let test = table(2, &[2.0, f64::NAN, 4.0, f64::NAN, f64::NAN]);
        let model = LastValue { nan_from: Some(2) };

        let ((eval, clean), warnings) = count_warnings(|| {
            let trained =
                train_model(&model, &HyperParams::default(), &train, &validation, "y").unwrap();
            let eval = evaluate_model(&model, &trained, &test, "y").unwrap();
            let clean = table(7, &[1.0, 2.0]);
            let quiet = LastValue { nan_from: None };
            let trained =
                train_model(&quiet, &HyperParams::default(), &train, &validation, "y").unwrap();
            (eval, evaluate_model(&quiet, &trained, &clean, "y").unwrap())
        });

        assert_eq!(eval.substituted_predictions, 3);
        assert_eq!(eval.substituted_actuals, 3);
        assert_eq!(clean.substituted_predictions + clean.substituted_actuals, 0);
        assert_eq!(warnings, 2);
    }

    #[test]
    fn clean_columns_do_not_warn() {
        let (_, warnings) = count_warnings(|| substitute_missing(&[1.0, 2.0, 3.0], "y"));
        assert_eq!(warnings, 0);

        let (_, warnings) =
            count_warnings(|| substitute_missing(&[f64::NAN, f64::NAN, f64::NAN], "y"));
        assert_eq!(warnings, 1);
    }

    #[test]
    fn empty_test_is_an_error() {
        let train = table(0, &[1.0]);
        let validation = table(1, &[2.0]);
        let model = LastValue { nan_from: None };
        let trained =
            train_model(&model, &HyperParams::default(), &train, &validation, "y").unwrap();
        let empty = validation.slice(1, 1).unwrap();
        assert_eq!(
            evaluate_model(&model, &trained, &empty, "y").unwrap_err(),
            ForecastError::EmptyData
        );
    }
}
