//! Error metrics for regressor evaluation.

use crate::error::{ForecastError, Result};
use std::fmt;

/// Point-forecast error metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
}

impl fmt::Display for ErrorMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MSE = {:.4}, MAE = {:.4}, RMSE = {:.4}",
            self.mse, self.mae, self.rmse
        )
    }
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    Ok(())
}

/// Calculate MSE, MAE and RMSE between actual and predicted values.
///
/// Missing values propagate: a `NaN` on either side yields `NaN` metrics.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<ErrorMetrics> {
    let mse = mean_squared_error(actual, predicted)?;
    let mae = mean_absolute_error(actual, predicted)?;
    Ok(ErrorMetrics {
        mse,
        mae,
        rmse: mse.sqrt(),
    })
}

/// Calculate MSE between two slices.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let n = actual.len() as f64;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n)
}

/// Calculate MAE between two slices.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let n = actual.len() as f64;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_prediction() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let metrics = calculate_metrics(&actual, &actual).unwrap();

        assert_relative_eq!(metrics.mae, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.mse, 0.0, epsilon = 1e-10);
        assert_relative_eq!(metrics.rmse, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn known_values() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = vec![1.5, 2.5, 2.5, 4.5, 4.5];
        // Errors: 0.5 everywhere

        let metrics = calculate_metrics(&actual, &predicted).unwrap();

        assert_relative_eq!(metrics.mae, 0.5, epsilon = 1e-10);
        assert_relative_eq!(metrics.mse, 0.25, epsilon = 1e-10);
        assert_relative_eq!(metrics.rmse, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn squared_error_weights_outliers() {
        let actual = [0.0, 0.0];
        let predicted = [1.0, 3.0];
        assert_relative_eq!(mean_squared_error(&actual, &predicted).unwrap(), 5.0);
        assert_relative_eq!(mean_absolute_error(&actual, &predicted).unwrap(), 2.0);
    }

    #[test]
    fn missing_values_propagate() {
        let mse = mean_squared_error(&[1.0, f64::NAN], &[1.0, 2.0]).unwrap();
        assert!(mse.is_nan());
    }

    #[test]
    fn dimension_mismatch() {
        let result = calculate_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(ForecastError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn empty_data() {
        assert!(matches!(
            calculate_metrics(&[], &[]),
            Err(ForecastError::EmptyData)
        ));
    }

    #[test]
    fn display() {
        let m = ErrorMetrics {
            mse: 4.0,
            mae: 1.5,
            rmse: 2.0,
        };
        assert_eq!(m.to_string(), "MSE = 4.0000, MAE = 1.5000, RMSE = 2.0000");
    }
}
