//! Penalised least squares via the normal equations.
//!
//! Solves `(X'X + diag(λ)) β = X'y`. Each coefficient gets its own penalty,
//! so unpenalised terms (intercept, base slope) use `λ = 0` next to heavily
//! shrunk ones. The system is symmetric, so only its lower triangle is
//! stored, packed row by row, and factored in place.

use crate::error::{ForecastError, Result};

/// Added to every diagonal entry; unpenalised columns may be collinear.
const DIAGONAL_JITTER: f64 = 1e-8;

/// Fit ridge coefficients for a row-major design matrix.
///
/// # Arguments
/// * `design` - one row per observation, each of width `p`
/// * `y` - target values (length n)
/// * `penalties` - per-coefficient ridge penalty (length p, all `>= 0`)
pub fn ridge_fit(design: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if design.len() != n {
        return Err(ForecastError::DimensionMismatch {
            expected: n,
            got: design.len(),
        });
    }

    let p = penalties.len();
    if let Some(row) = design.iter().find(|row| row.len() != p) {
        return Err(ForecastError::DimensionMismatch {
            expected: p,
            got: row.len(),
        });
    }
    if penalties.iter().any(|l| !l.is_finite() || *l < 0.0) {
        return Err(ForecastError::InvalidParameter(
            "ridge penalties must be finite and non-negative".into(),
        ));
    }

    PenalisedSystem::accumulate(design, y, penalties)
        .solve()
        .ok_or_else(|| {
            ForecastError::NoConvergence("normal equations are not positive definite".into())
        })
}

/// Row-major matrix-vector product.
pub fn mat_vec(design: &[Vec<f64>], beta: &[f64]) -> Vec<f64> {
    design
        .iter()
        .map(|row| row.iter().zip(beta).map(|(x, b)| x * b).sum())
        .collect()
}

/// `X'X + diag(λ)` (packed lower triangle) and `X'y`.
struct PenalisedSystem {
    p: usize,
    lower: Vec<f64>,
    rhs: Vec<f64>,
}

/// Offset of entry `(i, j)`, `j <= i`, in a packed lower triangle.
#[inline]
fn packed(i: usize, j: usize) -> usize {
    i * (i + 1) / 2 + j
}

impl PenalisedSystem {
    fn accumulate(design: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Self {
        let p = penalties.len();
        let mut lower = vec![0.0; p * (p + 1) / 2];
        let mut rhs = vec![0.0; p];

        for (row, &target) in design.iter().zip(y) {
            for (i, &xi) in row.iter().enumerate() {
                // hinge columns are zero before their changepoint
                if xi == 0.0 {
                    continue;
                }
                rhs[i] += xi * target;
                let start = packed(i, 0);
                for (cell, &xj) in lower[start..=start + i].iter_mut().zip(row) {
                    *cell += xi * xj;
                }
            }
        }
        for (i, lambda) in penalties.iter().enumerate() {
            lower[packed(i, i)] += lambda + DIAGONAL_JITTER;
        }

        Self { p, lower, rhs }
    }

    /// Factor into `L L'` in place, then substitute forward and back.
    ///
    /// `None` when a pivot is non-positive or non-finite.
    fn solve(mut self) -> Option<Vec<f64>> {
        let p = self.p;
        if p == 0 {
            return None;
        }

        for i in 0..p {
            for j in 0..=i {
                let dot: f64 = (0..j)
                    .map(|k| self.lower[packed(i, k)] * self.lower[packed(j, k)])
                    .sum();
                let value = self.lower[packed(i, j)] - dot;
                if i == j {
                    if !(value.is_finite() && value > 0.0) {
                        return None;
                    }
                    self.lower[packed(i, i)] = value.sqrt();
                } else {
                    self.lower[packed(i, j)] = value / self.lower[packed(j, j)];
                }
            }
        }

        // L z = X'y
        let mut z = self.rhs;
        for i in 0..p {
            let dot: f64 = (0..i).map(|k| self.lower[packed(i, k)] * z[k]).sum();
            z[i] = (z[i] - dot) / self.lower[packed(i, i)];
        }
        // L' β = z
        for i in (0..p).rev() {
            let dot: f64 = (i + 1..p).map(|k| self.lower[packed(k, i)] * z[k]).sum();
            z[i] = (z[i] - dot) / self.lower[packed(i, i)];
        }

        Some(z)
    }
}
