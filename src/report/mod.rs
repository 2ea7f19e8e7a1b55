//! Reporting utilities: residuals, error metrics, and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{ModelFamily, SampleResidual, SampleSet};
use crate::error::AppError;
use crate::models::evaluate;

/// Compute fitted values and residuals for each sample.
pub fn compute_residuals(
    samples: &SampleSet,
    family: ModelFamily,
    params: &[f64],
) -> Result<Vec<SampleResidual>, AppError> {
    let fitted = evaluate(params, samples.t(), family)?;
    let mut out = Vec::with_capacity(samples.len());
    for ((t, y_obs), y_fit) in samples.iter().zip(fitted) {
        if !y_fit.is_finite() {
            return Err(AppError::new(4, "Non-finite model prediction during residual computation."));
        }
        out.push(SampleResidual {
            t,
            y_obs,
            y_fit,
            residual: y_obs - y_fit,
        });
    }
    Ok(out)
}

/// Mean of squared differences. Returns NaN for empty input.
pub fn mean_squared_error(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let sse: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p) * (o - p))
        .sum();
    sse / n as f64
}

/// MSE of a residual list.
pub fn residual_mse(residuals: &[SampleResidual]) -> f64 {
    if residuals.is_empty() {
        return f64::NAN;
    }
    residuals.iter().map(|r| r.residual * r.residual).sum::<f64>() / residuals.len() as f64
}

/// The `top_n` samples with the largest absolute residual, largest first.
pub fn largest_residuals(residuals: &[SampleResidual], top_n: usize) -> Vec<SampleResidual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_residuals_basic() {
        let samples = SampleSet::new(vec![0.0, 1.0, 2.0], vec![1.0, 4.0, 9.5]).unwrap();
        let rows = compute_residuals(&samples, ModelFamily::Polynomial, &[1.0, 2.0, 1.0]).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].residual, 0.0);
        assert_eq!(rows[1].residual, 0.0);
        assert!((rows[2].residual - 0.5).abs() < 1e-12);
        assert!((residual_mse(&rows) - 0.25 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn mse_of_identical_series_is_zero() {
        assert_eq!(mean_squared_error(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert_eq!(mean_squared_error(&[1.0, 3.0], &[2.0, 1.0]), 2.5);
        assert!(mean_squared_error(&[], &[]).is_nan());
    }

    #[test]
    fn largest_residuals_ranks_by_magnitude() {
        let rows: Vec<SampleResidual> = [0.1, -3.0, 2.0, -0.5]
            .iter()
            .enumerate()
            .map(|(i, &r)| SampleResidual {
                t: i as f64,
                y_obs: r,
                y_fit: 0.0,
                residual: r,
            })
            .collect();
        let top = largest_residuals(&rows, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].residual, -3.0);
        assert_eq!(top[1].residual, 2.0);
    }
}
