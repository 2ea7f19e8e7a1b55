//! Synthetic sample generation.
//!
//! Observations are `model(true_params, t) + N(0, noise_std)` on an evenly
//! spaced grid. The RNG is seeded so a given configuration always produces the
//! same dataset.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{ModelFamily, SampleSet};
use crate::error::AppError;
use crate::models::evaluate;

#[derive(Debug, Clone)]
pub struct SampleData {
    pub samples: SampleSet,
    /// Noise-free model values at each sample (for plots and reports).
    pub clean: Vec<f64>,
    pub true_params: Vec<f64>,
}

/// `n` evenly spaced points covering `[t_min, t_max]` inclusive.
pub fn linspace(t_min: f64, t_max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![t_min],
        _ => {
            let step = (t_max - t_min) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i + 1 == n { t_max } else { t_min + step * i as f64 })
                .collect()
        }
    }
}

/// Generate noisy observations of `family` evaluated at `true_params`.
pub fn generate_synthetic(
    family: ModelFamily,
    true_params: &[f64],
    t: Vec<f64>,
    noise_std: f64,
    seed: u64,
) -> Result<SampleData, AppError> {
    if t.is_empty() {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }
    if !(noise_std.is_finite() && noise_std >= 0.0) {
        return Err(AppError::new(2, format!("Invalid noise level: {noise_std}")));
    }

    let clean = evaluate(true_params, &t, family)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise_std)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let y: Vec<f64> = clean.iter().map(|&v| v + normal.sample(&mut rng)).collect();
    let samples = SampleSet::new(t, y)?;

    Ok(SampleData {
        samples,
        clean,
        true_params: true_params.to_vec(),
    })
}
