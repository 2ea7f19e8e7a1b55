//! Shared "fit pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load or generate samples -> LM fit -> residuals -> MSE
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use crate::data::generate_synthetic;
use crate::domain::{DataSource, FitConfig, FitOutcome, SampleResidual, SampleSet};
use crate::error::AppError;
use crate::fit::{Reporter, fit_with_reporter};
use crate::io::ingest::{RowError, load_samples};
use crate::report::{compute_residuals, residual_mse};

/// All computed outputs of a single `lm fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub samples: SampleSet,
    /// Noise-free values when the data is synthetic.
    pub clean: Option<Vec<f64>>,
    pub row_errors: Vec<RowError>,
    pub outcome: FitOutcome,
    pub residuals: Vec<SampleResidual>,
    pub mse: f64,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    run_fit_with_reporter(config, None)
}

/// Same as `run_fit`, forwarding solver iterations to `reporter`.
pub fn run_fit_with_reporter(
    config: &FitConfig,
    reporter: Option<&mut dyn Reporter>,
) -> Result<RunOutput, AppError> {
    // 1) Obtain samples.
    let (samples, clean, row_errors) = match &config.source {
        DataSource::Synthetic {
            true_params,
            n_points,
            t_min,
            t_max,
            noise_std,
            seed,
        } => {
            if !(t_min.is_finite() && t_max.is_finite() && t_max >= t_min) {
                return Err(AppError::new(2, "Invalid t range for sample generation."));
            }
            let t = crate::data::linspace(*t_min, *t_max, *n_points);
            let data = generate_synthetic(config.family, true_params, t, *noise_std, *seed)?;
            (data.samples, Some(data.clean), Vec::new())
        }
        DataSource::File(path) => {
            let ingest = load_samples(path)?;
            (ingest.samples, None, ingest.row_errors)
        }
    };

    // 2) Fit.
    let outcome = fit_with_reporter(
        &config.initial_guess,
        &samples,
        &config.solver,
        config.family,
        reporter,
    )?;

    // 3) Residuals and MSE.
    let residuals = compute_residuals(&samples, config.family, &outcome.params)?;
    let mse = residual_mse(&residuals);

    Ok(RunOutput {
        samples,
        clean,
        row_errors,
        outcome,
        residuals,
        mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelFamily, SolverOptions};

    fn synthetic_config(family: ModelFamily, guess: Vec<f64>) -> FitConfig {
        FitConfig {
            family,
            initial_guess: guess,
            source: DataSource::Synthetic {
                true_params: family.default_true_params(),
                n_points: 100,
                t_min: 0.0,
                t_max: 10.0,
                noise_std: 0.1,
                seed: 42,
            },
            solver: SolverOptions::default(),
            trace: false,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_curve: None,
        }
    }

    #[test]
    fn synthetic_exponential_run_recovers_parameters() {
        let config = synthetic_config(ModelFamily::Exponential, vec![1.0, 1.0]);
        let run = run_fit(&config).unwrap();
        assert!(run.clean.is_some());
        assert_eq!(run.residuals.len(), 100);
        assert!((run.outcome.params[0] - 2.5).abs() < 0.2, "{:?}", run.outcome.params);
        assert!((run.outcome.params[1] - 1.3).abs() < 0.2, "{:?}", run.outcome.params);
        assert!(run.mse < 0.05, "mse={}", run.mse);
    }

    #[test]
    fn short_guess_surfaces_as_config_error() {
        let config = synthetic_config(ModelFamily::Polynomial, vec![1.0, 1.0]);
        let err = run_fit(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = synthetic_config(ModelFamily::Polynomial, vec![1.0, 1.0, 1.0]);
        if let DataSource::Synthetic { t_min, t_max, .. } = &mut config.source {
            *t_min = 5.0;
            *t_max = 1.0;
        }
        assert!(run_fit(&config).is_err());
    }
}
