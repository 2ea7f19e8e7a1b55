//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Which closed-form model is fitted.
///
/// Each variant carries its own parameter-count contract (`param_count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ModelFamily {
    /// `a * exp(-b t)`
    Exponential,
    /// `a + b t + c t^2`
    Polynomial,
    /// `a * sin(b t + c)`
    Sinusoidal,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Exponential,
        ModelFamily::Polynomial,
        ModelFamily::Sinusoidal,
    ];

    /// Number of parameters the formulas read (the minimum accepted length).
    pub fn param_count(self) -> usize {
        match self {
            ModelFamily::Exponential => 2,
            ModelFamily::Polynomial => 3,
            ModelFamily::Sinusoidal => 3,
        }
    }

    /// Lowercase name used on the command line and in JSON.
    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::Exponential => "exponential",
            ModelFamily::Polynomial => "polynomial",
            ModelFamily::Sinusoidal => "sinusoidal",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelFamily::Exponential => "Exponential",
            ModelFamily::Polynomial => "Polynomial (deg 2)",
            ModelFamily::Sinusoidal => "Sinusoidal",
        }
    }

    /// Formula shown next to fitted parameters.
    pub fn formula(self) -> &'static str {
        match self {
            ModelFamily::Exponential => "y = a * exp(-b t)",
            ModelFamily::Polynomial => "y = a + b t + c t^2",
            ModelFamily::Sinusoidal => "y = a * sin(b t + c)",
        }
    }

    /// Parameters used to generate synthetic data when none are given.
    pub fn default_true_params(self) -> Vec<f64> {
        match self {
            ModelFamily::Exponential => vec![2.5, 1.3],
            ModelFamily::Polynomial | ModelFamily::Sinusoidal => vec![2.5, 1.3, 0.5],
        }
    }

    /// Initial guess used when none is given.
    pub fn default_guess(self) -> Vec<f64> {
        vec![1.0; self.param_count()]
    }

    /// Ensure `params` is long enough for this family.
    pub fn check_params(self, params: &[f64]) -> Result<(), FitError> {
        let expected = self.param_count();
        if params.len() < expected {
            return Err(FitError::InvalidParameterCount {
                family: self,
                expected,
                actual: params.len(),
            });
        }
        Ok(())
    }

    pub fn next(self) -> Self {
        match self {
            ModelFamily::Exponential => ModelFamily::Polynomial,
            ModelFamily::Polynomial => ModelFamily::Sinusoidal,
            ModelFamily::Sinusoidal => ModelFamily::Exponential,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ModelFamily::Exponential => ModelFamily::Sinusoidal,
            ModelFamily::Polynomial => ModelFamily::Exponential,
            ModelFamily::Sinusoidal => ModelFamily::Polynomial,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ModelFamily::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| FitError::UnsupportedModel(name.to_string()))
    }
}

impl TryFrom<String> for ModelFamily {
    type Error = FitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Observed data: independent samples `t` and observations `y`.
///
/// Constructed through `SampleSet::new`, which guarantees equal, non-zero
/// lengths and finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    t: Vec<f64>,
    y: Vec<f64>,
}

impl SampleSet {
    pub fn new(t: Vec<f64>, y: Vec<f64>) -> Result<Self, FitError> {
        if t.len() != y.len() {
            return Err(FitError::InvalidSamples(format!(
                "t has {} values but y has {}",
                t.len(),
                y.len()
            )));
        }
        if t.is_empty() {
            return Err(FitError::InvalidSamples("no samples".to_string()));
        }
        if let Some(i) = t.iter().zip(&y).position(|(a, b)| !a.is_finite() || !b.is_finite()) {
            return Err(FitError::InvalidSamples(format!(
                "non-finite value at sample {i}"
            )));
        }
        Ok(Self { t, y })
    }

    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// Always false: construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Iterate `(t, y)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.t.iter().copied().zip(self.y.iter().copied())
    }

    pub fn stats(&self) -> DatasetStats {
        let mut stats = DatasetStats {
            n_points: self.len(),
            t_min: f64::INFINITY,
            t_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
        };
        for (t, y) in self.iter() {
            stats.t_min = stats.t_min.min(t);
            stats.t_max = stats.t_max.max(t);
            stats.y_min = stats.y_min.min(y);
            stats.y_max = stats.y_max.max(y);
        }
        stats
    }
}

/// Summary stats about the samples actually used for fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub t_min: f64,
    pub t_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Options controlling the Levenberg-Marquardt loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Cap on the number of iterations.
    pub max_iterations: usize,
    /// Converge when the Euclidean norm of the step falls below this.
    pub tolerance: f64,
    /// Starting damping factor (strictly positive).
    pub initial_damping: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            initial_damping: 0.01,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(FitError::InvalidOptions(format!(
                "tolerance must be finite and >= 0 (got {})",
                self.tolerance
            )));
        }
        if !(self.initial_damping.is_finite() && self.initial_damping > 0.0) {
            return Err(FitError::InvalidOptions(format!(
                "initial damping must be finite and > 0 (got {})",
                self.initial_damping
            )));
        }
        Ok(())
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Step norm fell below the tolerance.
    Converged,
    /// `max_iterations` ran without converging; parameters are the last accepted.
    BudgetExhausted,
}

impl Termination {
    pub fn label(self) -> &'static str {
        match self {
            Termination::Converged => "converged",
            Termination::BudgetExhausted => "iteration budget exhausted",
        }
    }
}

/// Result of a single `fit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    /// Optimized parameters (same length as the initial vector).
    pub params: Vec<f64>,
    /// Iterations actually performed.
    pub iterations: usize,
    pub termination: Termination,
    /// Damping factor at exit.
    pub damping: f64,
    /// `||y - f(params)||` at the returned parameters.
    pub residual_norm: f64,
    /// Norm of the last computed step (0 if no iteration ran).
    pub step_norm: f64,
    /// How many iterations needed the pseudo-inverse fallback.
    pub fallback_solves: usize,
}

impl FitOutcome {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Per-sample fitted value and residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResidual {
    pub t: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
}

/// Where observations come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// Generate `model(true_params, t) + N(0, noise_std)` on an even grid.
    Synthetic {
        true_params: Vec<f64>,
        n_points: usize,
        t_min: f64,
        t_max: f64,
        noise_std: f64,
        seed: u64,
    },
    /// Two-column `t,y` CSV file.
    File(PathBuf),
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub family: ModelFamily,
    pub initial_guess: Vec<f64>,
    pub source: DataSource,
    pub solver: SolverOptions,

    pub trace: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

impl FitConfig {
    /// True parameters when the data is synthetic.
    pub fn true_params(&self) -> Option<&[f64]> {
        match &self.source {
            DataSource::Synthetic { true_params, .. } => Some(true_params),
            DataSource::File(_) => None,
        }
    }
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub model: ModelFamily,
    pub params: Vec<f64>,
    pub options: SolverOptions,
    pub outcome: CurveOutcome,
    pub mse: f64,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveOutcome {
    pub iterations: usize,
    pub termination: Termination,
    pub residual_norm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub t: Vec<f64>,
    pub y: Vec<f64>,
}
