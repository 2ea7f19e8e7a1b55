//! Read/write curve JSON files.
//!
//! Curve JSON is the "portable" representation of a fitted curve:
//! - model family + optimized parameters
//! - solver options and how the run terminated
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveFile, CurveGrid, CurveOutcome, DatasetStats, FitOutcome, ModelFamily, SolverOptions};
use crate::error::AppError;
use crate::models::predict;

/// Points in the saved grid.
const GRID_POINTS: usize = 101;

/// Assemble the curve file for a finished fit.
pub fn build_curve_file(
    family: ModelFamily,
    outcome: &FitOutcome,
    options: &SolverOptions,
    stats: &DatasetStats,
    mse: f64,
) -> CurveFile {
    let (t, y) = build_grid(family, &outcome.params, stats.t_min, stats.t_max, GRID_POINTS);
    CurveFile {
        tool: "lm".to_string(),
        generated_at: Utc::now(),
        model: family,
        params: outcome.params.clone(),
        options: *options,
        outcome: CurveOutcome {
            iterations: outcome.iterations,
            termination: outcome.termination,
            residual_norm: outcome.residual_norm,
        },
        mse,
        grid: CurveGrid { t, y },
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid curve JSON: {e}")))?;
    if curve.model.check_params(&curve.params).is_err() {
        return Err(AppError::new(
            2,
            format!(
                "Invalid curve JSON: {} model needs {} parameters, file has {}",
                curve.model,
                curve.model.param_count(),
                curve.params.len()
            ),
        ));
    }
    Ok(curve)
}

fn build_grid(family: ModelFamily, params: &[f64], t_min: f64, t_max: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let n = n.max(2);
    let mut t0 = t_min;
    let mut t1 = t_max;
    if !(t0.is_finite() && t1.is_finite()) || t1 < t0 {
        t0 = 0.0;
        t1 = 10.0;
    }
    if (t1 - t0).abs() < 1e-9 {
        t0 -= 0.5;
        t1 += 0.5;
    }

    let mut ts = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);

    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let t = t0 + u * (t1 - t0);
        ts.push(t);
        y.push(predict(family, t, params));
    }

    (ts, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Termination;

    fn outcome(params: Vec<f64>) -> FitOutcome {
        FitOutcome {
            params,
            iterations: 7,
            termination: Termination::Converged,
            damping: 1e-9,
            residual_norm: 0.5,
            step_norm: 1e-7,
            fallback_solves: 0,
        }
    }

    fn stats(t_min: f64, t_max: f64) -> DatasetStats {
        DatasetStats {
            n_points: 10,
            t_min,
            t_max,
            y_min: 0.0,
            y_max: 1.0,
        }
    }

    #[test]
    fn grid_spans_the_data_range() {
        let curve = build_curve_file(
            ModelFamily::Polynomial,
            &outcome(vec![1.0, 0.0, 1.0]),
            &SolverOptions::default(),
            &stats(-2.0, 2.0),
            0.01,
        );
        assert_eq!(curve.grid.t.len(), GRID_POINTS);
        assert_eq!(curve.grid.t[0], -2.0);
        assert_eq!(curve.grid.t[GRID_POINTS - 1], 2.0);
        assert!((curve.grid.y[50] - 1.0).abs() < 1e-12);
        assert!((curve.grid.y[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn single_point_range_is_widened() {
        let (t, _) = build_grid(ModelFamily::Exponential, &[1.0, 1.0], 3.0, 3.0, 3);
        assert_eq!(t, vec![2.5, 3.0, 3.5]);
    }

    #[test]
    fn curve_file_survives_disk() {
        let curve = build_curve_file(
            ModelFamily::Sinusoidal,
            &outcome(vec![2.0, 1.5, 0.5]),
            &SolverOptions::default(),
            &stats(0.0, 10.0),
            0.02,
        );
        let path = std::env::temp_dir().join(format!("lm_curve_{}.json", std::process::id()));
        write_curve_json(&path, &curve).unwrap();
        let back = read_curve_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.model, ModelFamily::Sinusoidal);
        assert_eq!(back.params, curve.params);
        assert_eq!(back.outcome, curve.outcome);
        assert_eq!(back.grid.t.len(), curve.grid.t.len());
    }

    #[test]
    fn unknown_model_names_are_rejected() {
        let path = std::env::temp_dir().join(format!("lm_curve_bad_{}.json", std::process::id()));
        let json = r#"{"tool":"lm","generated_at":"2025-01-01T00:00:00Z","model":"gompertz",
            "params":[1.0],"options":{"max_iterations":100,"tolerance":1e-6,"initial_damping":0.01},
            "outcome":{"iterations":1,"termination":"converged","residual_norm":0.0},
            "mse":0.0,"grid":{"t":[],"y":[]}}"#;
        std::fs::write(&path, json).unwrap();
        let err = read_curve_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("gompertz"), "got: {err}");
    }
}
