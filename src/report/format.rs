//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::domain::{DataSource, FitConfig, SampleResidual, Termination};

/// Format the full run summary (dataset stats + solver settings + result).
pub fn format_run_summary(run: &RunOutput, config: &FitConfig) -> String {
    let mut out = String::new();
    let stats = run.samples.stats();

    out.push_str("=== lm - Levenberg-Marquardt curve fit ===\n");
    out.push_str(&format!(
        "Model: {} ({})\n",
        config.family.display_name(),
        config.family.formula()
    ));
    match &config.source {
        DataSource::Synthetic {
            noise_std, seed, ..
        } => out.push_str(&format!("Data: synthetic | noise σ={noise_std} | seed={seed}\n")),
        DataSource::File(path) => out.push_str(&format!("Data: {}\n", path.display())),
    }
    out.push_str(&format!(
        "Points: n={} | t=[{:.3}, {:.3}] | y=[{:.4}, {:.4}]\n",
        stats.n_points, stats.t_min, stats.t_max, stats.y_min, stats.y_max
    ));
    if !run.row_errors.is_empty() {
        out.push_str(&format!("Skipped rows: {}\n", run.row_errors.len()));
        for err in run.row_errors.iter().take(5) {
            out.push_str(&format!("  line {}: {}\n", err.line, err.message));
        }
    }
    out.push_str(&format!(
        "Solver: max_iterations={} | tolerance={:.1e} | initial damping={:.1e}\n",
        config.solver.max_iterations, config.solver.tolerance, config.solver.initial_damping
    ));

    let outcome = &run.outcome;
    out.push_str("\nResult:\n");
    match outcome.termination {
        Termination::Converged => out.push_str(&format!(
            "- converged after {} iteration(s) (step={:.2e})\n",
            outcome.iterations, outcome.step_norm
        )),
        Termination::BudgetExhausted => out.push_str(&format!(
            "- {} after {} iteration(s); last step={:.2e} (tolerance not met)\n",
            outcome.termination.label(),
            outcome.iterations,
            outcome.step_norm
        )),
    }
    out.push_str(&format!("- initial  : {}\n", fmt_vec(&config.initial_guess)));
    if let Some(truth) = config.true_params() {
        out.push_str(&format!("- true     : {}\n", fmt_vec(truth)));
    }
    out.push_str(&format!("- optimized: {}\n", fmt_vec(&outcome.params)));
    out.push_str(&format!(
        "- ||r||={:.6} | MSE={:.6} | final damping={:.1e}\n",
        outcome.residual_norm, run.mse, outcome.damping
    ));
    if outcome.fallback_solves > 0 {
        out.push_str(&format!(
            "- pseudo-inverse fallback used in {} iteration(s)\n",
            outcome.fallback_solves
        ));
    }
    out.push('\n');

    out
}

/// Format the largest-residual table.
pub fn format_residual_table(rows: &[SampleResidual]) -> String {
    let mut out = String::new();
    out.push_str("Largest residuals:\n");
    out.push_str(
        format!("{:>10} {:>14} {:>14} {:>14}\n", "t", "y_obs", "y_fit", "residual").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:->10} {:->14} {:->14} {:->14}\n", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:>10.4} {:>14.6} {:>14.6} {:>14.6}\n",
                r.t, r.y_obs, r.y_fit, r.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

pub fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
