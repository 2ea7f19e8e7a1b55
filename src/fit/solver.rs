//! Levenberg-Marquardt (damped Gauss-Newton) solver.
//!
//! Given:
//! - samples `(t_i, y_i)`
//! - a model family with analytic Jacobian
//! - an initial parameter vector
//!
//! each iteration solves
//!
//! ```text
//! (J^T J + λ I) Δ = J^T r,   r = y - f(t; p)
//! ```
//!
//! and then:
//! - returns `p + Δ` immediately if `||Δ|| < tolerance`
//! - otherwise accepts `p + Δ` and divides `λ` by 10 if `||r||` shrinks, or keeps
//!   `p` and multiplies `λ` by 10
//!
//! The converging step is taken without checking that it lowers `||r||`. The
//! rejection path does check. Callers that need strict monotone improvement
//! should compare `FitOutcome::residual_norm` against the previous accepted norm.
//!
//! Damping has no upper bound: with `tolerance = 0` and a long budget it can
//! overflow to `+inf`, after which every step is rejected until the budget runs out.

use nalgebra::DVector;

use crate::domain::{FitOutcome, ModelFamily, SampleSet, SolverOptions, Termination};
use crate::error::FitError;
use crate::fit::trace::{IterationReport, Reporter};
use crate::math::{SolveStrategy, damped_normal_equations, solve_damped};
use crate::models::{jacobian, residuals};

/// Multiplicative damping update on accept (÷) and reject (×).
pub const DAMPING_FACTOR: f64 = 10.0;

/// Fit `family` to `samples` starting from `initial`.
pub fn fit(
    initial: &[f64],
    samples: &SampleSet,
    options: &SolverOptions,
    family: ModelFamily,
) -> Result<FitOutcome, FitError> {
    fit_with_reporter(initial, samples, options, family, None)
}

/// Same as `fit`, forwarding per-iteration diagnostics to `reporter`.
pub fn fit_with_reporter(
    initial: &[f64],
    samples: &SampleSet,
    options: &SolverOptions,
    family: ModelFamily,
    mut reporter: Option<&mut dyn Reporter>,
) -> Result<FitOutcome, FitError> {
    family.check_params(initial)?;
    options.validate()?;

    let t = samples.t();
    let y = samples.y();
    let p = family.param_count();

    // Only the first `p` entries are fitted; any extra trailing entries would
    // have all-zero Jacobian columns and therefore a zero step, so they are
    // carried through as-is.
    let mut current = DVector::from_column_slice(&initial[..p]);
    let tail = &initial[p..];
    let mut damping = options.initial_damping;
    let mut last_step_norm = 0.0;
    let mut fallback_solves = 0usize;

    let mut r = DVector::from_vec(residuals(current.as_slice(), t, y, family)?);
    let mut r_norm = r.norm();

    for iteration in 0..options.max_iterations {
        let jac = jacobian(current.as_slice(), t, family)?;
        let (h, g) = damped_normal_equations(&jac, &r, damping);

        let Some(step) = solve_damped(&h, &g) else {
            // Non-finite system: treat as a rejected step.
            let next_damping = damping * DAMPING_FACTOR;
            log::warn!(
                "iteration {iteration}: normal equations are non-finite, raising damping to {next_damping:.1e}"
            );
            emit(
                &mut reporter,
                IterationReport {
                    iteration,
                    residual_norm: r_norm,
                    trial_norm: f64::NAN,
                    damping,
                    next_damping,
                    step_norm: f64::NAN,
                    accepted: false,
                    converged: false,
                    strategy: SolveStrategy::PseudoInverse,
                },
            );
            damping = next_damping;
            continue;
        };

        if step.strategy == SolveStrategy::PseudoInverse {
            fallback_solves += 1;
            log::warn!("iteration {iteration}: singular normal matrix, used pseudo-inverse");
        }

        let step_norm = step.delta.norm();
        last_step_norm = step_norm;
        let trial = &current + &step.delta;

        if step_norm < options.tolerance {
            let trial_r = DVector::from_vec(residuals(trial.as_slice(), t, y, family)?);
            emit(
                &mut reporter,
                IterationReport {
                    iteration,
                    residual_norm: r_norm,
                    trial_norm: f64::NAN,
                    damping,
                    next_damping: damping,
                    step_norm,
                    accepted: true,
                    converged: true,
                    strategy: step.strategy,
                },
            );
            finish(&mut reporter);
            log::info!(
                "{} fit converged after {} iteration(s), ||r||={:.6e}",
                family.name(),
                iteration + 1,
                trial_r.norm()
            );
            return Ok(FitOutcome {
                params: join(&trial, tail),
                iterations: iteration + 1,
                termination: Termination::Converged,
                damping,
                residual_norm: trial_r.norm(),
                step_norm,
                fallback_solves,
            });
        }

        let trial_r = DVector::from_vec(residuals(trial.as_slice(), t, y, family)?);
        let trial_norm = trial_r.norm();
        let accepted = trial_norm < r_norm;
        let next_damping = if accepted {
            damping / DAMPING_FACTOR
        } else {
            damping * DAMPING_FACTOR
        };

        log::debug!(
            "iteration {iteration}: ||r||={r_norm:.6e} trial={trial_norm:.6e} lambda={damping:.1e} step={step_norm:.3e} accepted={accepted}"
        );
        emit(
            &mut reporter,
            IterationReport {
                iteration,
                residual_norm: r_norm,
                trial_norm,
                damping,
                next_damping,
                step_norm,
                accepted,
                converged: false,
                strategy: step.strategy,
            },
        );

        if accepted {
            current = trial;
            r = trial_r;
            r_norm = trial_norm;
        }
        damping = next_damping;
    }

    finish(&mut reporter);
    log::info!(
        "{} fit stopped after {} iteration(s) without reaching tolerance {:.1e}, ||r||={:.6e}",
        family.name(),
        options.max_iterations,
        options.tolerance,
        r_norm
    );
    Ok(FitOutcome {
        params: join(&current, tail),
        iterations: options.max_iterations,
        termination: Termination::BudgetExhausted,
        damping,
        residual_norm: r_norm,
        step_norm: last_step_norm,
        fallback_solves,
    })
}

fn join(fitted: &DVector<f64>, tail: &[f64]) -> Vec<f64> {
    fitted.iter().chain(tail).copied().collect()
}

fn emit(reporter: &mut Option<&mut dyn Reporter>, report: IterationReport) {
    if let Some(r) = reporter.as_deref_mut() {
        r.on_iteration(&report);
    }
}

fn finish(reporter: &mut Option<&mut dyn Reporter>) {
    if let Some(r) = reporter.as_deref_mut() {
        r.on_finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::trace::RecordingReporter;
    use crate::models::evaluate;
    use approx::assert_relative_eq;

    fn linspace(n: usize, t0: f64, t1: f64) -> Vec<f64> {
        (0..n)
            .map(|i| t0 + (t1 - t0) * i as f64 / (n as f64 - 1.0))
            .collect()
    }

    fn noiseless(family: ModelFamily, truth: &[f64]) -> SampleSet {
        let t = linspace(100, 0.0, 10.0);
        let y = evaluate(truth, &t, family).unwrap();
        SampleSet::new(t, y).unwrap()
    }

    #[test]
    fn polynomial_with_two_params_fails_before_iterating() {
        let samples = noiseless(ModelFamily::Polynomial, &[1.0, 2.0, 3.0]);
        let mut rec = RecordingReporter::default();
        let err = fit_with_reporter(
            &[1.0, 1.0],
            &samples,
            &SolverOptions::default(),
            ModelFamily::Polynomial,
            Some(&mut rec),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FitError::InvalidParameterCount {
                family: ModelFamily::Polynomial,
                expected: 3,
                actual: 2
            }
        );
        assert!(rec.reports.is_empty());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let samples = noiseless(ModelFamily::Exponential, &[2.5, 1.3]);
        let opts = SolverOptions {
            initial_damping: -1.0,
            ..SolverOptions::default()
        };
        let err = fit(&[1.0, 1.0], &samples, &opts, ModelFamily::Exponential).unwrap_err();
        assert!(matches!(err, FitError::InvalidOptions(_)));
    }

    #[test]
    fn damping_moves_by_factor_ten_each_step() {
        let samples = noiseless(ModelFamily::Exponential, &[2.5, 1.3]);
        let mut rec = RecordingReporter::default();
        let outcome = fit_with_reporter(
            &[1.0, 1.0],
            &samples,
            &SolverOptions::default(),
            ModelFamily::Exponential,
            Some(&mut rec),
        )
        .unwrap();

        assert_eq!(rec.reports.len(), outcome.iterations);
        assert_relative_eq!(rec.reports[0].damping, 0.01);
        for pair in rec.reports.windows(2) {
            assert_relative_eq!(pair[1].damping, pair[0].next_damping);
        }
        for r in &rec.reports {
            assert!(r.damping > 0.0);
            if r.converged {
                continue;
            }
            if r.accepted {
                assert!(r.next_damping < r.damping);
                assert_relative_eq!(r.next_damping, r.damping / 10.0, max_relative = 1e-12);
                assert!(r.trial_norm < r.residual_norm);
            } else {
                assert!(r.next_damping > r.damping);
                assert_relative_eq!(r.next_damping, r.damping * 10.0, max_relative = 1e-12);
            }
        }
    }

    fn record(
        family: ModelFamily,
        guess: &[f64],
        samples: &SampleSet,
        opts: &SolverOptions,
    ) -> (FitOutcome, RecordingReporter) {
        let mut rec = RecordingReporter::default();
        let outcome = fit_with_reporter(guess, samples, opts, family, Some(&mut rec)).unwrap();
        (outcome, rec)
    }

    #[test]
    fn rejected_steps_raise_damping_and_keep_params() {
        let samples = noiseless(ModelFamily::Sinusoidal, &[2.0, 1.5, 0.5]);
        let (outcome, rec) = record(
            ModelFamily::Sinusoidal,
            &[1.0, 1.0, 1.0],
            &samples,
            &SolverOptions::default(),
        );

        assert_eq!(rec.reports.len(), outcome.iterations);
        let rejected = rec.reports.iter().filter(|r| !r.accepted).count();
        assert!(rejected > 0, "expected at least one rejected step");

        for r in rec.reports.iter().filter(|r| !r.accepted) {
            assert!(!(r.trial_norm < r.residual_norm));
            assert_relative_eq!(r.next_damping, r.damping * 10.0, max_relative = 1e-12);
        }
        for pair in rec.reports.windows(2) {
            assert_eq!(pair[1].damping, pair[0].next_damping);
            if pair[0].accepted {
                assert_eq!(pair[1].residual_norm, pair[0].trial_norm);
            } else {
                assert_eq!(pair[1].residual_norm, pair[0].residual_norm);
            }
        }
    }

    #[test]
    fn budget_exhaustion_returns_last_accepted_params() {
        let family = ModelFamily::Sinusoidal;
        let samples = noiseless(family, &[2.0, 1.5, 0.5]);
        let guess = [1.0, 1.0, 1.0];
        let (_, full) = record(family, &guess, &samples, &SolverOptions::default());
        let first_rejection = full
            .reports
            .iter()
            .position(|r| !r.accepted)
            .expect("run has a rejected step");

        // Stop right on the first rejected step.
        let opts = SolverOptions {
            max_iterations: first_rejection + 1,
            ..SolverOptions::default()
        };
        let (outcome, rec) = record(family, &guess, &samples, &opts);

        assert_eq!(outcome.termination, Termination::BudgetExhausted);
        assert_eq!(outcome.iterations, first_rejection + 1);
        let last = rec.reports.last().unwrap();
        assert!(!last.accepted);
        assert_eq!(outcome.residual_norm, last.residual_norm);
        assert_relative_eq!(outcome.damping, last.damping * 10.0, max_relative = 1e-12);
        let after_accepted = rec
            .reports
            .iter()
            .filter(|r| r.accepted)
            .map(|r| r.trial_norm)
            .last()
            .unwrap_or(rec.reports[0].residual_norm);
        assert_eq!(outcome.residual_norm, after_accepted);
    }

    #[test]
    fn overflowing_guess_only_raises_damping() {
        let samples = noiseless(ModelFamily::Exponential, &[2.5, 1.3]);
        let opts = SolverOptions {
            max_iterations: 5,
            ..SolverOptions::default()
        };
        let (outcome, rec) = record(ModelFamily::Exponential, &[2.0, -200.0], &samples, &opts);

        assert_eq!(outcome.termination, Termination::BudgetExhausted);
        assert_eq!(outcome.params, vec![2.0, -200.0]);
        assert_eq!(rec.reports.len(), 5);
        for r in &rec.reports {
            assert!(!r.accepted);
            assert!(!r.converged);
            assert_relative_eq!(r.next_damping, r.damping * 10.0, max_relative = 1e-12);
        }
        assert_relative_eq!(outcome.damping, 0.01 * 1e5, max_relative = 1e-12);
    }

    #[test]
    fn zero_budget_returns_initial_guess() {
        let samples = noiseless(ModelFamily::Polynomial, &[1.0, 2.0, 3.0]);
        let opts = SolverOptions {
            max_iterations: 0,
            ..SolverOptions::default()
        };
        let outcome = fit(&[0.5, 0.5, 0.5], &samples, &opts, ModelFamily::Polynomial).unwrap();
        assert_eq!(outcome.params, vec![0.5, 0.5, 0.5]);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.termination, Termination::BudgetExhausted);
    }

    #[test]
    fn trailing_params_are_carried_through() {
        let samples = noiseless(ModelFamily::Exponential, &[2.5, 1.3]);
        let outcome = fit(
            &[2.0, 1.0, 42.0],
            &samples,
            &SolverOptions::default(),
            ModelFamily::Exponential,
        )
        .unwrap();
        assert_eq!(outcome.params.len(), 3);
        assert_eq!(outcome.params[2], 42.0);
        assert!((outcome.params[0] - 2.5).abs() < 1e-3);
    }

    #[test]
    fn degenerate_design_uses_pseudo_inverse() {
        // Every sample at the same t makes the three polynomial columns equal.
        // The damping is absorbed by rounding, so J^T J + λI is exactly
        // singular; the least-norm step still fits the data.
        let samples = SampleSet::new(vec![1.0; 4], vec![6.0; 4]).unwrap();
        let opts = SolverOptions {
            initial_damping: 1e-20,
            ..SolverOptions::default()
        };
        let outcome = fit(&[1.0, 1.0, 1.0], &samples, &opts, ModelFamily::Polynomial).unwrap();
        assert!(outcome.converged());
        assert!(outcome.fallback_solves >= 1);
        for p in &outcome.params {
            assert!((p - 2.0).abs() < 1e-9, "params: {:?}", outcome.params);
        }
        assert!(outcome.residual_norm < 1e-9);
    }
}
