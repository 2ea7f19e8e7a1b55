//! Damped normal equations.
//!
//! Each Levenberg-Marquardt iteration solves
//!
//! ```text
//! (J^T J + λ I) Δ = J^T r
//! ```
//!
//! Implementation choices:
//! - The system is tiny (2–3 unknowns), so we form `J^T J` explicitly.
//! - We try a direct LU solve first. Only when LU reports a singular matrix, or
//!   produces non-finite values, do we switch to an SVD pseudo-inverse solve,
//!   which returns the least-norm solution.
//! - The outcome records which path was taken so the solver can report it.

use nalgebra::{DMatrix, DVector};

/// Max SVD sweeps. NaN input can otherwise keep the iteration from settling.
const SVD_MAX_ITERS: usize = 1000;

/// Which path produced the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStrategy {
    Direct,
    PseudoInverse,
}

/// Solution of one damped system.
#[derive(Debug, Clone)]
pub struct StepSolve {
    pub delta: DVector<f64>,
    pub strategy: SolveStrategy,
}

/// Build `H = J^T J + damping * I` and `g = J^T r`.
pub fn damped_normal_equations(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    damping: f64,
) -> (DMatrix<f64>, DVector<f64>) {
    let mut h = jac.tr_mul(jac);
    for i in 0..h.nrows() {
        h[(i, i)] += damping;
    }
    let g = jac.tr_mul(residuals);
    (h, g)
}

/// Solve `H Δ = g`, falling back to the pseudo-inverse when `H` is singular.
///
/// Returns `None` only if neither path yields a finite solution (e.g. `H`
/// already contains NaN/inf).
pub fn solve_damped(h: &DMatrix<f64>, g: &DVector<f64>) -> Option<StepSolve> {
    if let Some(delta) = h.clone().lu().solve(g) {
        if delta.iter().all(|v| v.is_finite()) {
            return Some(StepSolve {
                delta,
                strategy: SolveStrategy::Direct,
            });
        }
    }

    pseudo_inverse_solve(h, g).map(|delta| StepSolve {
        delta,
        strategy: SolveStrategy::PseudoInverse,
    })
}

/// Least-norm solution via SVD, discarding singular values below
/// `max_sv * n * eps`.
pub fn pseudo_inverse_solve(h: &DMatrix<f64>, g: &DVector<f64>) -> Option<DVector<f64>> {
    if h.iter().chain(g.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let svd = h.clone().try_svd(true, true, f64::EPSILON, SVD_MAX_ITERS)?;
    let max_sv = svd.singular_values.max();
    let cutoff = max_sv * h.nrows().max(h.ncols()) as f64 * f64::EPSILON;

    let delta = svd.solve(g, cutoff).ok()?;
    if delta.iter().all(|v| v.is_finite()) {
        Some(delta)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normal_equations_add_damping_to_diagonal() {
        // J = [[1, 0], [1, 1], [1, 2]], r = [1, 2, 3]
        let jac = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let r = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        let (h, g) = damped_normal_equations(&jac, &r, 0.5);

        assert_abs_diff_eq!(h[(0, 0)], 3.5);
        assert_abs_diff_eq!(h[(0, 1)], 3.0);
        assert_abs_diff_eq!(h[(1, 0)], 3.0);
        assert_abs_diff_eq!(h[(1, 1)], 5.5);
        assert_abs_diff_eq!(g[0], 6.0);
        assert_abs_diff_eq!(g[1], 8.0);
    }

    #[test]
    fn regular_system_uses_direct_solve() {
        let h = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let g = DVector::from_row_slice(&[1.0, 2.0]);
        let step = solve_damped(&h, &g).unwrap();
        assert_eq!(step.strategy, SolveStrategy::Direct);
        let back = &h * &step.delta;
        assert_abs_diff_eq!(back[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(back[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_system_falls_back_to_least_norm() {
        // Rank one: both rows identical. Least-norm solution of
        // [1 1; 1 1] x = [2; 2] is x = [1, 1].
        let h = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let g = DVector::from_row_slice(&[2.0, 2.0]);
        let step = solve_damped(&h, &g).unwrap();
        assert_eq!(step.strategy, SolveStrategy::PseudoInverse);
        assert_abs_diff_eq!(step.delta[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(step.delta[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_matrix_yields_zero_step() {
        let h = DMatrix::<f64>::zeros(3, 3);
        let g = DVector::from_row_slice(&[0.0, 0.0, 0.0]);
        let step = solve_damped(&h, &g).unwrap();
        assert_eq!(step.strategy, SolveStrategy::PseudoInverse);
        assert!(step.delta.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn non_finite_system_has_no_solution() {
        let h = DMatrix::from_row_slice(2, 2, &[f64::NAN, 0.0, 0.0, 1.0]);
        let g = DVector::from_row_slice(&[1.0, 1.0]);
        assert!(solve_damped(&h, &g).is_none());
    }
}
