//! Model evaluation for the exponential / polynomial / sinusoidal families.
//!
//! The solver relies on two primitive operations:
//! - predicted values `f(t; p)` for every sample (for residuals)
//! - the analytic Jacobian `∂f/∂p` (for the normal equations)
//!
//! Derivatives are the exact closed forms. The solver's step acceptance depends
//! on the local linearization, so there is no finite-difference fallback.

use nalgebra::DMatrix;

use crate::domain::ModelFamily;
use crate::error::FitError;

/// Predict `y(t)` for the given family.
///
/// # Panics
/// Panics if `params` is shorter than `family.param_count()`. Use `evaluate` for
/// checked evaluation.
pub fn predict(family: ModelFamily, t: f64, params: &[f64]) -> f64 {
    match family {
        ModelFamily::Exponential => params[0] * (-params[1] * t).exp(),
        ModelFamily::Polynomial => params[0] + params[1] * t + params[2] * t * t,
        ModelFamily::Sinusoidal => params[0] * (params[1] * t + params[2]).sin(),
    }
}

/// Fill one Jacobian row (`out.len() == family.param_count()`).
fn fill_jacobian_row(family: ModelFamily, t: f64, params: &[f64], out: &mut [f64]) {
    match family {
        ModelFamily::Exponential => {
            let (a, b) = (params[0], params[1]);
            let e = (-b * t).exp();
            out[0] = e;
            out[1] = -a * t * e;
        }
        ModelFamily::Polynomial => {
            out[0] = 1.0;
            out[1] = t;
            out[2] = t * t;
        }
        ModelFamily::Sinusoidal => {
            let (a, b, c) = (params[0], params[1], params[2]);
            let phase = b * t + c;
            let cos = phase.cos();
            out[0] = phase.sin();
            out[1] = a * t * cos;
            out[2] = a * cos;
        }
    }
}

/// Predicted values for every sample in `t`.
pub fn evaluate(params: &[f64], t: &[f64], family: ModelFamily) -> Result<Vec<f64>, FitError> {
    family.check_params(params)?;
    Ok(t.iter().map(|&ti| predict(family, ti, params)).collect())
}

/// Analytic Jacobian: `t.len()` rows, `family.param_count()` columns.
pub fn jacobian(params: &[f64], t: &[f64], family: ModelFamily) -> Result<DMatrix<f64>, FitError> {
    family.check_params(params)?;

    let p = family.param_count();
    let mut jac = DMatrix::<f64>::zeros(t.len(), p);
    let mut row = vec![0.0; p];
    for (i, &ti) in t.iter().enumerate() {
        fill_jacobian_row(family, ti, params, &mut row);
        for (j, &v) in row.iter().enumerate() {
            jac[(i, j)] = v;
        }
    }
    Ok(jac)
}

/// Residuals `y - f(t; params)`.
pub fn residuals(
    params: &[f64],
    t: &[f64],
    y: &[f64],
    family: ModelFamily,
) -> Result<Vec<f64>, FitError> {
    let predicted = evaluate(params, t, family)?;
    Ok(y.iter().zip(predicted).map(|(&obs, fit)| obs - fit).collect())
}
