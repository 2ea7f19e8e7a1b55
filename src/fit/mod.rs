//! Curve fitting.
//!
//! Responsibilities:
//!
//! - run the damped Gauss-Newton loop for one model family (`solver`)
//! - expose per-iteration diagnostics to callers (`trace`)

pub mod solver;
pub mod trace;

pub use solver::*;
pub use trace::*;
