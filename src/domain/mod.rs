//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed set of model families (`ModelFamily`)
//! - observation samples (`SampleSet`)
//! - solver options and fit outcomes (`SolverOptions`, `FitOutcome`)
//! - run configuration and saved curve files (`FitConfig`, `CurveFile`)

pub mod types;

pub use types::*;
