//! Observation sources: synthetic generation with Gaussian noise.

pub mod sample;

pub use sample::*;
