//! Closed-form model families.
//!
//! Models are implemented as small, pure functions so that the solver can stay
//! generic over the family.

pub mod model;

pub use model::*;
