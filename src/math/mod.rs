//! Linear-algebra building blocks for the damped normal equations.

pub mod normal;

pub use normal::*;
