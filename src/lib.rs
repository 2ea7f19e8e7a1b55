//! `lm-curves` library crate.
//!
//! The binary (`lm`) is a thin wrapper around this library so that:
//!
//! - the solver and model code is testable without spawning processes
//! - the fit pipeline is shared by the CLI and the TUI

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
