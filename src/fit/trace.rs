//! Per-iteration diagnostics.
//!
//! The solver never prints. It hands an `IterationReport` to an optional
//! `Reporter`; `TableReporter` collects them and renders a table at the end.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets};

use crate::math::SolveStrategy;

/// What happened in one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// `||r||` at the current parameters.
    pub residual_norm: f64,
    /// `||r||` at the trial parameters (NaN when the step converged, since it is
    /// accepted without re-evaluation).
    pub trial_norm: f64,
    /// Damping used to build this iteration's system.
    pub damping: f64,
    /// Damping carried into the next iteration.
    pub next_damping: f64,
    pub step_norm: f64,
    pub accepted: bool,
    pub converged: bool,
    pub strategy: SolveStrategy,
}

pub(crate) fn emit_line(line: &str) {
    if log::log_enabled!(log::Level::Info) {
        log::info!("{line}");
    } else {
        println!("{line}");
    }
}

pub trait Reporter {
    fn on_iteration(&mut self, report: &IterationReport);
    fn on_finish(&mut self) {}
}

/// Keeps every report in memory; handy for tests and for the TUI.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub reports: Vec<IterationReport>,
}

impl Reporter for RecordingReporter {
    fn on_iteration(&mut self, report: &IterationReport) {
        self.reports.push(report.clone());
    }
}

pub struct TableReporter {
    rows: Vec<IterationReport>,
}

impl TableReporter {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Render collected rows without emitting them.
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("iter").set_alignment(CellAlignment::Right),
            Cell::new("||r||").set_alignment(CellAlignment::Right),
            Cell::new("trial").set_alignment(CellAlignment::Right),
            Cell::new("lambda").set_alignment(CellAlignment::Right),
            Cell::new("step").set_alignment(CellAlignment::Right),
            Cell::new("solve"),
            Cell::new("accepted"),
        ]);
        for row in &self.rows {
            let trial = if row.trial_norm.is_nan() {
                "-".to_string()
            } else {
                format!("{:.4e}", row.trial_norm)
            };
            let accepted = match (row.converged, row.accepted) {
                (true, _) => "converged",
                (false, true) => "yes",
                (false, false) => "no",
            };
            table.add_row(vec![
                Cell::new(row.iteration).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.4e}", row.residual_norm)).set_alignment(CellAlignment::Right),
                Cell::new(trial).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1e}", row.damping)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1e}", row.step_norm)).set_alignment(CellAlignment::Right),
                Cell::new(match row.strategy {
                    SolveStrategy::Direct => "lu",
                    SolveStrategy::PseudoInverse => "pinv",
                }),
                Cell::new(accepted),
            ]);
        }
        table.to_string()
    }
}

impl Default for TableReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for TableReporter {
    fn on_iteration(&mut self, report: &IterationReport) {
        self.rows.push(report.clone());
    }

    fn on_finish(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        if !log::log_enabled!(log::Level::Info) {
            println!();
        }
        for line in self.render().lines() {
            emit_line(line);
        }
        self.rows.clear();
    }
}
