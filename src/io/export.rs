//! Export per-sample results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::SampleResidual;
use crate::error::AppError;

/// Write per-sample results to a CSV file.
///
/// `clean` holds the noise-free values when the data is synthetic; the column is
/// left empty otherwise.
pub fn write_results_csv(
    path: &Path,
    residuals: &[SampleResidual],
    clean: Option<&[f64]>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(file, residuals, clean)
}

pub fn write_results<W: Write>(
    mut out: W,
    residuals: &[SampleResidual],
    clean: Option<&[f64]>,
) -> Result<(), AppError> {
    writeln!(out, "t,y_obs,y_true,y_fit,residual")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (i, r) in residuals.iter().enumerate() {
        let y_true = clean
            .and_then(|c| c.get(i))
            .map(|v| format!("{v:.10}"))
            .unwrap_or_default();
        writeln!(
            out,
            "{:.10},{:.10},{},{:.10},{:.10}",
            r.t, r.y_obs, y_true, r.y_fit, r.residual
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
