//! CSV ingest for two-column `t,y` data files.
//!
//! Accepted layout:
//! - comma-separated, first column `t`, second column `y`, extra columns ignored
//! - no header required; a non-numeric row (e.g. a header) is recorded as a row
//!   error and skipped
//! - lines starting with `#` are comments
//!
//! Rows that fail to parse are reported back rather than aborting the load, so
//! the caller can show what happened.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::SampleSet;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: samples + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub samples: SampleSet,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a two-column CSV file.
pub fn load_samples(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open data file '{}': {e}", path.display()))
    })?;
    read_samples(file)
}

/// Parse two-column CSV from any reader.
pub fn read_samples<R: Read>(reader: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut t = Vec::new();
    let mut y = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for result in reader.records() {
        rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or(rows_read);
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows_read);

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        match parse_row(&record) {
            Ok((ti, yi)) => {
                t.push(ti);
                y.push(yi);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let rows_used = t.len();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows found in data file."));
    }

    let samples = SampleSet::new(t, y)?;
    Ok(IngestedData {
        samples,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn parse_row(record: &StringRecord) -> Result<(f64, f64), String> {
    if record.len() < 2 {
        return Err(format!("expected 2 columns, found {}", record.len()));
    }
    let t = parse_number(&record[0], "t")?;
    let y = parse_number(&record[1], "y")?;
    Ok((t, y))
}

fn parse_number(raw: &str, column: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("column {column}: '{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("column {column}: non-finite value '{raw}'"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_two_column_data() {
        let data = read_samples("0,2.5\n1,0.68\n2,0.19\n".as_bytes()).unwrap();
        assert_eq!(data.rows_used, 3);
        assert_eq!(data.samples.t(), &[0.0, 1.0, 2.0]);
        assert_eq!(data.samples.y(), &[2.5, 0.68, 0.19]);
        assert!(data.row_errors.is_empty());
    }

    #[test]
    fn skips_header_comments_and_bad_rows() {
        let csv = "t,y\n# measured\n 0.0 , 1.0 \n0.5,abc\n1.0\n\n1.5,2.0,extra\n";
        let data = read_samples(csv.as_bytes()).unwrap();
        assert_eq!(data.samples.t(), &[0.0, 1.5]);
        assert_eq!(data.samples.y(), &[1.0, 2.0]);
        assert_eq!(data.row_errors.len(), 3, "{:?}", data.row_errors);
        assert_eq!(data.row_errors[0].line, 1);
        assert!(data.row_errors[1].message.contains("'abc'"));
        assert!(data.row_errors[2].message.contains("expected 2 columns"));
    }

    #[test]
    fn empty_input_is_a_data_error() {
        let err = read_samples("t,y\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn non_finite_values_are_rejected_per_row() {
        let data = read_samples("0,inf\n1,NaN\n2,3\n".as_bytes()).unwrap();
        assert_eq!(data.rows_used, 1);
        assert_eq!(data.row_errors.len(), 2);
    }
}
