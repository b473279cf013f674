//! Delimited-text ingest.
//!
//! Measurement files are small column tables (e.g. `omega in rad/s;G' in Pa;
//! G'' in Pa`). We read them into numeric columns:
//! - headers are matched case-insensitively after trimming (and BOM removal)
//! - blank or unparseable cells become NaN, which the fit later drops
//! - short rows are padded with NaN rather than rejected

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::{debug, warn};

use crate::error::AppError;

/// Numeric columns keyed by header.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    columns: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Column by header name; missing columns are a usage error (exit code 2).
    pub fn column(&self, name: &str) -> Result<&[f64], AppError> {
        self.index
            .get(&normalize_header_name(name))
            .map(|&i| self.columns[i].as_slice())
            .ok_or_else(|| {
                AppError::new(
                    2,
                    format!(
                        "Column '{name}' not found (available: {})",
                        self.headers.join(", ")
                    ),
                )
            })
    }
}

/// Read a delimited file with a header row.
pub fn read_table(path: &Path, delimiter: u8) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", path.display())))?;
    let table = parse_table(file, delimiter)?;
    debug!(
        "read {} rows x {} columns from {}",
        table.n_rows(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Parse delimited text with a header row from any reader.
pub fn parse_table<R: Read>(reader: R, delimiter: u8) -> Result<Table, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read headers: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.is_empty() {
        return Err(AppError::new(2, "Input has no header row."));
    }

    let mut columns = vec![Vec::new(); headers.len()];
    let mut skipped = 0usize;
    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // +2: header line plus 1-based numbering.
                warn!("line {}: {e}; row skipped", idx + 2);
                skipped += 1;
                continue;
            }
        };
        push_row(&mut columns, &record);
    }
    if skipped > 0 {
        warn!("{skipped} malformed rows skipped");
    }

    let index = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (normalize_header_name(h), i))
        .collect();
    Ok(Table {
        headers,
        columns,
        index,
    })
}

fn push_row(columns: &mut [Vec<f64>], record: &StringRecord) {
    for (i, col) in columns.iter_mut().enumerate() {
        col.push(record.get(i).map_or(f64::NAN, parse_cell));
    }
}

fn parse_cell(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() {
        return f64::NAN;
    }
    cell.parse().unwrap_or(f64::NAN)
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}omega in rad/s;G' in Pa;G'' in Pa\n\
                          0.1;0.5;4.9\n\
                          1.0; ;10.0\n\
                          10.0;abc;2.5\n\
                          100.0;12.0\n";

    #[test]
    fn parses_semicolon_table_with_blanks() {
        let t = parse_table(SAMPLE.as_bytes(), b';').unwrap();
        assert_eq!(t.headers, vec!["omega in rad/s", "G' in Pa", "G'' in Pa"]);
        assert_eq!(t.n_rows(), 4);

        let omega = t.column("omega in rad/s").unwrap();
        assert_eq!(omega, &[0.1, 1.0, 10.0, 100.0]);

        let gs = t.column("g' in pa").unwrap();
        assert_eq!(gs[0], 0.5);
        assert!(gs[1].is_nan());
        assert!(gs[2].is_nan());
        assert_eq!(gs[3], 12.0);

        let gl = t.column("G'' in Pa").unwrap();
        assert!(gl[3].is_nan());
    }

    #[test]
    fn missing_column_is_usage_error() {
        let t = parse_table(SAMPLE.as_bytes(), b';').unwrap();
        let err = t.column("tau").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("omega in rad/s"));
    }
}
