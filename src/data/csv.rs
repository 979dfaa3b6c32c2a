//! CSV loading for classification datasets.
//!
//! Supported format:
//! - UTF-8, comma-separated
//! - Optional header row (auto-detected: first row is a header if it contains
//!   any non-numeric, non-empty cell)
//! - Double-quoted fields with embedded commas are handled correctly
//! - The last column is an integer class index (0-based); the remaining
//!   columns are features.

use std::path::Path;

use crate::data::dataset::{ClassificationDataset, LabeledSample};
use crate::error::{Result, TrainError};

/// Reads and parses a CSV file into a dataset with `n_classes` classes.
pub fn load_csv(path: &Path, n_classes: usize) -> Result<ClassificationDataset> {
    let data = std::fs::read(path).map_err(|e| TrainError::io(path, e))?;
    parse_csv(&data, n_classes)
        .map_err(|e| TrainError::dataset(format!("{}: {}", path.display(), dataset_message(e))))
}

fn dataset_message(err: TrainError) -> String {
    match err {
        TrainError::Dataset(msg) => msg,
        other => other.to_string(),
    }
}

/// Parses CSV bytes into labelled samples.
pub fn parse_csv(data: &[u8], n_classes: usize) -> Result<ClassificationDataset> {
    let text = std::str::from_utf8(data)
        .map_err(|_| TrainError::dataset("CSV file is not valid UTF-8"))?;

    let mut lines = text.lines().peekable();

    if let Some(first) = lines.peek() {
        if is_header(first) {
            lines.next();
        }
    }

    let mut samples = Vec::new();

    for (row_idx, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cells = parse_csv_row(line);
        let Some((label_cell, feature_cells)) = cells.split_last() else {
            continue;
        };
        if feature_cells.is_empty() {
            return Err(TrainError::dataset(format!(
                "Row {}: expected at least 2 columns (features + class index), got {}",
                row_idx + 1,
                cells.len()
            )));
        }

        let features = parse_floats(feature_cells, row_idx + 1)?;
        let label: usize = label_cell.trim().parse().map_err(|_| {
            TrainError::dataset(format!(
                "Row {}: class index '{}' is not a non-negative integer",
                row_idx + 1,
                label_cell
            ))
        })?;

        samples.push(LabeledSample { features, label });
    }

    if samples.is_empty() {
        return Err(TrainError::dataset("CSV contains no data rows after parsing"));
    }

    // Width and label range are checked by the dataset itself.
    ClassificationDataset::new(samples, n_classes)
}

/// Returns `true` if the row looks like a header (any cell non-numeric).
fn is_header(line: &str) -> bool {
    parse_csv_row(line).iter().any(|c| {
        let t = c.trim();
        !t.is_empty() && t.parse::<f64>().is_err()
    })
}

/// Parses a single CSV row, handling double-quoted fields.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                // Escaped quote inside a quoted field.
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn parse_floats(cells: &[String], row_num: usize) -> Result<Vec<f64>> {
    cells.iter()
        .map(|c| {
            c.trim().parse::<f64>().map_err(|_| {
                TrainError::dataset(format!("Row {}: '{}' is not a valid number", row_num, c))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Dataset;

    #[test]
    fn test_header_and_quotes() {
        let csv = b"x,\"y, scaled\",label\n0.5,\"1.5\",1\n-1,2,0\n";
        let ds = parse_csv(csv, 2).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.sample(0), LabeledSample { features: vec![0.5, 1.5], label: 1 });
    }

    #[test]
    fn test_bad_label() {
        let err = parse_csv(b"1.0,2.0,1\n1.0,2.0,x\n", 2).unwrap_err();
        assert!(err.to_string().contains("class index 'x'"));
    }

    #[test]
    fn test_label_out_of_range() {
        assert!(parse_csv(b"1.0,5\n", 2).is_err());
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_csv(b"a,b\n\n", 2).is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_csv(Path::new("/definitely/not/here.csv"), 2).unwrap_err();
        assert!(matches!(err, TrainError::Io { .. }));
    }
}
