//! In-memory numeric table and its CSV encoding.

use crate::error::{Result, SegmentError, Stage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Token written for missing values; also accepted when reading.
pub const NA: &str = "na";

/// Tabular customer data: ordered column names and `f64` rows.
///
/// Missing values are stored as `NaN`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Parse a single cell, mapping anything non-numeric to `NaN`.
pub fn parse_cell(raw: &str) -> f64 {
    let s = raw.trim().trim_matches('"').trim();
    if s.is_empty() || s.eq_ignore_ascii_case(NA) || s.eq_ignore_ascii_case("null") {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Convert a JSON document field into a cell value.
pub fn json_cell(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(serde_json::Value::String(s)) => parse_cell(s),
        Some(serde_json::Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

impl Table {
    /// Build a table, checking that every row matches the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(SegmentError::invalid_input(
                Stage::Storage,
                format!(
                    "row {idx} has {} values but the header has {} columns",
                    row.len(),
                    columns.len()
                ),
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of the column at `idx`, in row order.
    pub fn column_values(&self, idx: usize) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.get(idx).copied().unwrap_or(f64::NAN))
            .collect()
    }

    /// Project onto `columns` in the given order; absent columns become `NaN`.
    pub fn select(&self, columns: &[String]) -> Table {
        let indices: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|i| i.and_then(|i| row.get(i).copied()).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        Table {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Shuffle rows with a seeded RNG and split off `test_ratio` of them.
    ///
    /// Returns `(train, test)`. The test split gets `round(n * test_ratio)`
    /// rows, at least one when the table has two or more rows.
    pub fn train_test_split(&self, test_ratio: f64, seed: u64) -> (Table, Table) {
        let n = self.rows.len();
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let mut n_test = (n as f64 * test_ratio).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }

        let pick = |ids: &[usize]| Table {
            columns: self.columns.clone(),
            rows: ids.iter().map(|&i| self.rows[i].clone()).collect(),
        };
        let (test_ids, train_ids) = order.split_at(n_test);
        (pick(train_ids), pick(test_ids))
    }

    /// Parse comma-separated text with a header line.
    pub fn parse_csv(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| {
            SegmentError::invalid_input(Stage::Storage, "CSV object is empty (no header)")
        })?;
        let columns: Vec<String> = header
            .split(',')
            .map(|s| s.trim().trim_matches('"').to_string())
            .collect();

        let mut rows = Vec::new();
        for (line_no, line) in lines.enumerate() {
            let row: Vec<f64> = line.split(',').map(parse_cell).collect();
            if row.len() != columns.len() {
                return Err(SegmentError::invalid_input(
                    Stage::Storage,
                    format!(
                        "CSV line {} has {} fields, expected {}",
                        line_no + 2,
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    /// Encode as CSV with a header line; `NaN` is written as `na`.
    pub fn to_csv(&self) -> String {
        let mut out = self.columns.join(",");
        out.push('\n');
        for row in &self.rows {
            for (i, v) in row.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if v.is_nan() {
                    out.push_str(NA);
                } else {
                    let _ = write!(out, "{v}");
                }
            }
            out.push('\n');
        }
        out
    }

    /// Read a CSV file from disk.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SegmentError::from_io(Stage::Storage, path, e))?;
        Self::parse_csv(&text)
    }

    /// Atomically write the table as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        crate::persistence::atomic_write(path, self.to_csv().as_bytes()).map_err(|e| {
            SegmentError::io(Stage::Storage, format!("writing {}", path.display()), e)
        })
    }
}
