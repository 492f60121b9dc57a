//! Drift detection seam and the default two-sample Kolmogorov–Smirnov detector.
//!
//! A detector turns `(reference, current)` into a structured report. The
//! validator only relies on the report containing a `DatasetDriftMetric`
//! entry:
//!
//! ```json
//! {"metrics": [{"metric": "DatasetDriftMetric", "result": {"dataset_drift": false, ...}}]}
//! ```

use crate::data::Table;
use crate::error::{Result, SegmentError, Stage};
use serde_json::{Map, Value, json};

/// Name of the report entry carrying the dataset-level flag.
pub const DATASET_DRIFT_METRIC: &str = "DatasetDriftMetric";
/// Name of the report entry carrying per-column results.
pub const DATA_DRIFT_TABLE: &str = "DataDriftTable";

/// Two-sample drift test producing a structured report.
pub trait DriftDetector: Send + Sync {
    fn run(&self, reference: &Table, current: &Table) -> Result<Value>;
}

/// Extract `dataset_drift` from the `DatasetDriftMetric` entry of a report.
pub fn dataset_drift_flag(report: &Value) -> Result<bool> {
    let metrics = report
        .get("metrics")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SegmentError::report_format(Stage::Validation, "drift report has no 'metrics' list")
        })?;
    let entry = metrics
        .iter()
        .find(|m| m.get("metric").and_then(Value::as_str) == Some(DATASET_DRIFT_METRIC))
        .ok_or_else(|| {
            SegmentError::report_format(
                Stage::Validation,
                format!("drift report has no '{DATASET_DRIFT_METRIC}' entry"),
            )
        })?;
    entry
        .get("result")
        .and_then(|r| r.get("dataset_drift"))
        .and_then(Value::as_bool)
        .ok_or_else(|| {
            SegmentError::report_format(
                Stage::Validation,
                format!("'{DATASET_DRIFT_METRIC}' entry has no boolean 'result.dataset_drift'"),
            )
        })
}

/// Per-column KS test; the dataset drifts once `drift_share` of the columns do.
#[derive(Debug, Clone)]
pub struct KsDriftDetector {
    /// p-value below which a column is flagged.
    pub stattest_threshold: f64,
    pub drift_share: f64,
}

impl Default for KsDriftDetector {
    fn default() -> Self {
        Self {
            stattest_threshold: 0.05,
            drift_share: 0.5,
        }
    }
}

/// Result of one column's test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample KS statistic and asymptotic p-value. `None` if either side is empty.
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Option<KsOutcome> {
    let mut a: Vec<f64> = a.iter().copied().filter(|v| v.is_finite()).collect();
    let mut b: Vec<f64> = b.iter().copied().filter(|v| v.is_finite()).collect();
    if a.is_empty() || b.is_empty() {
        return None;
    }
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }

    let en = (n * m / (n + m)).sqrt();
    let p_value = kolmogorov_q((en + 0.12 + 0.11 / en) * d);
    Some(KsOutcome {
        statistic: d,
        p_value,
    })
}

/// Complementary Kolmogorov distribution `Q(λ) = 2 Σ (-1)^(j-1) exp(-2 j² λ²)`.
fn kolmogorov_q(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut prev = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= 1e-3 * prev || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        prev = term.abs();
    }
    // Series failed to converge; only happens for tiny λ.
    1.0
}

impl DriftDetector for KsDriftDetector {
    fn run(&self, reference: &Table, current: &Table) -> Result<Value> {
        let mut by_column = Map::new();
        let mut tested = 0usize;
        let mut drifted = 0usize;

        for (ref_idx, name) in reference.columns.iter().enumerate() {
            let Some(cur_idx) = current.column_index(name) else {
                continue;
            };
            let Some(outcome) = ks_two_sample(
                &reference.column_values(ref_idx),
                &current.column_values(cur_idx),
            ) else {
                continue;
            };
            let column_drift = outcome.p_value < self.stattest_threshold;
            tested += 1;
            if column_drift {
                drifted += 1;
            }
            by_column.insert(
                name.clone(),
                json!({
                    "column_name": name,
                    "stattest_name": "K-S p_value",
                    "stattest_threshold": self.stattest_threshold,
                    "statistic": outcome.statistic,
                    "drift_score": outcome.p_value,
                    "drift_detected": column_drift,
                }),
            );
        }

        let share = if tested == 0 {
            0.0
        } else {
            drifted as f64 / tested as f64
        };
        let dataset_drift = tested > 0 && share >= self.drift_share;

        Ok(json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "metrics": [
                {
                    "metric": DATASET_DRIFT_METRIC,
                    "result": {
                        "drift_share": self.drift_share,
                        "number_of_columns": tested,
                        "number_of_drifted_columns": drifted,
                        "share_of_drifted_columns": share,
                        "dataset_drift": dataset_drift,
                    }
                },
                {
                    "metric": DATA_DRIFT_TABLE,
                    "result": {
                        "number_of_columns": tested,
                        "number_of_drifted_columns": drifted,
                        "drift_by_columns": Value::Object(by_column),
                    }
                }
            ]
        }))
    }
}
