//! The serving model: column-mean imputation, standard scaling, k-means.

use crate::config::TrainingConfig;
use crate::data::Table;
use crate::error::{Result, SegmentError, Stage};
use crate::model::kmeans::{KMeans, KMeansParams, silhouette_score};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegmentationModel {
    /// Training column order; prediction input is matched by name.
    pub feature_names: Vec<String>,
    pub imputer_means: Vec<f64>,
    pub scaler_mean: Vec<f64>,
    pub scaler_scale: Vec<f64>,
    pub kmeans: KMeans,
    pub trained_at: chrono::DateTime<chrono::Utc>,
}

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

impl CustomerSegmentationModel {
    pub fn fit(table: &Table, training: &TrainingConfig, seed: u64) -> Result<Self> {
        let n = table.row_count();
        if n == 0 || table.column_count() == 0 {
            return Err(SegmentError::invalid_input(
                Stage::Training,
                "cannot fit a model on an empty table",
            ));
        }
        if training.n_clusters == 0 || training.n_clusters > n {
            return Err(SegmentError::invalid_input(
                Stage::Training,
                format!(
                    "n_clusters = {} needs between 1 and {n} rows",
                    training.n_clusters
                ),
            ));
        }

        let dims = table.column_count();
        let imputer_means: Vec<f64> = (0..dims)
            .map(|c| nan_mean(table.rows.iter().map(|r| r[c])))
            .collect();
        let imputed: Vec<Vec<f64>> = table
            .rows
            .iter()
            .map(|r| impute(r, &imputer_means))
            .collect();

        let scaler_mean: Vec<f64> = (0..dims)
            .map(|c| imputed.iter().map(|r| r[c]).sum::<f64>() / n as f64)
            .collect();
        let scaler_scale: Vec<f64> = (0..dims)
            .map(|c| {
                let var = imputed
                    .iter()
                    .map(|r| (r[c] - scaler_mean[c]).powi(2))
                    .sum::<f64>()
                    / n as f64;
                // Constant columns are left unscaled.
                if var > 0.0 { var.sqrt() } else { 1.0 }
            })
            .collect();

        let scaled: Vec<Vec<f64>> = imputed
            .iter()
            .map(|r| scale(r, &scaler_mean, &scaler_scale))
            .collect();
        let kmeans = KMeans::fit(
            &scaled,
            &KMeansParams {
                n_clusters: training.n_clusters,
                n_init: training.n_init,
                max_iter: training.max_iter,
                tol: training.tol,
                seed,
            },
        );

        Ok(Self {
            feature_names: table.columns.clone(),
            imputer_means,
            scaler_mean,
            scaler_scale,
            kmeans,
            trained_at: chrono::Utc::now(),
        })
    }

    pub fn n_clusters(&self) -> usize {
        self.kmeans.centroids.len()
    }

    /// Impute and scale `table` into model space.
    ///
    /// Input columns are matched to the training features by name.
    pub fn transform(&self, table: &Table) -> Result<Vec<Vec<f64>>> {
        let missing: Vec<&str> = self
            .feature_names
            .iter()
            .filter(|f| table.column_index(f).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(SegmentError::invalid_input(
                Stage::Prediction,
                format!(
                    "model expects {} features, input lacks: {}",
                    self.feature_names.len(),
                    missing.join(", ")
                ),
            ));
        }
        let table = table.select(&self.feature_names);
        Ok(table
            .rows
            .iter()
            .map(|r| {
                scale(
                    &impute(r, &self.imputer_means),
                    &self.scaler_mean,
                    &self.scaler_scale,
                )
            })
            .collect())
    }

    /// One cluster label per row, in input order.
    pub fn predict(&self, table: &Table) -> Result<Vec<usize>> {
        Ok(self.kmeans.predict(&self.transform(table)?))
    }

    pub fn inertia(&self, table: &Table) -> Result<f64> {
        Ok(self.kmeans.inertia_of(&self.transform(table)?))
    }

    pub fn silhouette(&self, table: &Table) -> Result<f64> {
        let points = self.transform(table)?;
        let labels = self.kmeans.predict(&points);
        Ok(silhouette_score(&points, &labels))
    }
}

fn impute(row: &[f64], means: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .map(|(v, m)| if v.is_finite() { *v } else { *m })
        .collect()
}

fn scale(row: &[f64], mean: &[f64], scale: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(mean.iter().zip(scale))
        .map(|(v, (m, s))| (v - m) / s)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Table {
        let mut rows = Vec::new();
        for i in 0..12 {
            let o = f64::from(i % 4);
            let row = match i / 4 {
                0 => vec![25.0 + o, 20_000.0 + 100.0 * o],
                1 => vec![45.0 + o, 60_000.0 + 100.0 * o],
                _ => vec![65.0 + o, 20_000.0 + 100.0 * o],
            };
            rows.push(row);
        }
        Table::from_rows(vec!["Age".into(), "Income".into()], rows).unwrap()
    }

    fn training(k: usize) -> TrainingConfig {
        TrainingConfig {
            n_clusters: k,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_fit_and_predict_groups_rows() {
        let table = segments();
        let model = CustomerSegmentationModel::fit(&table, &training(3), 42).unwrap();
        let labels = model.predict(&table).unwrap();
        assert_eq!(labels.len(), 12);
        for group in labels.chunks(4) {
            assert!(group.iter().all(|&l| l == group[0]));
        }
        assert!(model.silhouette(&table).unwrap() > 0.5);
    }

    #[test]
    fn test_missing_values_are_imputed() {
        let table = segments();
        let model = CustomerSegmentationModel::fit(&table, &training(3), 42).unwrap();
        let probe = Table::from_rows(
            vec!["Age".into(), "Income".into()],
            vec![vec![f64::NAN, f64::NAN]],
        )
        .unwrap();
        assert_eq!(model.predict(&probe).unwrap().len(), 1);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let model = CustomerSegmentationModel::fit(&segments(), &training(2), 1).unwrap();
        let probe = Table::from_rows(vec!["Age".into()], vec![vec![30.0]]).unwrap();
        let err = model.predict(&probe).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::InvalidInput {
                stage: Stage::Prediction,
                ..
            }
        ));
    }

    #[test]
    fn test_predict_matches_columns_by_name() {
        let model = CustomerSegmentationModel::fit(&segments(), &training(3), 42).unwrap();
        let ordered = Table::from_rows(
            vec!["Age".into(), "Income".into()],
            vec![vec![25.0, 20_000.0], vec![65.0, 20_000.0]],
        )
        .unwrap();
        let reordered = Table::from_rows(
            vec!["Income".into(), "Age".into()],
            vec![vec![20_000.0, 25.0], vec![20_000.0, 65.0]],
        )
        .unwrap();
        let labels = model.predict(&ordered).unwrap();
        assert_ne!(labels[0], labels[1]);
        assert_eq!(model.predict(&reordered).unwrap(), labels);
    }

    #[test]
    fn test_missing_feature_is_named() {
        let model = CustomerSegmentationModel::fit(&segments(), &training(2), 1).unwrap();
        let probe = Table::from_rows(
            vec!["Age".into(), "Wines".into()],
            vec![vec![30.0, 1.0]],
        )
        .unwrap();
        let err = model.predict(&probe).unwrap_err();
        assert!(err.to_string().contains("Income"));
    }

    #[test]
    fn test_fit_rejects_too_many_clusters() {
        let err = CustomerSegmentationModel::fit(&segments(), &training(13), 1).unwrap_err();
        assert!(matches!(err, SegmentError::InvalidInput { .. }));
        assert!(CustomerSegmentationModel::fit(&Table::default(), &training(1), 1).is_err());
    }

    #[test]
    fn test_serde_preserves_predictions() {
        let table = segments();
        let model = CustomerSegmentationModel::fit(&table, &training(3), 42).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: CustomerSegmentationModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.predict(&table).unwrap(), model.predict(&table).unwrap());
    }
}
