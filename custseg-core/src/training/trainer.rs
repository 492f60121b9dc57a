//! Model training stage, gated on the validation outcome.

use crate::data::Table;
use crate::entity::{ClusterMetric, DataValidationArtifact, ModelTrainerArtifact, ModelTrainerConfig};
use crate::error::{IoResultExt, Result, SegmentError, Stage};
use crate::model::CustomerSegmentationModel;
use crate::persistence;
use tracing::{info, warn};

pub struct ModelTrainer {
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }

    /// Fit on the train split, score on the test split.
    pub fn train(&self, train: &Table, test: &Table) -> Result<(CustomerSegmentationModel, ClusterMetric)> {
        let model = CustomerSegmentationModel::fit(train, &self.config.training, self.config.seed)?;
        // Score in training column order.
        let eval = if test.is_empty() {
            train.clone()
        } else {
            test.select(&train.columns)
        };
        let metric = ClusterMetric {
            inertia: model.inertia(&eval)?,
            silhouette: model.silhouette(&eval)?,
        };
        Ok((model, metric))
    }

    pub fn initiate_model_trainer(
        &self,
        validation: &DataValidationArtifact,
    ) -> Result<ModelTrainerArtifact> {
        info!("Starting model training");
        if !validation.validation_status {
            return Err(SegmentError::rejected(
                Stage::Training,
                format!(
                    "data validation failed (schema_train_ok={}, schema_test_ok={}, drift_detected={}); see {}",
                    validation.schema_train_ok,
                    validation.schema_test_ok,
                    validation.drift_detected,
                    validation.drift_report_file_path.display()
                ),
            ));
        }

        let train = Table::read_csv(&validation.valid_train_file_path)?;
        let test = Table::read_csv(&validation.valid_test_file_path)?;
        let (model, metric) = self.train(&train, &test)?;
        info!(
            inertia = metric.inertia,
            silhouette = metric.silhouette,
            clusters = model.n_clusters(),
            "Model fitted"
        );

        let expected = self.config.training.expected_score;
        if metric.silhouette < expected {
            warn!(silhouette = metric.silhouette, expected, "Model below expected score");
            return Err(SegmentError::rejected(
                Stage::Training,
                format!(
                    "silhouette {:.4} is below expected score {expected}",
                    metric.silhouette
                ),
            ));
        }

        let path = &self.config.trained_model_file_path;
        persistence::atomic_write_json(path, &model)
            .stage_context(Stage::Training, || format!("writing trained model {}", path.display()))?;

        let artifact = ModelTrainerArtifact {
            trained_model_file_path: path.clone(),
            metric,
        };
        info!(?artifact, "Model training completed");
        Ok(artifact)
    }
}
