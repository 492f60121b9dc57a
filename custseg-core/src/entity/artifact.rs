use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of ingestion: the exported feature store and its train/test split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub feature_store_file_path: PathBuf,
    pub trained_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

/// Output of validation, consumed by the training gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    pub schema_train_ok: bool,
    pub schema_test_ok: bool,
    pub drift_detected: bool,
    pub validation_status: bool,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
}

/// Fit quality of a clustering model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetric {
    /// Sum of squared distances to the nearest centroid (scaled space).
    pub inertia: f64,
    /// Mean silhouette coefficient on the evaluation split, in [-1, 1].
    pub silhouette: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub trained_model_file_path: PathBuf,
    pub metric: ClusterMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPusherArtifact {
    pub model_path: PathBuf,
}
