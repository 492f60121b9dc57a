//! Stage configuration resolved for one pipeline run.
//!
//! Every run writes below `<storage.root>/<artifact_bucket>/<run_id>/`.

use crate::config::{AppConfig, TrainingConfig};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

const DATA_INGESTION_DIR: &str = "data_ingestion";
const FEATURE_STORE_DIR: &str = "feature_store";
const INGESTED_DIR: &str = "ingested";
const FEATURE_STORE_FILE: &str = "customer_segmentation.csv";
const TRAIN_FILE: &str = "train.csv";
const TEST_FILE: &str = "test.csv";
const DATA_VALIDATION_DIR: &str = "data_validation";
const DRIFT_REPORT_DIR: &str = "drift_report";
const MODEL_TRAINER_DIR: &str = "model_trainer";
const TRAINED_MODEL_DIR: &str = "trained_model";

/// Identity and location of one run.
#[derive(Debug, Clone)]
pub struct TrainingPipelineConfig {
    pub timestamp: String,
    /// `<timestamp>_<suffix>`; unique even for runs started together.
    pub run_id: String,
    /// Bucket holding run artifacts.
    pub artifact_bucket: String,
    /// `<storage.root>/<artifact_bucket>/<run_id>`.
    pub artifact_dir: PathBuf,
}

impl TrainingPipelineConfig {
    pub fn new(app: &AppConfig, at: DateTime<Utc>) -> Self {
        let timestamp = at.format("%Y%m%d_%H%M%S_%6f").to_string();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let run_id = format!("{timestamp}_{}", &suffix[..8]);
        let artifact_dir = app.artifact_root().join(&run_id);
        Self {
            timestamp,
            run_id,
            artifact_bucket: app.storage.artifact_bucket.clone(),
            artifact_dir,
        }
    }

    /// Object key (relative to the artifact bucket) for a run-local file.
    pub fn key(&self, parts: &[&str]) -> String {
        let mut key = self.run_id.clone();
        for p in parts {
            key.push('/');
            key.push_str(p);
        }
        key
    }
}

#[derive(Debug, Clone)]
pub struct DataIngestionConfig {
    pub database: String,
    pub collection: String,
    pub artifact_bucket: String,
    pub feature_store_key: String,
    pub train_key: String,
    pub test_key: String,
    pub train_test_split_ratio: f64,
    pub seed: u64,
    pub schema_file: PathBuf,
}

impl DataIngestionConfig {
    pub fn new(app: &AppConfig, run: &TrainingPipelineConfig) -> Self {
        Self {
            database: app.ingestion.database.clone(),
            collection: app.ingestion.collection.clone(),
            artifact_bucket: run.artifact_bucket.clone(),
            feature_store_key: run.key(&[DATA_INGESTION_DIR, FEATURE_STORE_DIR, FEATURE_STORE_FILE]),
            train_key: run.key(&[DATA_INGESTION_DIR, INGESTED_DIR, TRAIN_FILE]),
            test_key: run.key(&[DATA_INGESTION_DIR, INGESTED_DIR, TEST_FILE]),
            train_test_split_ratio: app.pipeline.train_test_split_ratio,
            seed: app.pipeline.seed,
            schema_file: app.pipeline.schema_file.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataValidationConfig {
    pub schema_file: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub stattest_threshold: f64,
    pub drift_share: f64,
}

impl DataValidationConfig {
    pub fn new(app: &AppConfig, run: &TrainingPipelineConfig) -> Self {
        Self {
            schema_file: app.pipeline.schema_file.clone(),
            drift_report_file_path: run
                .artifact_dir
                .join(DATA_VALIDATION_DIR)
                .join(DRIFT_REPORT_DIR)
                .join(&app.validation.drift_report_file),
            stattest_threshold: app.validation.stattest_threshold,
            drift_share: app.validation.drift_share,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelTrainerConfig {
    pub trained_model_file_path: PathBuf,
    pub training: TrainingConfig,
    pub seed: u64,
}

impl ModelTrainerConfig {
    pub fn new(app: &AppConfig, run: &TrainingPipelineConfig) -> Self {
        Self {
            trained_model_file_path: run
                .artifact_dir
                .join(MODEL_TRAINER_DIR)
                .join(TRAINED_MODEL_DIR)
                .join(&app.model.file_name),
            training: app.training.clone(),
            seed: app.pipeline.seed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelPusherConfig {
    /// Canonical serving path.
    pub model_path: PathBuf,
}

impl ModelPusherConfig {
    pub fn new(app: &AppConfig) -> Self {
        Self {
            model_path: app.canonical_model_path(),
        }
    }
}
