//! Data validation: schema conformance and distributional drift.
//!
//! Runs once per pipeline run, between ingestion and training. The outcome
//! is a [`DataValidationArtifact`] whose `validation_status` gates training.

pub mod drift;

pub use drift::{DriftDetector, KsDriftDetector, dataset_drift_flag};

use crate::data::{SchemaDefinition, Table};
use crate::entity::{DataIngestionArtifact, DataValidationArtifact, DataValidationConfig};
use crate::error::{Result, SegmentError, Stage};
use crate::persistence;
use tracing::{info, warn};

pub struct DataValidation {
    ingestion_artifact: DataIngestionArtifact,
    config: DataValidationConfig,
    schema: SchemaDefinition,
    detector: Box<dyn DriftDetector>,
}

impl DataValidation {
    /// Load the schema definition and set up the default KS detector.
    pub fn new(
        ingestion_artifact: DataIngestionArtifact,
        config: DataValidationConfig,
    ) -> Result<Self> {
        let schema = SchemaDefinition::load(&config.schema_file)?;
        Ok(Self::with_schema(ingestion_artifact, config, schema))
    }

    pub fn with_schema(
        ingestion_artifact: DataIngestionArtifact,
        config: DataValidationConfig,
        schema: SchemaDefinition,
    ) -> Self {
        let detector = KsDriftDetector {
            stattest_threshold: config.stattest_threshold,
            drift_share: config.drift_share,
        };
        Self {
            ingestion_artifact,
            config,
            schema,
            detector: Box::new(detector),
        }
    }

    /// Replace the drift detector.
    pub fn with_detector(mut self, detector: Box<dyn DriftDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    /// True when the table has exactly as many columns as the schema declares.
    /// Names and order are not compared.
    pub fn validate_schema_columns(&self, table: &Table) -> bool {
        let ok = table.column_count() == self.schema.len();
        if !ok {
            warn!(
                expected = self.schema.len(),
                actual = table.column_count(),
                "Column count does not match schema"
            );
        }
        ok
    }

    /// Check both splits independently.
    pub fn validate_dataset_schema_columns(&self, train: &Table, test: &Table) -> (bool, bool) {
        (
            self.validate_schema_columns(train),
            self.validate_schema_columns(test),
        )
    }

    /// Run the detector, persist its report as YAML, then read the dataset flag.
    ///
    /// The report is written before the flag is extracted, so a malformed
    /// report is still on disk when this returns `ReportFormat`.
    pub fn detect_dataset_drift(&self, reference: &Table, current: &Table) -> Result<bool> {
        let report = self.detector.run(reference, current)?;

        let path = &self.config.drift_report_file_path;
        let yaml = serde_yaml::to_string(&report).map_err(|e| {
            SegmentError::serialization(Stage::Validation, "encoding drift report as YAML", e)
        })?;
        persistence::atomic_write(path, yaml.as_bytes()).map_err(|e| {
            SegmentError::io(
                Stage::Validation,
                format!("writing drift report {}", path.display()),
                e,
            )
        })?;
        info!(report = %path.display(), "Drift report written");

        let drift = dataset_drift_flag(&report)?;
        if drift {
            warn!("Dataset drift detected");
        }
        Ok(drift)
    }

    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        info!("Starting data validation");
        let train = Table::read_csv(&self.ingestion_artifact.trained_file_path)?;
        let test = Table::read_csv(&self.ingestion_artifact.test_file_path)?;

        let (schema_train_ok, schema_test_ok) = self.validate_dataset_schema_columns(&train, &test);
        let drift_detected = self.detect_dataset_drift(&train, &test)?;
        let validation_status = schema_train_ok && schema_test_ok && !drift_detected;

        let artifact = DataValidationArtifact {
            schema_train_ok,
            schema_test_ok,
            drift_detected,
            validation_status,
            valid_train_file_path: self.ingestion_artifact.trained_file_path.clone(),
            valid_test_file_path: self.ingestion_artifact.test_file_path.clone(),
            drift_report_file_path: self.config.drift_report_file_path.clone(),
        };
        info!(?artifact, "Data validation completed");
        Ok(artifact)
    }
}
