//! # Custseg Core
//!
//! Customer segmentation as an artifact pipeline: documents are ingested
//! into a local object store, validated against a declared schema and for
//! drift, clustered, and promoted to a canonical model file that the HTTP
//! gateway predicts from.

pub mod config;
pub mod data;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod storage;
pub mod training;
pub mod validation;

// Re-export commonly used types at the crate root.
pub use config::{AppConfig, load_config};
pub use data::{DocumentStore, JsonlDocumentStore, SchemaDefinition, Table};
pub use entity::{
    ClusterMetric, DataIngestionArtifact, DataValidationArtifact, ModelPusherArtifact,
    ModelTrainerArtifact,
};
pub use error::{Result, SegmentError, Stage};
pub use model::{CustomerClusterEstimator, CustomerSegmentationModel};
pub use pipeline::{CustomerData, PredictionPipeline, TrainPipeline};
pub use storage::ObjectStorage;
pub use validation::{DataValidation, DriftDetector, KsDriftDetector};
