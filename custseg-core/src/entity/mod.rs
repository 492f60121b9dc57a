//! Per-run stage configuration and the artifacts stages hand to each other.

pub mod artifact;
pub mod stage_config;

pub use artifact::{
    ClusterMetric, DataIngestionArtifact, DataValidationArtifact, ModelPusherArtifact,
    ModelTrainerArtifact,
};
pub use stage_config::{
    DataIngestionConfig, DataValidationConfig, ModelPusherConfig, ModelTrainerConfig,
    TrainingPipelineConfig,
};
