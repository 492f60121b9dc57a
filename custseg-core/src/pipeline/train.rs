use crate::config::AppConfig;
use crate::data::{DataIngestion, DocumentStore, connect};
use crate::entity::{
    DataIngestionArtifact, DataIngestionConfig, DataValidationArtifact, DataValidationConfig,
    ModelPusherArtifact, ModelPusherConfig, ModelTrainerArtifact, ModelTrainerConfig,
    TrainingPipelineConfig,
};
use crate::error::Result;
use crate::storage::ObjectStorage;
use crate::training::{ModelPusher, ModelTrainer};
use crate::validation::DataValidation;
use tracing::{error, info};

/// ingestion -> validation -> training -> push, one run per call.
pub struct TrainPipeline {
    config: AppConfig,
    store: Option<Box<dyn DocumentStore>>,
}

impl TrainPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Use `store` instead of connecting through `ingestion.connection_url`.
    pub fn with_document_store(mut self, store: Box<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn start_data_ingestion(&self, run: &TrainingPipelineConfig) -> Result<DataIngestionArtifact> {
        let connected;
        let store: &dyn DocumentStore = match &self.store {
            Some(store) => store.as_ref(),
            None => {
                connected = connect(self.config.require_connection_url()?)?;
                connected.as_ref()
            }
        };
        let storage = ObjectStorage::new(&self.config.storage.root);
        DataIngestion::new(DataIngestionConfig::new(&self.config, run), store, &storage)
            .initiate_data_ingestion()
    }

    fn start_data_validation(
        &self,
        run: &TrainingPipelineConfig,
        ingestion: DataIngestionArtifact,
    ) -> Result<DataValidationArtifact> {
        DataValidation::new(ingestion, DataValidationConfig::new(&self.config, run))?
            .initiate_data_validation()
    }

    fn start_model_trainer(
        &self,
        run: &TrainingPipelineConfig,
        validation: &DataValidationArtifact,
    ) -> Result<ModelTrainerArtifact> {
        ModelTrainer::new(ModelTrainerConfig::new(&self.config, run)).initiate_model_trainer(validation)
    }

    fn start_model_pusher(&self, trainer: &ModelTrainerArtifact) -> Result<ModelPusherArtifact> {
        ModelPusher::new(ModelPusherConfig::new(&self.config)).initiate_model_pusher(trainer)
    }

    pub fn run_pipeline(&self) -> Result<ModelPusherArtifact> {
        let run = TrainingPipelineConfig::new(&self.config, chrono::Utc::now());
        info!(run = %run.run_id, artifact_dir = %run.artifact_dir.display(), "Training pipeline started");

        let outcome = self
            .start_data_ingestion(&run)
            .and_then(|ingestion| self.start_data_validation(&run, ingestion))
            .and_then(|validation| self.start_model_trainer(&run, &validation))
            .and_then(|trainer| self.start_model_pusher(&trainer));

        match &outcome {
            Ok(artifact) => info!(run = %run.run_id, model = %artifact.model_path.display(), "Training pipeline finished"),
            Err(e) => error!(run = %run.run_id, stage = %e.stage(), error = %e, "Training pipeline failed"),
        }
        outcome
    }
}
