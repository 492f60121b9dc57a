//! Promotes a trained model to the canonical serving path.

use crate::entity::{ModelPusherArtifact, ModelPusherConfig, ModelTrainerArtifact};
use crate::error::Result;
use crate::model::CustomerClusterEstimator;
use tracing::info;

pub struct ModelPusher {
    config: ModelPusherConfig,
    estimator: CustomerClusterEstimator,
}

impl ModelPusher {
    pub fn new(config: ModelPusherConfig) -> Self {
        let estimator = CustomerClusterEstimator::new(&config.model_path);
        Self { config, estimator }
    }

    /// Copy the trained model into place; the run artifact is kept.
    pub fn initiate_model_pusher(
        &mut self,
        trainer: &ModelTrainerArtifact,
    ) -> Result<ModelPusherArtifact> {
        info!(from = %trainer.trained_model_file_path.display(), "Pushing model to local model store");
        self.estimator
            .save_model(&trainer.trained_model_file_path, false)?;
        let artifact = ModelPusherArtifact {
            model_path: self.config.model_path.clone(),
        };
        info!(?artifact, "Model pushed");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ClusterMetric;
    use crate::error::SegmentError;
    use tempfile::TempDir;

    fn trainer_artifact(path: std::path::PathBuf) -> ModelTrainerArtifact {
        ModelTrainerArtifact {
            trained_model_file_path: path,
            metric: ClusterMetric {
                inertia: 1.0,
                silhouette: 0.5,
            },
        }
    }

    #[test]
    fn test_push_copies_into_canonical_path() {
        let dir = TempDir::new().unwrap();
        let trained = dir.path().join("run/model.json");
        std::fs::create_dir_all(trained.parent().unwrap()).unwrap();
        std::fs::write(&trained, b"{\"model\": 1}").unwrap();
        let canonical = dir.path().join("store/model.json");

        let mut pusher = ModelPusher::new(ModelPusherConfig {
            model_path: canonical.clone(),
        });
        let out = pusher.initiate_model_pusher(&trainer_artifact(trained.clone())).unwrap();
        assert_eq!(out.model_path, canonical);
        assert_eq!(std::fs::read(&canonical).unwrap(), b"{\"model\": 1}");
        assert!(trained.exists());
    }

    #[test]
    fn test_failed_push_keeps_previous_model() {
        let dir = TempDir::new().unwrap();
        let canonical = dir.path().join("model.json");
        std::fs::write(&canonical, b"previous").unwrap();
        let mut pusher = ModelPusher::new(ModelPusherConfig {
            model_path: canonical.clone(),
        });
        let err = pusher
            .initiate_model_pusher(&trainer_artifact(dir.path().join("nope.json")))
            .unwrap_err();
        assert!(matches!(err, SegmentError::NotFound { .. }));
        assert_eq!(std::fs::read(&canonical).unwrap(), b"previous");
    }
}
