//! Model store bound to one canonical path.

use crate::data::Table;
use crate::error::{Result, SegmentError, Stage};
use crate::model::CustomerSegmentationModel;
use crate::persistence;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads, saves and serves the model at `model_path`.
///
/// The loaded model is cached for the lifetime of the estimator; build a new
/// estimator to pick up a model replaced on disk.
#[derive(Debug)]
pub struct CustomerClusterEstimator {
    model_path: PathBuf,
    loaded_model: Option<CustomerSegmentationModel>,
}

impl CustomerClusterEstimator {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            loaded_model: None,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn is_model_present(&self) -> bool {
        self.model_path.is_file()
    }

    pub fn load_model(&mut self) -> Result<&CustomerSegmentationModel> {
        if self.loaded_model.is_none() {
            let model = persistence::load_json::<CustomerSegmentationModel>(&self.model_path)
                .map_err(|e| {
                    let context = format!("loading model {}", self.model_path.display());
                    if e.kind() == std::io::ErrorKind::InvalidData {
                        SegmentError::serialization(Stage::Prediction, context, e)
                    } else {
                        SegmentError::io(Stage::Prediction, context, e)
                    }
                })?
                .ok_or_else(|| {
                    SegmentError::not_found(
                        Stage::Prediction,
                        self.model_path.display().to_string(),
                    )
                })?;
            info!(path = %self.model_path.display(), clusters = model.n_clusters(), "Model loaded");
            self.loaded_model = Some(model);
        }
        self.loaded_model.as_ref().ok_or_else(|| {
            SegmentError::not_found(Stage::Prediction, self.model_path.display().to_string())
        })
    }

    /// Install the model file at `from` as the canonical model.
    ///
    /// The canonical file is replaced by rename only, so a failure leaves the
    /// previous model in place. With `remove` the source is deleted afterwards.
    pub fn save_model(&mut self, from: &Path, remove: bool) -> Result<()> {
        if !from.is_file() {
            return Err(SegmentError::not_found(
                Stage::Pusher,
                from.display().to_string(),
            ));
        }
        let bytes = persistence::atomic_copy(from, &self.model_path).map_err(|e| {
            SegmentError::io(
                Stage::Pusher,
                format!(
                    "copying model {} to {}",
                    from.display(),
                    self.model_path.display()
                ),
                e,
            )
        })?;
        if remove {
            std::fs::remove_file(from).map_err(|e| {
                SegmentError::io(
                    Stage::Pusher,
                    format!("removing model source {}", from.display()),
                    e,
                )
            })?;
        }
        self.loaded_model = None;
        info!(from = %from.display(), to = %self.model_path.display(), bytes, remove, "Model saved");
        Ok(())
    }

    pub fn predict(&mut self, table: &Table) -> Result<Vec<usize>> {
        let labels = self.load_model()?.predict(table)?;
        debug!(rows = labels.len(), "Predicted clusters");
        Ok(labels)
    }
}
