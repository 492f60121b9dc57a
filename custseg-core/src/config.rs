//! Configuration system for custseg.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! The resolved [`AppConfig`] is passed explicitly to every pipeline component;
//! nothing below this module reads the process environment.

use crate::error::{Result, SegmentError};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable carrying the document store connection string.
pub const CONNECTION_URL_ENV: &str = "MONGODB_URL_KEY";

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "custseg.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Local object storage layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory standing in for the object store; buckets are its children.
    pub root: PathBuf,
    /// Bucket holding the canonical serving model.
    pub model_bucket: String,
    /// Bucket holding per-run pipeline artifacts.
    pub artifact_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("local_storage"),
            model_bucket: "customer-segmentation-model".to_string(),
            artifact_bucket: "artifact".to_string(),
        }
    }
}

/// Settings shared by every stage of the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// YAML file declaring the expected columns.
    pub schema_file: PathBuf,
    /// Fraction of rows held out as the test split.
    pub train_test_split_ratio: f64,
    /// Seed for the split shuffle and k-means initialisation.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_file: PathBuf::from("config/schema.yaml"),
            train_test_split_ratio: 0.2,
            seed: 42,
        }
    }
}

/// Upstream document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Connection string; usually supplied through `MONGODB_URL_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_url: Option<String>,
    pub database: String,
    pub collection: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            connection_url: None,
            database: "ineuron".to_string(),
            collection: "customer_segmentation".to_string(),
        }
    }
}

/// Drift check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// File name of the drift report inside the run's validation directory.
    pub drift_report_file: String,
    /// Per-column p-value below which a column counts as drifted.
    pub stattest_threshold: f64,
    /// Share of drifted columns at which the dataset counts as drifted.
    pub drift_share: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            drift_report_file: "report.yaml".to_string(),
            stattest_threshold: 0.05,
            drift_share: 0.5,
        }
    }
}

/// K-means training settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub n_clusters: usize,
    /// Independent k-means++ restarts; the lowest-inertia fit wins.
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    /// Minimum silhouette score on the test split for a model to be accepted.
    pub expected_score: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            expected_score: 0.0,
        }
    }
}

/// Canonical model file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub file_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file_name: "model.json".to_string(),
        }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// The single location the serving path loads the model from.
    pub fn canonical_model_path(&self) -> PathBuf {
        self.storage
            .root
            .join(&self.storage.model_bucket)
            .join(&self.model.file_name)
    }

    /// Root directory of the artifact bucket.
    pub fn artifact_root(&self) -> PathBuf {
        self.storage.root.join(&self.storage.artifact_bucket)
    }

    /// Connection string for the document store, or a configuration error.
    pub fn require_connection_url(&self) -> Result<&str> {
        match self.ingestion.connection_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(SegmentError::config(format!(
                "document store connection string is not set (export {CONNECTION_URL_ENV})"
            ))),
        }
    }

    /// Check value ranges once at startup.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.pipeline.train_test_split_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(SegmentError::config(format!(
                "pipeline.train_test_split_ratio must be in (0, 1), got {ratio}"
            )));
        }
        if self.training.n_clusters == 0 {
            return Err(SegmentError::config("training.n_clusters must be at least 1"));
        }
        if self.training.n_init == 0 || self.training.max_iter == 0 {
            return Err(SegmentError::config(
                "training.n_init and training.max_iter must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.validation.drift_share) {
            return Err(SegmentError::config(format!(
                "validation.drift_share must be in [0, 1], got {}",
                self.validation.drift_share
            )));
        }
        if self.model.file_name.trim().is_empty() {
            return Err(SegmentError::config("model.file_name must not be empty"));
        }
        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables prefixed with `CUSTSEG_` (`CUSTSEG_TRAINING__N_CLUSTERS`)
/// 2. `MONGODB_URL_KEY` for `ingestion.connection_url`
/// 3. The config file (`config_file`, or `custseg.toml` when it exists)
/// 4. Built-in defaults
pub fn load_config(config_file: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(SegmentError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let local = Path::new(DEFAULT_CONFIG_FILE);
            if local.exists() {
                figment = figment.merge(Toml::file(local));
            }
        }
    }

    figment = figment
        .merge(
            Env::raw()
                .only(&[CONNECTION_URL_ENV])
                .map(|_| "ingestion.connection_url".into()),
        )
        .merge(Env::prefixed("CUSTSEG_").split("__"));

    let config: AppConfig = figment
        .extract()
        .map_err(|e| SegmentError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.storage.root, PathBuf::from("local_storage"));
        assert_eq!(config.training.n_clusters, 3);
        assert_eq!(config.validation.drift_share, 0.5);
        assert!(config.ingestion.connection_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_canonical_model_path() {
        let config = AppConfig::default();
        assert_eq!(
            config.canonical_model_path(),
            PathBuf::from("local_storage/customer-segmentation-model/model.json")
        );
    }

    #[test]
    fn test_require_connection_url_missing_is_config_error() {
        let config = AppConfig::default();
        let err = config.require_connection_url().unwrap_err();
        assert!(matches!(err, SegmentError::Config { .. }));
        assert!(err.to_string().contains(CONNECTION_URL_ENV));
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let mut config = AppConfig::default();
        config.pipeline.train_test_split_ratio = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("model_bucket"));
        assert!(!json.contains("connection_url"));

        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model.file_name, config.model.file_name);
        assert_eq!(back.training.n_init, config.training.n_init);
    }

    #[test]
    fn test_load_config_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custseg.toml",
                r#"
                [training]
                n_clusters = 4
                n_init = 2
                max_iter = 50
                tol = 0.001
                expected_score = 0.0

                [storage]
                root = "data"
                model_bucket = "models"
                artifact_bucket = "runs"
                "#,
            )?;
            jail.set_env("MONGODB_URL_KEY", "file:///srv/docs");
            jail.set_env("CUSTSEG_SERVER__PORT", "9001");

            let config = load_config(None).expect("config loads");
            assert_eq!(config.training.n_clusters, 4);
            assert_eq!(config.storage.root, PathBuf::from("data"));
            assert_eq!(config.server.port, 9001);
            assert_eq!(
                config.ingestion.connection_url.as_deref(),
                Some("file:///srv/docs")
            );
            Ok(())
        });
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, SegmentError::Config { .. }));
    }
}
