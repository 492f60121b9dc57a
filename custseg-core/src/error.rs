//! Error types for the custseg core.
//!
//! Uses `thiserror` for a single closed error enum shared by every pipeline
//! stage. Each variant records the [`Stage`] it originated in, and the I/O
//! and serialization variants keep the underlying cause as their `source`.

use std::fmt;

/// Where in the pipeline an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Storage,
    Ingestion,
    Validation,
    Training,
    Pusher,
    Prediction,
    Gateway,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Storage => "storage",
            Stage::Ingestion => "ingestion",
            Stage::Validation => "validation",
            Stage::Training => "training",
            Stage::Pusher => "pusher",
            Stage::Prediction => "prediction",
            Stage::Gateway => "gateway",
        };
        f.write_str(name)
    }
}

/// Top-level error type for the custseg core library.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("[{stage}] not found: {target}")]
    NotFound { stage: Stage, target: String },

    #[error("[{stage}] schema mismatch: {message}")]
    SchemaMismatch { stage: Stage, message: String },

    #[error("[{stage}] report format error: {message}")]
    ReportFormat { stage: Stage, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("[{stage}] I/O failure while {context}: {source}")]
    Io {
        stage: Stage,
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[{stage}] serialization failure while {context}: {source}")]
    Serialization {
        stage: Stage,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("[{stage}] rejected: {reason}")]
    Rejected { stage: Stage, reason: String },

    #[error("[{stage}] invalid input: {message}")]
    InvalidInput { stage: Stage, message: String },
}

/// A type alias for results using [`SegmentError`].
pub type Result<T> = std::result::Result<T, SegmentError>;

impl SegmentError {
    pub fn not_found(stage: Stage, target: impl Into<String>) -> Self {
        Self::NotFound {
            stage,
            target: target.into(),
        }
    }

    pub fn schema_mismatch(stage: Stage, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            stage,
            message: message.into(),
        }
    }

    pub fn report_format(stage: Stage, message: impl Into<String>) -> Self {
        Self::ReportFormat {
            stage,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(stage: Stage, context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            stage,
            context: context.into(),
            source,
        }
    }

    pub fn serialization<E>(stage: Stage, context: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Serialization {
            stage,
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn rejected(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Rejected {
            stage,
            reason: reason.into(),
        }
    }

    pub fn invalid_input(stage: Stage, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            stage,
            message: message.into(),
        }
    }

    /// The stage this error originated in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config { .. } => Stage::Config,
            Self::NotFound { stage, .. }
            | Self::SchemaMismatch { stage, .. }
            | Self::ReportFormat { stage, .. }
            | Self::Io { stage, .. }
            | Self::Serialization { stage, .. }
            | Self::Rejected { stage, .. }
            | Self::InvalidInput { stage, .. } => *stage,
        }
    }

    /// Convert an I/O error, promoting `ErrorKind::NotFound` to [`SegmentError::NotFound`].
    pub fn from_io(stage: Stage, path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(stage, path.display().to_string())
        } else {
            Self::io(stage, format!("accessing {}", path.display()), source)
        }
    }
}

/// Attach a stage and context to fallible I/O calls.
pub trait IoResultExt<T> {
    fn stage_context(self, stage: Stage, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn stage_context(self, stage: Stage, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| SegmentError::io(stage, context(), e))
    }
}
