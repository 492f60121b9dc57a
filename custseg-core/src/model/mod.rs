//! Clustering model and the model store that serves it.

pub mod estimator;
pub mod kmeans;
pub mod segmentation;

pub use estimator::CustomerClusterEstimator;
pub use kmeans::{KMeans, KMeansParams, silhouette_score};
pub use segmentation::CustomerSegmentationModel;
