//! End-to-end training and prediction flows.

pub mod prediction;
pub mod train;

pub use prediction::{CustomerData, PredictionPipeline};
pub use train::TrainPipeline;
