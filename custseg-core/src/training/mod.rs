//! Training and promotion stages.

pub mod pusher;
pub mod trainer;

pub use pusher::ModelPusher;
pub use trainer::ModelTrainer;
