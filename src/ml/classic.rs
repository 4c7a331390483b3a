pub mod k_nearest;

// Re-export public types
pub use k_nearest::{
    Backend, Dataset, Example, KNNConfig, KNNModel, KNNTrainer, Prediction, TrainingCounter,
};
