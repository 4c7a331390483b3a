//! # k-Nearest Neighbours
//!
//! Exact k-NN classification and regression over sparse feature vectors.
//!
//! Training converts each example of a [`Dataset`] into a [`SparseVector`]
//! and stores it, in dataset order, in an immutable [`TrainingStore`].
//! Inference scans the whole store for every query, keeps the k closest
//! examples in a bounded heap and hands them to a pluggable
//! [`OutputCombiner`]. Batches are spread over a worker pool by the
//! [`InferenceScheduler`] and come back in input order.
//!
//! ## Example
//! ```rust
//! use std::collections::HashMap;
//! use knn::math::distance::Distance;
//! use knn::ml::classic::k_nearest::{
//!     Backend, Dataset, Example, KNNConfig, KNNTrainer, TrainingCounter, VotingCombiner,
//! };
//!
//! let dataset = Dataset::new(
//!     "toy",
//!     vec![
//!         Example::new(vec![("x", 1.0), ("y", 2.0)], "A"),
//!         Example::new(vec![("x", 2.0), ("y", 3.0)], "A"),
//!         Example::new(vec![("x", 3.0), ("y", 3.0)], "B"),
//!         Example::new(vec![("x", 6.0), ("y", 7.0)], "B"),
//!     ],
//! )
//! .unwrap();
//!
//! let config = KNNConfig::new(3, Distance::L2, VotingCombiner)
//!     .with_num_threads(2)
//!     .with_backend(Backend::Stream);
//! let trainer = KNNTrainer::new(config).unwrap();
//! let mut counter = TrainingCounter::new();
//! let model = trainer
//!     .train_default(&dataset, HashMap::new(), &mut counter)
//!     .unwrap();
//!
//! let prediction = model
//!     .predict(&Example::new(vec![("x", 2.1), ("y", 2.9)], ""))
//!     .unwrap();
//! assert_eq!(prediction.output, "A");
//! ```
//!
//! [`SparseVector`]: crate::math::sparse_vector::SparseVector

pub mod combiner;
pub mod config;
pub mod dataset;
pub mod model;
pub mod provenance;
pub mod scheduler;
pub mod search;
pub mod store;
pub mod trainer;


pub use combiner::{
    AveragingCombiner, Combined, OutputCombiner, VotingCombiner, WeightedAveragingCombiner,
    WeightedVotingCombiner,
};
pub use config::KNNConfig;
pub use dataset::{Dataset, DatasetProvenance, Example, FeatureMap};
pub use model::{KNNModel, Prediction};
pub use provenance::ModelProvenance;
pub use scheduler::{Backend, DynamicQueue, InferenceScheduler, StaticPartition, WorkDistribution};
pub use search::{Neighbour, NeighbourSearch};
pub use store::TrainingStore;
pub use trainer::{InvocationCount, KNNTrainer, TrainingCounter};
