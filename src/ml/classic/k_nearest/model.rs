use log::{debug, warn};

use crate::error::{Error, Result};
use crate::math::sparse_vector::SparseVector;

use super::config::KNNConfig;
use super::dataset::{Example, FeatureMap};
use super::provenance::ModelProvenance;
use super::scheduler::InferenceScheduler;
use super::search::{Neighbour, NeighbourSearch};
use super::store::TrainingStore;

/// A single prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<T> {
    pub output: T,
    /// Confidence reported by the combiner.
    pub score: f64,
    /// Number of query features found in the model's feature map.
    pub num_used: usize,
}

/// A trained k-nearest-neighbour model.
///
/// The training store is read-only after construction and is shared by
/// reference with every inference worker.
#[derive(Debug)]
pub struct KNNModel<T> {
    name: String,
    provenance: ModelProvenance,
    feature_map: FeatureMap,
    store: TrainingStore<T>,
    config: KNNConfig<T>,
    search: NeighbourSearch,
    scheduler: InferenceScheduler,
}

impl<T> KNNModel<T>
where
    T: Clone + Send + Sync,
{
    pub(crate) fn new(
        name: String,
        provenance: ModelProvenance,
        feature_map: FeatureMap,
        store: TrainingStore<T>,
        config: KNNConfig<T>,
    ) -> Result<Self> {
        let search = NeighbourSearch::new(config.k, config.distance);
        let scheduler = InferenceScheduler::new(config.backend, config.num_threads)?;
        debug!("constructed model {} over {} examples", name, store.len());
        Ok(Self {
            name,
            provenance,
            feature_map,
            store,
            config,
            search,
            scheduler,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provenance(&self) -> &ModelProvenance {
        &self.provenance
    }

    pub fn feature_map(&self) -> &FeatureMap {
        &self.feature_map
    }

    pub fn store(&self) -> &TrainingStore<T> {
        &self.store
    }

    pub fn config(&self) -> &KNNConfig<T> {
        &self.config
    }

    /// Returns the k nearest training examples to `query`.
    pub fn neighbours(&self, query: &SparseVector) -> Result<Vec<Neighbour<T>>> {
        self.search.search(&self.store, query)
    }

    /// Predicts the output for a vector already expressed in this model's
    /// feature space.
    ///
    /// # Errors
    /// * `DimensionMismatch` if the vector was built for another feature map
    pub fn predict_vector(&self, query: &SparseVector) -> Result<Prediction<T>> {
        let neighbours = self.neighbours(query)?;
        let combined = self.config.combiner.combine(&neighbours)?;
        Ok(Prediction {
            output: combined.output,
            score: combined.score,
            num_used: query.nnz(),
        })
    }

    /// Predicts the output for a named-feature example. Features unknown to
    /// the model are ignored.
    ///
    /// # Errors
    /// * `NoFeatures` if none of the example's features are known
    /// * `NonFiniteValue` if a known feature's value is NaN or infinite
    pub fn predict(&self, example: &Example<T>) -> Result<Prediction<T>> {
        let (vector, used) = self.feature_map.vectorize(&example.features)?;
        if used == 0 {
            return Err(Error::NoFeatures);
        }
        let prediction = self.predict_vector(&vector)?;
        Ok(Prediction {
            num_used: used,
            ..prediction
        })
    }

    /// Predicts every example concurrently. The result at position `i`
    /// belongs to `examples[i]`; a failing example does not affect the others.
    pub fn predict_batch(&self, examples: &[Example<T>]) -> Vec<Result<Prediction<T>>> {
        let results = self.scheduler.run(examples, |e| self.predict(e));
        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            warn!(
                "{} of {} queries failed in model {}",
                failures,
                results.len(),
                self.name
            );
        }
        results
    }

    /// Like [`predict_batch`](Self::predict_batch), but returns the first
    /// failure instead of per-item results.
    pub fn predict_batch_fail_fast(&self, examples: &[Example<T>]) -> Result<Vec<Prediction<T>>> {
        self.predict_batch(examples).into_iter().collect()
    }

    /// Batch prediction over pre-built vectors.
    pub fn predict_vectors(&self, queries: &[SparseVector]) -> Vec<Result<Prediction<T>>> {
        self.scheduler.run(queries, |q| self.predict_vector(q))
    }
}
