use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use log::{debug, info};

use crate::error::{Error, Result};

use super::config::KNNConfig;
use super::dataset::Dataset;
use super::model::KNNModel;
use super::provenance::ModelProvenance;
use super::store::TrainingStore;

/// How a training call should update the caller's [`TrainingCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationCount {
    /// Advance the counter by one.
    Increment,
    /// Set the counter to this value, then advance it by one. Negative values
    /// are rejected.
    Set(i64),
}

/// Caller-owned count of completed training runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingCounter {
    count: u64,
}

impl TrainingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.count
    }

    /// # Errors
    /// * `InvalidInvocationCount` if `count` is negative
    pub fn set(&mut self, count: i64) -> Result<()> {
        self.count = u64::try_from(count).map_err(|_| Error::InvalidInvocationCount(count))?;
        Ok(())
    }

    fn advance(&mut self) -> u64 {
        self.count += 1;
        self.count
    }
}

/// Trainer for exact k-nearest-neighbour models.
///
/// Training stores every example as a sparse vector, in dataset order. The
/// trainer holds no mutable state and can be reused across threads; the
/// invocation count lives in a [`TrainingCounter`] owned by the caller.
#[derive(Clone)]
pub struct KNNTrainer<T> {
    config: KNNConfig<T>,
}

impl<T> KNNTrainer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// # Errors
    /// * `Property` if the configuration fails validation
    pub fn new(config: KNNConfig<T>) -> Result<Self> {
        Ok(Self {
            config: config.finalize()?,
        })
    }

    pub fn config(&self) -> &KNNConfig<T> {
        &self.config
    }

    /// Trains a model on `dataset`.
    ///
    /// # Errors
    /// * `InvalidInvocationCount` for a negative explicit count; nothing else
    ///   is attempted
    /// * `KExceedsTrainingSize` if the dataset has fewer than `k` examples
    /// * `ThreadPool` if the model's inference pool cannot be built
    pub fn train(
        &self,
        dataset: &Dataset<T>,
        run_provenance: HashMap<String, String>,
        invocation: InvocationCount,
        counter: &mut TrainingCounter,
    ) -> Result<KNNModel<T>> {
        let mut next = *counter;
        if let InvocationCount::Set(count) = invocation {
            next.set(count)?;
        }

        if self.config.k > dataset.len() {
            return Err(Error::KExceedsTrainingSize {
                k: self.config.k,
                size: dataset.len(),
            });
        }

        let feature_map = dataset.feature_map().clone();
        let mut examples = Vec::with_capacity(dataset.len());
        for example in dataset.iter() {
            let (vector, _) = feature_map.vectorize(&example.features)?;
            examples.push((vector, example.output.clone()));
        }
        let store = TrainingStore::new(feature_map.len(), examples)?;
        debug!(
            "built training store: {} examples, {} features",
            store.len(),
            store.dimension()
        );

        let invocation = next.advance();
        let provenance = ModelProvenance {
            class_name: "KNNModel".to_string(),
            trained_at: SystemTime::now(),
            dataset: dataset.provenance().clone(),
            trainer: self.config.snapshot(),
            run: run_provenance,
            invocation,
        };

        let model = KNNModel::new(
            format!("{}nn", self.config.k),
            provenance,
            feature_map,
            store,
            self.config.clone(),
        )?;
        *counter = next;
        info!("trained {} (invocation {})", model.name(), invocation);
        Ok(model)
    }

    /// Trains with [`InvocationCount::Increment`].
    pub fn train_default(
        &self,
        dataset: &Dataset<T>,
        run_provenance: HashMap<String, String>,
        counter: &mut TrainingCounter,
    ) -> Result<KNNModel<T>> {
        self.train(dataset, run_provenance, InvocationCount::Increment, counter)
    }
}

impl<T> fmt::Display for KNNTrainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KNNTrainer(k={},distance={},combiner={},numThreads={})",
            self.config.k,
            self.config.distance,
            self.config.combiner.name(),
            self.config.num_threads
        )
    }
}

impl<T> fmt::Debug for KNNTrainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KNNTrainer")
            .field("config", &self.config)
            .finish()
    }
}
