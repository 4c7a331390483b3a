use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::math::distance::Distance;

use super::combiner::OutputCombiner;
use super::scheduler::Backend;

/// Configuration options for k-NN training and inference.
#[derive(Clone)]
pub struct KNNConfig<T> {
    /// Number of neighbours to combine.
    pub k: usize,
    /// Distance function used to rank neighbours.
    pub distance: Distance,
    /// Strategy that aggregates the k neighbours.
    pub combiner: Arc<dyn OutputCombiner<T>>,
    /// Number of inference worker threads.
    pub num_threads: usize,
    /// Threading model used for batch inference.
    pub backend: Backend,
}

impl<T> KNNConfig<T> {
    /// Create a new config with default values for num_threads (1) and backend
    /// (THREADPOOL).
    pub fn new<C>(k: usize, distance: Distance, combiner: C) -> Self
    where
        C: OutputCombiner<T> + 'static,
    {
        Self {
            k,
            distance,
            combiner: Arc::new(combiner),
            num_threads: 1,
            backend: Backend::default(),
        }
    }

    /// Customize the number of inference threads.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Customize the threading model.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Validates the configuration once every property has been set.
    ///
    /// # Errors
    /// * `Property` naming `k` if `k < 1`
    /// * `Property` naming `numThreads` if `num_threads < 1`
    pub fn finalize(self) -> Result<Self> {
        if self.k < 1 {
            return Err(Error::property("k", "k must be greater than 0"));
        }
        if self.num_threads < 1 {
            return Err(Error::property(
                "numThreads",
                "numThreads must be greater than 0",
            ));
        }
        Ok(self)
    }

    /// Builds a config from string properties, as supplied by an external
    /// configuration system. `distance` and `k` are mandatory, `numThreads`
    /// and `backend` optional. The combiner is passed in directly.
    ///
    /// # Errors
    /// * `Property` for a missing or unparsable property, or a failed
    ///   [`finalize`](Self::finalize) check
    pub fn from_properties<C>(properties: &HashMap<String, String>, combiner: C) -> Result<Self>
    where
        C: OutputCombiner<T> + 'static,
    {
        let required = |field: &str| {
            properties
                .get(field)
                .ok_or_else(|| Error::property(field, "mandatory property is missing"))
        };

        let distance: Distance = required("distance")?.parse()?;
        let k = parse_count("k", required("k")?)?;
        let mut config = Self::new(k, distance, combiner);

        if let Some(raw) = properties.get("numThreads") {
            config = config.with_num_threads(parse_count("numThreads", raw)?);
        }
        if let Some(raw) = properties.get("backend") {
            config = config.with_backend(raw.parse()?);
        }
        config.finalize()
    }

    /// Snapshot of the configuration as property name/value pairs.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        vec![
            ("k".to_string(), self.k.to_string()),
            ("distance".to_string(), self.distance.to_string()),
            ("combiner".to_string(), self.combiner.name().to_string()),
            ("numThreads".to_string(), self.num_threads.to_string()),
            ("backend".to_string(), self.backend.to_string()),
        ]
    }
}

/// Parses a count property, reporting negatives as property errors rather
/// than parse failures.
fn parse_count(field: &str, raw: &str) -> Result<usize> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::property(field, format!("'{}' is not an integer", raw)))?;
    usize::try_from(value)
        .map_err(|_| Error::property(field, format!("{} must be greater than 0", field)))
}

impl<T> fmt::Debug for KNNConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KNNConfig")
            .field("k", &self.k)
            .field("distance", &self.distance)
            .field("combiner", &self.combiner.name())
            .field("num_threads", &self.num_threads)
            .field("backend", &self.backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::classic::k_nearest::combiner::VotingCombiner;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = KNNConfig::<&str>::new(3, Distance::L2, VotingCombiner)
            .finalize()
            .unwrap();
        assert_eq!(config.num_threads, 1);
        assert_eq!(config.backend, Backend::ThreadPool);
    }

    #[test]
    fn test_zero_k_is_property_error() {
        let result = KNNConfig::<&str>::new(0, Distance::L1, VotingCombiner).finalize();
        assert!(matches!(result, Err(Error::Property { ref field, .. }) if field == "k"));
    }

    #[test]
    fn test_zero_threads_is_property_error() {
        let result = KNNConfig::<&str>::new(1, Distance::L1, VotingCombiner)
            .with_num_threads(0)
            .finalize();
        assert!(matches!(result, Err(Error::Property { ref field, .. }) if field == "numThreads"));
    }

    #[test]
    fn test_from_properties() {
        let config = KNNConfig::<String>::from_properties(
            &props(&[
                ("distance", "cosine"),
                ("k", "5"),
                ("numThreads", "4"),
                ("backend", "STREAM"),
            ]),
            VotingCombiner,
        )
        .unwrap();
        assert_eq!(config.k, 5);
        assert_eq!(config.distance, Distance::Cosine);
        assert_eq!(config.num_threads, 4);
        assert_eq!(config.backend, Backend::Stream);
    }

    #[test]
    fn test_from_properties_missing_mandatory() {
        let result = KNNConfig::<String>::from_properties(&props(&[("k", "3")]), VotingCombiner);
        assert!(matches!(result, Err(Error::Property { ref field, .. }) if field == "distance"));
    }

    #[test]
    fn test_from_properties_negative_k() {
        let result = KNNConfig::<String>::from_properties(
            &props(&[("distance", "L2"), ("k", "-1")]),
            VotingCombiner,
        );
        assert!(matches!(result, Err(Error::Property { ref field, .. }) if field == "k"));
    }

    #[test]
    fn test_snapshot() {
        let config = KNNConfig::<String>::new(2, Distance::L1, VotingCombiner);
        let snapshot = config.snapshot();
        assert!(snapshot.contains(&("combiner".to_string(), "VotingCombiner".to_string())));
        assert!(snapshot.contains(&("backend".to_string(), "THREADPOOL".to_string())));
    }
}
