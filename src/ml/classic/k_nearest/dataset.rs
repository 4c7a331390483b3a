use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::math::sparse_vector::SparseVector;

/// A single training or query example: named feature values plus an output.
#[derive(Debug, Clone, PartialEq)]
pub struct Example<T> {
    pub features: Vec<(String, f64)>,
    pub output: T,
}

impl<T> Example<T> {
    pub fn new<S: Into<String>>(features: Vec<(S, f64)>, output: T) -> Self {
        Self {
            features: features
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
            output,
        }
    }
}

/// Immutable mapping from feature name to a dense integer id.
///
/// Ids are assigned in sorted name order, so the same set of names always
/// produces the same ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl FeatureMap {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let names: Vec<String> = sorted.into_iter().collect();
        let ids = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id))
            .collect();
        Self { names, ids }
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Converts named features into a sparse vector over this map.
    ///
    /// Features missing from the map are skipped. Returns the vector and the
    /// number of features that were found.
    pub fn vectorize(&self, features: &[(String, f64)]) -> Result<(SparseVector, usize)> {
        let known: Vec<(usize, f64)> = features
            .iter()
            .filter_map(|(name, value)| self.id(name).map(|id| (id, *value)))
            .collect();
        let used = known.len();
        let vector = SparseVector::new(self.len(), known)?;
        Ok((vector, used))
    }
}

/// Lineage recorded for a dataset and carried into model provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetProvenance {
    pub source: String,
    pub num_examples: usize,
    pub num_features: usize,
}

/// An ordered collection of examples with the feature map built from them.
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    examples: Vec<Example<T>>,
    feature_map: FeatureMap,
    provenance: DatasetProvenance,
}

impl<T> Dataset<T> {
    /// Builds a dataset, deriving the feature map from every feature name seen.
    ///
    /// # Errors
    /// * `NonFiniteValue` if a feature value is NaN or infinite; `index` is the
    ///   feature's id in the derived map
    pub fn new<S: Into<String>>(source: S, examples: Vec<Example<T>>) -> Result<Self> {
        let feature_map = FeatureMap::new(
            examples
                .iter()
                .flat_map(|e| e.features.iter().map(|(name, _)| name.as_str())),
        );
        for example in &examples {
            if let Some((name, value)) = example.features.iter().find(|(_, v)| !v.is_finite()) {
                return Err(Error::NonFiniteValue {
                    index: feature_map.id(name).unwrap_or_default(),
                    value: *value,
                });
            }
        }

        let provenance = DatasetProvenance {
            source: source.into(),
            num_examples: examples.len(),
            num_features: feature_map.len(),
        };

        Ok(Self {
            examples,
            feature_map,
            provenance,
        })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[Example<T>] {
        &self.examples
    }

    pub fn feature_map(&self) -> &FeatureMap {
        &self.feature_map
    }

    pub fn provenance(&self) -> &DatasetProvenance {
        &self.provenance
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Example<T>> {
        self.examples.iter()
    }
}
