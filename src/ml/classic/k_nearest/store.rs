use crate::error::{Error, Result};
use crate::math::sparse_vector::SparseVector;

/// The immutable, ordered set of `(vector, output)` pairs a model searches.
///
/// Insertion order is the tie-break order for equal distances, so it is fixed
/// once the store is built. All vectors share one dimension.
#[derive(Debug, Clone)]
pub struct TrainingStore<T> {
    dimension: usize,
    vectors: Vec<SparseVector>,
    outputs: Vec<T>,
}

impl<T> TrainingStore<T> {
    /// # Errors
    /// * `DimensionMismatch` if a vector's dimension differs from `dimension`
    pub fn new(dimension: usize, examples: Vec<(SparseVector, T)>) -> Result<Self> {
        let mut vectors = Vec::with_capacity(examples.len());
        let mut outputs = Vec::with_capacity(examples.len());
        for (vector, output) in examples {
            if vector.dimension() != dimension {
                return Err(Error::dimension_mismatch(dimension, vector.dimension()));
            }
            vectors.push(vector);
            outputs.push(output);
        }
        Ok(Self {
            dimension,
            vectors,
            outputs,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vector(&self, index: usize) -> Option<&SparseVector> {
        self.vectors.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&T> {
        self.outputs.get(index)
    }

    /// Iterates over `(vector, output)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&SparseVector, &T)> + '_ {
        self.vectors.iter().zip(self.outputs.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_insertion_order() {
        let store = TrainingStore::new(
            2,
            vec![
                (SparseVector::from_dense(&[1.0, 0.0]).unwrap(), "first"),
                (SparseVector::from_dense(&[0.0, 1.0]).unwrap(), "second"),
            ],
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        let outputs: Vec<_> = store.iter().map(|(_, o)| *o).collect();
        assert_eq!(outputs, vec!["first", "second"]);
        assert_eq!(store.output(1), Some(&"second"));
        assert_eq!(store.vector(2), None);
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let result = TrainingStore::new(
            2,
            vec![
                (SparseVector::zeros(2), 1.0),
                (SparseVector::zeros(3), 2.0),
            ],
        );
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }
}
