//! Exact top-k neighbour selection by brute-force scan.
//!
//! Each query walks the whole [`TrainingStore`] once and keeps the k best
//! candidates in a fixed-capacity, array-backed max-heap. Candidates are keyed
//! by `(distance, store index)`, so among equal distances the example inserted
//! first is kept and ranked first. The scan is O(n log k) time and O(k) space.

use std::cmp::Ordering;

use log::trace;

use crate::error::{Error, Result};
use crate::math::distance::Distance;
use crate::math::sparse_vector::SparseVector;

use super::store::TrainingStore;

/// One selected neighbour: its position in the store, its distance to the
/// query and a copy of its output.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbour<T> {
    pub index: usize,
    pub distance: f64,
    pub output: T,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    index: usize,
}

impl Candidate {
    /// A NaN distance ranks as farthest, never as nearest.
    fn new(distance: f64, index: usize) -> Self {
        let distance = if distance.is_nan() {
            f64::INFINITY
        } else {
            distance
        };
        Self { distance, index }
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

/// Max-heap over `Candidate` that never grows past its capacity.
#[derive(Debug)]
struct BoundedMaxHeap {
    capacity: usize,
    items: Vec<Candidate>,
}

impl BoundedMaxHeap {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn peek(&self) -> Option<&Candidate> {
        self.items.first()
    }

    /// Offers a candidate. It is kept if the heap is not full, or if it ranks
    /// strictly before the current worst, which is then evicted.
    fn offer(&mut self, candidate: Candidate) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() < self.capacity {
            self.items.push(candidate);
            self.sift_up(self.items.len() - 1);
        } else if let Some(worst) = self.peek() {
            if candidate.cmp_key(worst) == Ordering::Less {
                self.items[0] = candidate;
                self.sift_down(0);
            }
        }
    }

    fn sift_up(&mut self, mut child: usize) {
        while child > 0 {
            let parent = (child - 1) / 2;
            if self.items[child].cmp_key(&self.items[parent]) != Ordering::Greater {
                break;
            }
            self.items.swap(child, parent);
            child = parent;
        }
    }

    fn sift_down(&mut self, mut parent: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * parent + 1;
            let right = left + 1;
            let mut largest = parent;
            if left < len && self.items[left].cmp_key(&self.items[largest]) == Ordering::Greater {
                largest = left;
            }
            if right < len && self.items[right].cmp_key(&self.items[largest]) == Ordering::Greater
            {
                largest = right;
            }
            if largest == parent {
                break;
            }
            self.items.swap(parent, largest);
            parent = largest;
        }
    }

    /// Consumes the heap, returning candidates in ascending order.
    fn into_sorted_vec(mut self) -> Vec<Candidate> {
        self.items.sort_unstable_by(Candidate::cmp_key);
        self.items
    }
}

/// Finds the `k` nearest examples to a query under a fixed distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourSearch {
    k: usize,
    distance: Distance,
}

impl NeighbourSearch {
    pub fn new(k: usize, distance: Distance) -> Self {
        Self { k, distance }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Returns exactly `k` neighbours sorted by ascending distance, ties in
    /// store order.
    ///
    /// # Errors
    /// * `InvalidInput` if `k` is zero
    /// * `KExceedsTrainingSize` if the store holds fewer than `k` examples
    /// * `DimensionMismatch` if the query's dimension differs from the store's
    pub fn search<T: Clone>(
        &self,
        store: &TrainingStore<T>,
        query: &SparseVector,
    ) -> Result<Vec<Neighbour<T>>> {
        if self.k == 0 {
            return Err(Error::invalid_input("k must be greater than 0"));
        }
        if self.k > store.len() {
            return Err(Error::KExceedsTrainingSize {
                k: self.k,
                size: store.len(),
            });
        }
        if query.dimension() != store.dimension() {
            return Err(Error::dimension_mismatch(store.dimension(), query.dimension()));
        }

        let mut heap = BoundedMaxHeap::with_capacity(self.k);
        for (index, (vector, _)) in store.iter().enumerate() {
            let distance = self.distance.compute(query, vector)?;
            heap.offer(Candidate::new(distance, index));
        }
        trace!("selected {} of {} candidates", heap.len(), store.len());

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| {
                store
                    .output(c.index)
                    .cloned()
                    .map(|output| Neighbour {
                        index: c.index,
                        distance: c.distance,
                        output,
                    })
                    .ok_or_else(|| Error::invalid_input("neighbour index outside store"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn one_dim_store(points: &[(f64, &'static str)]) -> TrainingStore<&'static str> {
        TrainingStore::new(
            1,
            points
                .iter()
                .map(|&(x, label)| (SparseVector::from_dense(&[x]).unwrap(), label))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_heap_keeps_k_smallest() {
        let mut heap = BoundedMaxHeap::with_capacity(3);
        for (index, distance) in [5.0, 1.0, 4.0, 2.0, 3.0, 0.5].into_iter().enumerate() {
            heap.offer(Candidate { distance, index });
        }
        let kept: Vec<f64> = heap.into_sorted_vec().iter().map(|c| c.distance).collect();
        assert_eq!(kept, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_heap_prefers_earlier_index_on_tie() {
        let mut heap = BoundedMaxHeap::with_capacity(2);
        for index in 0..5 {
            heap.offer(Candidate {
                distance: 1.0,
                index,
            });
        }
        let kept: Vec<usize> = heap.into_sorted_vec().iter().map(|c| c.index).collect();
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn test_nan_distance_ranks_last() {
        let mut heap = BoundedMaxHeap::with_capacity(2);
        heap.offer(Candidate::new(-f64::NAN, 0));
        heap.offer(Candidate::new(f64::NAN, 1));
        heap.offer(Candidate::new(3.0, 2));
        let kept = heap.into_sorted_vec();
        assert_eq!(kept[0].index, 2);
        assert_eq!(kept[1].distance, f64::INFINITY);
    }

    #[test]
    fn test_cosine_with_huge_values_finds_parallel_example() {
        let examples = vec![
            (SparseVector::from_dense(&[1.0, 1.0]).unwrap(), "parallel"),
            (SparseVector::from_dense(&[1e200, -1e200]).unwrap(), "orthogonal"),
            (SparseVector::from_dense(&[-1e200, -1e200]).unwrap(), "opposite"),
        ];
        let store = TrainingStore::new(2, examples).unwrap();
        let query = SparseVector::from_dense(&[1e200, 1e200]).unwrap();
        let result = NeighbourSearch::new(3, Distance::Cosine)
            .search(&store, &query)
            .unwrap();
        let labels: Vec<_> = result.iter().map(|n| n.output).collect();
        assert_eq!(labels, vec!["parallel", "orthogonal", "opposite"]);
        assert!(result.iter().all(|n| n.distance.is_finite()));
    }

    #[test]
    fn test_tie_scenario() {
        let store = one_dim_store(&[(1.0, "A"), (2.0, "B"), (10.0, "A")]);
        let query = SparseVector::from_dense(&[1.5]).unwrap();
        let result = NeighbourSearch::new(2, Distance::L2)
            .search(&store, &query)
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!((result[0].index, result[0].output), (0, "A"));
        assert_eq!((result[1].index, result[1].output), (1, "B"));
        assert_relative_eq!(result[0].distance, 0.5);
        assert_relative_eq!(result[1].distance, 0.5);
    }

    #[test]
    fn test_later_tie_does_not_displace_earlier() {
        let store = one_dim_store(&[(3.0, "far"), (1.0, "first"), (1.0, "second"), (1.0, "third")]);
        let query = SparseVector::from_dense(&[0.0]).unwrap();
        let result = NeighbourSearch::new(2, Distance::L1)
            .search(&store, &query)
            .unwrap();
        let labels: Vec<_> = result.iter().map(|n| n.output).collect();
        assert_eq!(labels, vec!["first", "second"]);
    }

    #[test]
    fn test_k_equals_store_size_returns_everything_sorted() {
        let store = one_dim_store(&[(4.0, "d"), (1.0, "a"), (3.0, "c"), (2.0, "b")]);
        let query = SparseVector::zeros(1);
        let result = NeighbourSearch::new(4, Distance::L1)
            .search(&store, &query)
            .unwrap();
        let labels: Vec<_> = result.iter().map(|n| n.output).collect();
        assert_eq!(labels, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_k_exceeds_store() {
        let store = one_dim_store(&[(1.0, "A")]);
        let query = SparseVector::zeros(1);
        assert_eq!(
            NeighbourSearch::new(2, Distance::L2).search(&store, &query),
            Err(Error::KExceedsTrainingSize { k: 2, size: 1 })
        );
    }

    #[test]
    fn test_zero_k_rejected() {
        let store = one_dim_store(&[(1.0, "A")]);
        let query = SparseVector::zeros(1);
        assert!(matches!(
            NeighbourSearch::new(0, Distance::L2).search(&store, &query),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = one_dim_store(&[(1.0, "A")]);
        let query = SparseVector::zeros(3);
        assert_eq!(
            NeighbourSearch::new(1, Distance::L2).search(&store, &query),
            Err(Error::dimension_mismatch(1, 3))
        );
    }

    #[test]
    fn test_matches_full_sort_on_random_data() {
        let mut rng = StdRng::seed_from_u64(7);
        let dimension = 20;
        let examples: Vec<(SparseVector, usize)> = (0..300)
            .map(|i| {
                let entries: Vec<(usize, f64)> = (0..5)
                    .map(|_| (rng.gen_range(0..dimension), rng.gen_range(-2.0..2.0)))
                    .collect();
                (SparseVector::new(dimension, entries).unwrap(), i)
            })
            .collect();
        let store = TrainingStore::new(dimension, examples).unwrap();
        let query = SparseVector::new(dimension, vec![(1, 1.0), (5, -0.5), (13, 0.25)]).unwrap();

        for distance in [Distance::L1, Distance::L2, Distance::Cosine] {
            let mut expected: Vec<(f64, usize)> = store
                .iter()
                .enumerate()
                .map(|(i, (v, _))| (distance.compute(&query, v).unwrap(), i))
                .collect();
            expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            let search = NeighbourSearch::new(17, distance);
            let result = search.search(&store, &query).unwrap();
            assert_eq!(result.len(), 17);
            let got: Vec<usize> = result.iter().map(|n| n.index).collect();
            let want: Vec<usize> = expected.iter().take(17).map(|&(_, i)| i).collect();
            assert_eq!(got, want);
            assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));

            // Repeated searches are bit-identical.
            assert_eq!(search.search(&store, &query).unwrap(), result);
        }
    }
}
