//! # Sparse Vector
//!
//! An immutable sparse vector of `f64` values keyed by integer feature id. Only
//! non-zero entries are stored, in ascending id order, as two parallel arrays.
//! The `dimension` bounds the id space; binary operations require both operands
//! to share it.
//!
//! Vectors are never mutated after construction, so a single vector can be read
//! from any number of threads without locking.
//!
//! ## Example
//! ```rust
//! use knn::math::sparse_vector::SparseVector;
//!
//! let a = SparseVector::new(4, vec![(0, 1.0), (3, 2.0)]).unwrap();
//! let b = SparseVector::new(4, vec![(3, 4.0), (1, 5.0)]).unwrap();
//! assert_eq!(a.dot(&b).unwrap(), 8.0);
//! assert_eq!(a.l1_norm(), 3.0);
//! ```

use std::collections::BTreeMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dimension: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Builds a vector from `(feature id, value)` pairs in any order.
    ///
    /// Repeated ids are summed and entries that end up zero are dropped.
    ///
    /// # Errors
    /// * `IndexOutOfBounds` if an id is `>= dimension`
    /// * `NonFiniteValue` if a value is NaN or infinite
    pub fn new<I>(dimension: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (index, value) in entries {
            if index >= dimension {
                return Err(Error::IndexOutOfBounds { index, dimension });
            }
            if !value.is_finite() {
                return Err(Error::NonFiniteValue { index, value });
            }
            *merged.entry(index).or_insert(0.0) += value;
        }

        let (indices, values) = merged.into_iter().filter(|&(_, v)| v != 0.0).unzip();

        Ok(Self {
            dimension,
            indices,
            values,
        })
    }

    /// Builds a vector from a dense slice, keeping only the non-zero entries.
    pub fn from_dense(dense: &[f64]) -> Result<Self> {
        Self::new(dense.len(), dense.iter().copied().enumerate())
    }

    /// An all-zero vector.
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Value at `index`, zero when not stored.
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Iterates over `(id, value)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Dot product over the ids both vectors share.
    ///
    /// Walks both id lists together when their lengths are similar. When one
    /// vector is much sparser, each of its ids is binary-searched in the
    /// remaining ids of the other, costing O(min · log max).
    ///
    /// # Errors
    /// * `DimensionMismatch` if the two vectors have different dimensions
    pub fn dot(&self, other: &SparseVector) -> Result<f64> {
        self.scaled_dot(other, 1.0, 1.0)
    }

    /// Dot product of `self / self_scale` and `other / other_scale`.
    pub(crate) fn scaled_dot(
        &self,
        other: &SparseVector,
        self_scale: f64,
        other_scale: f64,
    ) -> Result<f64> {
        self.check_dimension(other)?;

        let (short, long, short_scale, long_scale) = if self.nnz() <= other.nnz() {
            (self, other, self_scale, other_scale)
        } else {
            (other, self, other_scale, self_scale)
        };
        let product =
            |s: usize, l: usize| (short.values[s] / short_scale) * (long.values[l] / long_scale);

        let mut sum = 0.0;
        if prefer_search(short.nnz(), long.nnz()) {
            let mut lo = 0;
            for (s, id) in short.indices.iter().enumerate() {
                if lo >= long.indices.len() {
                    break;
                }
                match long.indices[lo..].binary_search(id) {
                    Ok(pos) => {
                        sum += product(s, lo + pos);
                        lo += pos + 1;
                    }
                    Err(pos) => lo += pos,
                }
            }
        } else {
            let (mut i, mut j) = (0, 0);
            while i < short.indices.len() && j < long.indices.len() {
                match short.indices[i].cmp(&long.indices[j]) {
                    std::cmp::Ordering::Less => i += 1,
                    std::cmp::Ordering::Greater => j += 1,
                    std::cmp::Ordering::Equal => {
                        sum += product(i, j);
                        i += 1;
                        j += 1;
                    }
                }
            }
        }
        Ok(sum)
    }

    /// Largest absolute stored value, zero for an empty vector.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0, |m: f64, v| m.max(v.abs()))
    }

    pub fn l2_norm_squared(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    /// Euclidean norm, computed on values scaled by [`max_abs`](Self::max_abs)
    /// so that large entries do not overflow.
    pub fn l2_norm(&self) -> f64 {
        let scale = self.max_abs();
        if scale == 0.0 {
            return 0.0;
        }
        scale * self.scaled_l2_norm(scale)
    }

    /// Norm of `self / scale`.
    pub(crate) fn scaled_l2_norm(&self, scale: f64) -> f64 {
        self.values
            .iter()
            .map(|v| (v / scale) * (v / scale))
            .sum::<f64>()
            .sqrt()
    }

    pub fn l1_norm(&self) -> f64 {
        self.values.iter().map(|v| v.abs()).sum()
    }

    /// Folds `f(acc, a_i, b_i)` over the union of non-zero ids of both vectors,
    /// substituting zero for the side that has no entry.
    pub(crate) fn fold_union<F>(&self, other: &SparseVector, init: f64, mut f: F) -> Result<f64>
    where
        F: FnMut(f64, f64, f64) -> f64,
    {
        self.check_dimension(other)?;

        let (mut i, mut j) = (0, 0);
        let mut acc = init;
        while i < self.indices.len() || j < other.indices.len() {
            let left = self.indices.get(i);
            let right = other.indices.get(j);
            match (left, right) {
                (Some(a), Some(b)) if a == b => {
                    acc = f(acc, self.values[i], other.values[j]);
                    i += 1;
                    j += 1;
                }
                (Some(a), Some(b)) if a < b => {
                    acc = f(acc, self.values[i], 0.0);
                    i += 1;
                }
                (Some(_), None) => {
                    acc = f(acc, self.values[i], 0.0);
                    i += 1;
                }
                _ => {
                    acc = f(acc, 0.0, other.values[j]);
                    j += 1;
                }
            }
        }
        Ok(acc)
    }

    pub(crate) fn check_dimension(&self, other: &SparseVector) -> Result<()> {
        if self.dimension != other.dimension {
            return Err(Error::dimension_mismatch(self.dimension, other.dimension));
        }
        Ok(())
    }
}

/// Binary search wins once `short · log2(long)` drops below a linear walk.
fn prefer_search(short: usize, long: usize) -> bool {
    let log_long = (usize::BITS - long.leading_zeros()) as usize;
    short.saturating_mul(log_long) < short + long
}
