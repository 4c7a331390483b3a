use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::math::sparse_vector::SparseVector;

/// Distance functions between sparse vectors.
///
/// Every variant returns a value where smaller means closer, so callers can
/// rank neighbours by ascending distance regardless of the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distance {
    /// L1 (Manhattan) distance.
    L1,
    /// L2 (Euclidean) distance.
    L2,
    /// Cosine similarity turned into a distance as `1 - similarity`.
    Cosine,
}

impl Distance {
    /// Computes the distance between `a` and `b`.
    ///
    /// # Errors
    /// * `DimensionMismatch` if the vectors have different dimensions
    ///
    /// # Examples
    /// ```
    /// use knn::math::distance::Distance;
    /// use knn::math::sparse_vector::SparseVector;
    ///
    /// let a = SparseVector::from_dense(&[0.0, 3.0]).unwrap();
    /// let b = SparseVector::from_dense(&[4.0, 0.0]).unwrap();
    /// assert_eq!(Distance::L1.compute(&a, &b).unwrap(), 7.0);
    /// assert_eq!(Distance::L2.compute(&a, &b).unwrap(), 5.0);
    /// assert_eq!(Distance::Cosine.compute(&a, &b).unwrap(), 1.0);
    /// ```
    pub fn compute(&self, a: &SparseVector, b: &SparseVector) -> Result<f64> {
        match self {
            Distance::L1 => a.fold_union(b, 0.0, |acc, x, y| acc + (x - y).abs()),
            Distance::L2 => euclidean(a, b),
            Distance::Cosine => Ok(1.0 - cosine_similarity(a, b)?),
        }
    }
}

/// Euclidean distance, with differences scaled by the largest one so the sum
/// of squares stays in range.
fn euclidean(a: &SparseVector, b: &SparseVector) -> Result<f64> {
    let scale = a.fold_union(b, 0.0, |m, x, y| m.max((x - y).abs()))?;
    if scale == 0.0 || !scale.is_finite() {
        return Ok(scale);
    }
    let sum = a.fold_union(b, 0.0, |acc, x, y| {
        let d = (x - y) / scale;
        acc + d * d
    })?;
    Ok(scale * sum.sqrt())
}

/// Cosine similarity, defined as zero when either vector has zero norm.
///
/// Each vector is divided by its largest absolute value first; the similarity
/// is unchanged by that and the products cannot overflow.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> Result<f64> {
    a.check_dimension(b)?;
    let (scale_a, scale_b) = (a.max_abs(), b.max_abs());
    if scale_a == 0.0 || scale_b == 0.0 {
        return Ok(0.0);
    }
    let dot = a.scaled_dot(b, scale_a, scale_b)?;
    let norms = a.scaled_l2_norm(scale_a) * b.scaled_l2_norm(scale_b);
    Ok((dot / norms).clamp(-1.0, 1.0))
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Distance::L1 => "L1",
            Distance::L2 => "L2",
            Distance::Cosine => "COSINE",
        };
        f.write_str(name)
    }
}

impl FromStr for Distance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L1" => Ok(Distance::L1),
            "L2" => Ok(Distance::L2),
            "COSINE" => Ok(Distance::Cosine),
            other => Err(Error::property(
                "distance",
                format!("unknown distance '{}', expected one of L1, L2, COSINE", other),
            )),
        }
    }
}
