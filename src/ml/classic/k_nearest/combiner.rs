//! Strategies that turn the k neighbours of a query into one prediction.
//!
//! Neighbours always arrive sorted by ascending distance with ties in store
//! order, so "nearest-ranked" means "earliest in the slice".

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

use super::search::Neighbour;

/// Offset added to distances before inverting them into weights.
const WEIGHT_EPSILON: f64 = 1e-9;

/// The aggregated output of a combiner and its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Combined<T> {
    pub output: T,
    pub score: f64,
}

/// Aggregates neighbour outputs into a single output.
pub trait OutputCombiner<T>: Send + Sync + Debug {
    /// # Errors
    /// * `InvalidInput` if `neighbours` is empty
    fn combine(&self, neighbours: &[Neighbour<T>]) -> Result<Combined<T>>;

    fn name(&self) -> &str;
}

fn ensure_non_empty<T>(neighbours: &[Neighbour<T>]) -> Result<()> {
    if neighbours.is_empty() {
        return Err(Error::invalid_input("cannot combine zero neighbours"));
    }
    Ok(())
}

fn inverse_distance(distance: f64) -> f64 {
    1.0 / (distance + WEIGHT_EPSILON)
}

/// Picks the label with the highest total weight. Ties go to the label whose
/// first occurrence is nearest-ranked.
fn weighted_vote<T, W>(neighbours: &[Neighbour<T>], weight: W) -> Result<Combined<T>>
where
    T: Eq + Hash + Clone,
    W: Fn(&Neighbour<T>) -> f64,
{
    ensure_non_empty(neighbours)?;

    // label -> (accumulated weight, rank of first occurrence)
    let mut tally: HashMap<&T, (f64, usize)> = HashMap::new();
    let mut total = 0.0;
    for (rank, neighbour) in neighbours.iter().enumerate() {
        let w = weight(neighbour);
        total += w;
        tally.entry(&neighbour.output).or_insert((0.0, rank)).0 += w;
    }

    let (label, (best, _)) = tally
        .into_iter()
        .max_by(|(_, (wa, ra)), (_, (wb, rb))| wa.total_cmp(wb).then(rb.cmp(ra)))
        .ok_or_else(|| Error::invalid_input("cannot combine zero neighbours"))?;

    Ok(Combined {
        output: label.clone(),
        score: if total > 0.0 { best / total } else { 0.0 },
    })
}

/// Majority vote, one vote per neighbour. Score is the winner's vote share.
#[derive(Debug, Clone, Copy, Default)]
pub struct VotingCombiner;

impl<T> OutputCombiner<T> for VotingCombiner
where
    T: Eq + Hash + Clone + Send + Sync,
{
    fn combine(&self, neighbours: &[Neighbour<T>]) -> Result<Combined<T>> {
        weighted_vote(neighbours, |_| 1.0)
    }

    fn name(&self) -> &str {
        "VotingCombiner"
    }
}

/// Vote weighted by inverse distance. Score is the winner's weight share.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedVotingCombiner;

impl<T> OutputCombiner<T> for WeightedVotingCombiner
where
    T: Eq + Hash + Clone + Send + Sync,
{
    fn combine(&self, neighbours: &[Neighbour<T>]) -> Result<Combined<T>> {
        weighted_vote(neighbours, |n| inverse_distance(n.distance))
    }

    fn name(&self) -> &str {
        "WeightedVotingCombiner"
    }
}

/// Mean of `(value, weight)` pairs and `1 / (1 + weighted variance)`.
fn weighted_mean(pairs: &[(f64, f64)]) -> Combined<f64> {
    let total: f64 = pairs.iter().map(|&(_, w)| w).sum();
    let mean = pairs.iter().map(|&(v, w)| v * w).sum::<f64>() / total;
    let variance = pairs
        .iter()
        .map(|&(v, w)| w * (v - mean) * (v - mean))
        .sum::<f64>()
        / total;
    Combined {
        output: mean,
        score: 1.0 / (1.0 + variance),
    }
}

/// Arithmetic mean for regression outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AveragingCombiner;

impl OutputCombiner<f64> for AveragingCombiner {
    fn combine(&self, neighbours: &[Neighbour<f64>]) -> Result<Combined<f64>> {
        ensure_non_empty(neighbours)?;
        let pairs: Vec<(f64, f64)> = neighbours.iter().map(|n| (n.output, 1.0)).collect();
        Ok(weighted_mean(&pairs))
    }

    fn name(&self) -> &str {
        "AveragingCombiner"
    }
}

/// Inverse-distance weighted mean for regression outputs.
///
/// If any neighbour sits at distance zero, only the exact matches are averaged.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAveragingCombiner;

impl OutputCombiner<f64> for WeightedAveragingCombiner {
    fn combine(&self, neighbours: &[Neighbour<f64>]) -> Result<Combined<f64>> {
        ensure_non_empty(neighbours)?;
        let exact: Vec<(f64, f64)> = neighbours
            .iter()
            .filter(|n| n.distance == 0.0)
            .map(|n| (n.output, 1.0))
            .collect();
        if !exact.is_empty() {
            return Ok(weighted_mean(&exact));
        }
        let pairs: Vec<(f64, f64)> = neighbours
            .iter()
            .map(|n| (n.output, inverse_distance(n.distance)))
            .collect();
        Ok(weighted_mean(&pairs))
    }

    fn name(&self) -> &str {
        "WeightedAveragingCombiner"
    }
}
