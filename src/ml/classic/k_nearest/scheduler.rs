//! Fans a batch of independent queries out over a dedicated worker pool and
//! gathers the results back in input order.
//!
//! Two work-distribution policies are available:
//! - [`Backend::ThreadPool`]: a dynamic queue, each query is its own task and
//!   idle workers steal the next one. Results land at the query's index.
//! - [`Backend::Stream`]: the batch is cut into one contiguous chunk per
//!   worker and each chunk is processed sequentially.
//!
//! The policy only changes how work is spread; outputs are identical.

use std::fmt;
use std::str::FromStr;

use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};

/// The threading model used for batch inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    #[default]
    ThreadPool,
    Stream,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::ThreadPool => f.write_str("THREADPOOL"),
            Backend::Stream => f.write_str("STREAM"),
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "THREADPOOL" => Ok(Backend::ThreadPool),
            "STREAM" => Ok(Backend::Stream),
            other => Err(Error::property(
                "backend",
                format!("unknown backend '{}', expected THREADPOOL or STREAM", other),
            )),
        }
    }
}

/// A policy for spreading `len` independent tasks over a pool.
///
/// Implementations must return `task(i)` at position `i` of the output.
pub trait WorkDistribution {
    fn distribute<R, F>(&self, pool: &ThreadPool, len: usize, task: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync + Send;
}

/// One task per item, dynamically balanced across workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicQueue;

impl WorkDistribution for DynamicQueue {
    fn distribute<R, F>(&self, pool: &ThreadPool, len: usize, task: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync + Send,
    {
        let mut results = Vec::with_capacity(len);
        pool.install(|| {
            (0..len)
                .into_par_iter()
                .with_max_len(1)
                .map(&task)
                .collect_into_vec(&mut results);
        });
        results
    }
}

/// Contiguous chunks, one per lane, processed sequentially within a lane.
#[derive(Debug, Clone, Copy)]
pub struct StaticPartition {
    lanes: usize,
}

impl StaticPartition {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: lanes.max(1),
        }
    }

    fn chunk_size(&self, len: usize) -> usize {
        len.div_ceil(self.lanes).max(1)
    }
}

impl WorkDistribution for StaticPartition {
    fn distribute<R, F>(&self, pool: &ThreadPool, len: usize, task: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync + Send,
    {
        let chunk = self.chunk_size(len);
        let starts: Vec<usize> = (0..len).step_by(chunk).collect();
        let lanes: Vec<Vec<R>> = pool.install(|| {
            starts
                .par_iter()
                .map(|&start| (start..(start + chunk).min(len)).map(&task).collect())
                .collect()
        });
        lanes.into_iter().flatten().collect()
    }
}

/// Runs per-query work over a dedicated pool using the configured backend.
pub struct InferenceScheduler {
    backend: Backend,
    num_threads: usize,
    pool: ThreadPool,
}

impl InferenceScheduler {
    /// # Errors
    /// * `Property` if `num_threads` is zero
    /// * `ThreadPool` if the worker threads cannot be spawned
    pub fn new(backend: Backend, num_threads: usize) -> Result<Self> {
        if num_threads < 1 {
            return Err(Error::property(
                "numThreads",
                "numThreads must be greater than 0",
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("knn-inference-{}", i))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        debug!(
            "built inference scheduler: backend={}, threads={}",
            backend, num_threads
        );
        Ok(Self {
            backend,
            num_threads,
            pool,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Applies `task` to every query, returning results in query order.
    pub fn run<Q, R, F>(&self, queries: &[Q], task: F) -> Vec<R>
    where
        Q: Sync,
        R: Send,
        F: Fn(&Q) -> R + Sync + Send,
    {
        debug!(
            "scheduling {} queries on {} ({} threads)",
            queries.len(),
            self.backend,
            self.num_threads
        );
        let indexed = |i: usize| task(&queries[i]);
        match self.backend {
            Backend::ThreadPool => DynamicQueue.distribute(&self.pool, queries.len(), indexed),
            Backend::Stream => {
                StaticPartition::new(self.num_threads).distribute(&self.pool, queries.len(), indexed)
            }
        }
    }
}

impl fmt::Debug for InferenceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceScheduler")
            .field("backend", &self.backend)
            .field("num_threads", &self.num_threads)
            .finish()
    }
}
