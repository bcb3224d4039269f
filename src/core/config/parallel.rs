//! Shared parallel processing configuration types.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the fan-out stages of page analysis (views, nozzles
/// within a view, note crops).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel processing.
    /// If None, work runs on rayon's global pool.
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Collections with fewer items than this are processed sequentially.
    /// Default: 2 (any collection of two or more fans out)
    #[serde(default = "ParallelPolicy::default_utility_threshold")]
    pub utility_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the sequential/parallel item threshold.
    pub fn with_utility_threshold(mut self, threshold: usize) -> Self {
        self.utility_threshold = threshold;
        self
    }

    /// Whether a collection of `len` items should fan out.
    pub fn should_parallelize(&self, len: usize) -> bool {
        len >= self.utility_threshold.max(2)
    }

    /// Maps `f` over `items`, in parallel when the collection is large enough.
    ///
    /// Results are always in input order.
    pub fn map_ordered<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.should_parallelize(items.len()) {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    /// Builds a dedicated bounded pool when `max_threads` is set.
    ///
    /// Returns `Ok(None)` when work should use rayon's global pool.
    pub fn build_pool(&self) -> Result<Option<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
        match self.max_threads {
            Some(num_threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads.max(1))
                .thread_name(|i| format!("vessel-worker-{i}"))
                .build()
                .map(Some),
            None => Ok(None),
        }
    }

    fn default_utility_threshold() -> usize {
        2
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            utility_threshold: Self::default_utility_threshold(),
        }
    }
}
