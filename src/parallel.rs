//! Worker pool configuration for per-site parallelism

use crate::errors::{MetPointError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// `None` uses one thread per available core
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// Create a configuration that uses a specific number of threads
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Threads the pool will run
    pub fn threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Build a dedicated pool; sites are processed inside it
    pub fn build_pool(&self) -> Result<ThreadPool> {
        let threads = self.threads();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("met-point-{i}"))
            .build()
            .map_err(|e| {
                MetPointError::ThreadPool(format!(
                    "failed to initialize thread pool with {threads} threads: {e}"
                ))
            })?;
        info!(threads, "configured site worker pool");
        Ok(pool)
    }
}
