//! The explicit runtime context of the ndchunk crate.
//!
//! Every operation that does per-chunk work takes a [`Context`] by reference.
//! A context is created with [`Context::init`] before the first array operation and released with [`Context::teardown`] after the last.
//! Nothing in this crate holds global mutable state.

use std::num::NonZeroUsize;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::array::ArrayError;

/// Configuration options for a [`Context`].
///
/// # Thread Count
/// > default: [`std::thread::available_parallelism`]`()`
///
/// The number of threads in the worker pool of the context.
/// Chunk-level and codec-level concurrency share this budget.
///
/// # Chunk Concurrency Minimum
/// > default: `4`
///
/// For array operations involving multiple chunks, this is the preferred minimum chunk concurrency.
/// The concurrency of codecs is reduced to accommodate the chunk concurrency within the thread count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    nthreads: usize,
    chunk_concurrent_minimum: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            nthreads: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            chunk_concurrent_minimum: 4,
        }
    }
}

impl ContextConfig {
    /// Get the [thread count](#thread-count) configuration.
    #[must_use]
    pub fn nthreads(&self) -> usize {
        self.nthreads
    }

    /// Set the [thread count](#thread-count) configuration.
    ///
    /// A thread count of zero is interpreted as one.
    pub fn set_nthreads(&mut self, nthreads: usize) -> &mut Self {
        self.nthreads = nthreads.max(1);
        self
    }

    /// Get the [chunk concurrency minimum](#chunk-concurrency-minimum) configuration.
    #[must_use]
    pub fn chunk_concurrent_minimum(&self) -> usize {
        self.chunk_concurrent_minimum
    }

    /// Set the [chunk concurrency minimum](#chunk-concurrency-minimum) configuration.
    pub fn set_chunk_concurrent_minimum(&mut self, concurrent_minimum: usize) -> &mut Self {
        self.chunk_concurrent_minimum = concurrent_minimum;
        self
    }
}

/// The runtime context: a bounded worker pool and its concurrency configuration.
#[derive(Debug)]
pub struct Context {
    config: ContextConfig,
    pool: ThreadPool,
}

impl Context {
    /// Initialise a context.
    ///
    /// # Errors
    /// Returns [`ArrayError::ContextCreate`] if the worker pool cannot be created.
    pub fn init(config: ContextConfig) -> Result<Self, ArrayError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.nthreads)
            .thread_name(|index| format!("ndchunk-{index}"))
            .build()
            .map_err(|err| ArrayError::ContextCreate(err.to_string()))?;
        log::debug!("initialised context with {} threads", config.nthreads);
        Ok(Self { config, pool })
    }

    /// Tear down the context, joining its worker pool.
    pub fn teardown(self) {
        log::debug!("tearing down context with {} threads", self.config.nthreads);
        drop(self);
    }

    /// Return the context configuration.
    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Return the number of worker threads.
    #[must_use]
    pub fn nthreads(&self) -> usize {
        self.config.nthreads
    }

    /// Run `op` within the worker pool of the context.
    pub(crate) fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }
}
