/// The number of threads a codec can usefully occupy for a single chunk.
///
/// `min` is the most efficient concurrency and `max` the largest concurrency worth giving the codec.
/// Both are at least one, and `max` is never below `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendedConcurrency {
    min: usize,
    max: usize,
}

impl RecommendedConcurrency {
    /// Create a new recommended concurrency between `min` and `max` inclusive.
    ///
    /// Zero is interpreted as one, and a `max` below `min` is raised to `min`.
    #[must_use]
    pub fn new(min: usize, max: usize) -> Self {
        let min = min.max(1);
        Self {
            min,
            max: max.max(min),
        }
    }

    /// Create a new recommended concurrency with a `minimum` and no maximum.
    #[must_use]
    pub fn new_minimum(minimum: usize) -> Self {
        Self::new(minimum, usize::MAX)
    }

    /// Create a new recommended concurrency of at most `maximum`.
    #[must_use]
    pub fn new_maximum(maximum: usize) -> Self {
        Self::new(1, maximum)
    }

    /// Return the minimum concurrency.
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// Return the maximum concurrency.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }
}
