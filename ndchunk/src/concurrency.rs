//! Splitting the thread budget of a [`Context`](crate::Context) between chunks and their codec.
//!
//! An operation over many chunks runs up to [`ConcurrencySplit::chunks`] chunks at once, and each chunk gives its codec [`ConcurrencySplit::codec`] threads.

use ndchunk_codec::{CodecOptions, RecommendedConcurrency};

use crate::ContextConfig;

/// A split of a thread budget between an outer level (chunks) and an inner level (the codec of each chunk).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcurrencySplit {
    chunks: usize,
    codec: usize,
}

impl ConcurrencySplit {
    /// Split `target` threads between an `outer` and an `inner` level.
    ///
    /// Both levels start at their recommended minimum.
    /// While their product is below `target`, the inner level grows up to its recommended maximum, and then the outer level does.
    #[must_use]
    pub fn new(
        target: usize,
        outer: &RecommendedConcurrency,
        inner: &RecommendedConcurrency,
    ) -> Self {
        let below_target = |chunks: usize, codec: usize| chunks * codec < target;
        let mut chunks = outer.min();
        let mut codec = inner.min();
        if below_target(chunks, codec) {
            codec = target.div_ceil(chunks).min(inner.max());
        }
        if below_target(chunks, codec) {
            chunks = target.div_ceil(codec).min(outer.max());
        }
        Self { chunks, codec }
    }

    /// Split the threads of `config` for an operation over `num_chunks` chunks with a codec recommending `codec` concurrency.
    ///
    /// At least [`chunk_concurrent_minimum`](ContextConfig::chunk_concurrent_minimum) chunks are processed concurrently (if there are that many).
    #[must_use]
    pub fn for_chunks(
        config: &ContextConfig,
        num_chunks: usize,
        codec: &RecommendedConcurrency,
    ) -> Self {
        let minimum = config.chunk_concurrent_minimum();
        let outer = RecommendedConcurrency::new(minimum.min(num_chunks), minimum.max(num_chunks));
        Self::new(config.nthreads(), &outer, codec)
    }

    /// Return the number of chunks to process concurrently.
    #[must_use]
    pub const fn chunks(&self) -> usize {
        self.chunks
    }

    /// Return the concurrency of the codec of each chunk.
    #[must_use]
    pub const fn codec(&self) -> usize {
        self.codec
    }

    /// Return codec options with the concurrent target set to [`codec`](Self::codec).
    #[must_use]
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions::default().with_concurrent_target(self.codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_split() {
        let minimum = RecommendedConcurrency::new_minimum;
        let maximum = RecommendedConcurrency::new_maximum;
        let cases = [
            // (outer, inner, expected (chunks, codec))
            (minimum(24), maximum(1), (32, 1)),
            (minimum(24), maximum(4), (24, 2)),
            (maximum(5), maximum(32), (1, 32)),
            (maximum(5), maximum(4), (5, 4)),
            (RecommendedConcurrency::new(40, 64), maximum(4), (40, 1)),
        ];
        for (outer, inner, (chunks, codec)) in cases {
            let split = ConcurrencySplit::new(32, &outer, &inner);
            assert_eq!(
                (split.chunks(), split.codec()),
                (chunks, codec),
                "{outer:?} {inner:?}"
            );
        }
    }

    #[test]
    fn concurrency_split_for_chunks() {
        let mut config = ContextConfig::default();
        config.set_nthreads(8).set_chunk_concurrent_minimum(4);

        // Few chunks leave threads for the codec
        let split =
            ConcurrencySplit::for_chunks(&config, 2, &RecommendedConcurrency::new_maximum(8));
        assert_eq!((split.chunks(), split.codec()), (2, 4));
        assert_eq!(split.codec_options().concurrent_target(), 4);

        // Many chunks take the whole budget from a serial codec
        let split =
            ConcurrencySplit::for_chunks(&config, 100, &RecommendedConcurrency::new_maximum(1));
        assert_eq!((split.chunks(), split.codec()), (8, 1));

        // No chunks
        let split =
            ConcurrencySplit::for_chunks(&config, 0, &RecommendedConcurrency::new_maximum(1));
        assert_eq!((split.chunks(), split.codec()), (4, 1));
    }
}
