use crate::{
    ChunkCodec, ChunkRepresentation, CodecError, CodecOptions, CompressionConfig,
    RecommendedConcurrency,
};

/// The minimum number of bytes per zstd worker.
const ZSTD_JOB_SIZE: usize = 1024 * 1024;

/// A `zstd` codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    compression_level: i32,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if `compression_level` is not supported by zstd.
    pub fn new(compression_level: i32) -> Result<Self, CodecError> {
        let range = zstd::compression_level_range();
        if range.contains(&compression_level) {
            Ok(Self { compression_level })
        } else {
            Err(CodecError::InvalidConfiguration(format!(
                "zstd compression level {compression_level} must be within {range:?}"
            )))
        }
    }
}

impl ChunkCodec for ZstdCodec {
    fn configuration(&self) -> CompressionConfig {
        CompressionConfig::Zstd {
            level: self.compression_level,
        }
    }

    fn recommended_concurrency(
        &self,
        representation: &ChunkRepresentation,
    ) -> RecommendedConcurrency {
        RecommendedConcurrency::new_maximum(
            representation.chunk_size().div_ceil(ZSTD_JOB_SIZE).max(1),
        )
    }

    fn compress(
        &self,
        raw: &[u8],
        representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        representation.validate_decoded_len(raw.len())?;
        let mut encoder = zstd::Encoder::new(Vec::new(), self.compression_level)?;
        let n_workers = u32::try_from(options.concurrent_target()).unwrap_or(u32::MAX);
        if n_workers > 1 {
            encoder.multithread(n_workers)?;
        }
        encoder.include_checksum(true)?;
        std::io::copy(&mut std::io::Cursor::new(raw), &mut encoder)?;
        Ok(encoder.finish()?)
    }

    fn decompress(
        &self,
        encoded: &[u8],
        representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let decoded = zstd::decode_all(encoded)?;
        representation.validate_decoded_len(decoded.len())?;
        Ok(decoded)
    }
}
