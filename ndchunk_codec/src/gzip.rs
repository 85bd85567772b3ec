use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder};

use crate::{
    ChunkCodec, ChunkRepresentation, CodecError, CodecOptions, CompressionConfig,
    RecommendedConcurrency,
};

/// A `gzip` codec implementation.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression_level: u32,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidConfiguration`] if `compression_level` is greater than 9.
    pub fn new(compression_level: u32) -> Result<Self, CodecError> {
        if compression_level > 9 {
            return Err(CodecError::InvalidConfiguration(format!(
                "gzip compression level {compression_level} must be between 0 and 9"
            )));
        }
        Ok(Self { compression_level })
    }
}

impl ChunkCodec for GzipCodec {
    fn configuration(&self) -> CompressionConfig {
        CompressionConfig::Gzip {
            level: self.compression_level,
        }
    }

    fn recommended_concurrency(
        &self,
        _representation: &ChunkRepresentation,
    ) -> RecommendedConcurrency {
        RecommendedConcurrency::new_maximum(1)
    }

    fn compress(
        &self,
        raw: &[u8],
        representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        representation.validate_decoded_len(raw.len())?;
        let mut encoder = GzEncoder::new(
            Cursor::new(raw),
            flate2::Compression::new(self.compression_level),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decompress(
        &self,
        encoded: &[u8],
        representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded));
        let mut out: Vec<u8> = Vec::with_capacity(representation.chunk_size());
        decoder.read_to_end(&mut out)?;
        representation.validate_decoded_len(out.len())?;
        Ok(out)
    }
}
