use crate::{
    ChunkCodec, ChunkRepresentation, CodecError, CodecOptions, CompressionConfig,
    RecommendedConcurrency,
};

/// The identity codec, storing chunks uncompressed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoneCodec;

impl ChunkCodec for NoneCodec {
    fn configuration(&self) -> CompressionConfig {
        CompressionConfig::None
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
        Ok(raw.to_vec())
    }

    fn decompress(
        &self,
        encoded: &[u8],
        representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        representation.validate_decoded_len(encoded.len())?;
        Ok(encoded.to_vec())
    }
}
