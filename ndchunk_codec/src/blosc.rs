use std::ffi::{c_char, c_int, c_void};

use blosc_src::{
    BLOSC_MAX_OVERHEAD, blosc_cbuffer_validate, blosc_compress_ctx, blosc_decompress_ctx,
    blosc_get_complib_info,
};

use crate::{
    BloscCompressor, BloscShuffleMode, ChunkCodec, ChunkRepresentation, CodecError, CodecOptions,
    CompressionConfig, RecommendedConcurrency,
};

/// A `blosc` codec implementation.
///
/// The element size is used as the blosc typesize and the block size of the chunk as the blosc blocksize.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    cname: BloscCompressor,
    clevel: u8,
    shuffle_mode: BloscShuffleMode,
}

impl BloscCodec {
    /// Create a new `blosc` codec.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `clevel` is greater than 9 or the compressor is not supported by the linked blosc library.
    pub fn new(
        cname: BloscCompressor,
        clevel: u8,
        shuffle_mode: BloscShuffleMode,
    ) -> Result<Self, CodecError> {
        if clevel > 9 {
            return Err(CodecError::InvalidConfiguration(format!(
                "blosc compression level {clevel} must be between 0 and 9"
            )));
        }
        // Check that the compressor is available
        let support = unsafe {
            blosc_get_complib_info(
                cname.as_cstr().as_ptr().cast::<c_char>(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if support < 0 {
            return Err(CodecError::Unsupported(format!(
                "blosc compressor {cname:?} is not supported"
            )));
        }
        Ok(Self {
            cname,
            clevel,
            shuffle_mode,
        })
    }
}

fn threads(options: &CodecOptions) -> c_int {
    c_int::try_from(options.concurrent_target()).unwrap_or(c_int::MAX)
}

impl ChunkCodec for BloscCodec {
    fn configuration(&self) -> CompressionConfig {
        CompressionConfig::Blosc {
            cname: self.cname,
            clevel: self.clevel,
            shuffle: self.shuffle_mode,
        }
    }

    fn recommended_concurrency(
        &self,
        representation: &ChunkRepresentation,
    ) -> RecommendedConcurrency {
        // blosc compresses blocks independently
        RecommendedConcurrency::new_maximum(
            representation
                .chunk_size()
                .div_ceil(representation.block_size().max(1))
                .max(1),
        )
    }

    fn compress(
        &self,
        raw: &[u8],
        representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        representation.validate_decoded_len(raw.len())?;
        let destsize = raw.len() + BLOSC_MAX_OVERHEAD as usize;
        let mut dest: Vec<u8> = Vec::with_capacity(destsize);
        let compressed_size = unsafe {
            blosc_compress_ctx(
                c_int::from(self.clevel),
                c_int::from(self.shuffle_mode as u8),
                std::cmp::max(1, representation.element_size()),
                raw.len(),
                raw.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                destsize,
                self.cname.as_cstr().as_ptr().cast::<c_char>(),
                representation.block_size(),
                threads(options),
            )
        };
        match usize::try_from(compressed_size) {
            Ok(compressed_size) if compressed_size > 0 => {
                // SAFETY: blosc initialised the first `compressed_size` bytes, which is at most `destsize`
                unsafe { dest.set_len(compressed_size) };
                dest.shrink_to_fit();
                Ok(dest)
            }
            _ => Err(CodecError::Other(format!(
                "blosc_compress_ctx(clevel: {}, doshuffle: {:?}, typesize: {}, nbytes: {}, destsize: {destsize}, compressor: {:?}, blocksize: {}) -> {compressed_size} (failure)",
                self.clevel,
                self.shuffle_mode,
                representation.element_size(),
                raw.len(),
                self.cname,
                representation.block_size(),
            ))),
        }
    }

    fn decompress(
        &self,
        encoded: &[u8],
        representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut destsize: usize = 0;
        let valid = unsafe {
            blosc_cbuffer_validate(
                encoded.as_ptr().cast::<c_void>(),
                encoded.len(),
                std::ptr::addr_of_mut!(destsize),
            )
        } == 0;
        if !valid {
            return Err(CodecError::from("blosc encoded value is invalid"));
        }
        representation.validate_decoded_len(destsize)?;

        let mut dest: Vec<u8> = Vec::with_capacity(destsize);
        let decompressed_size = unsafe {
            blosc_decompress_ctx(
                encoded.as_ptr().cast::<c_void>(),
                dest.as_mut_ptr().cast::<c_void>(),
                destsize,
                threads(options),
            )
        };
        match usize::try_from(decompressed_size) {
            Ok(decompressed_size) if decompressed_size == destsize => {
                // SAFETY: blosc initialised all `destsize` bytes
                unsafe { dest.set_len(destsize) };
                Ok(dest)
            }
            _ => Err(CodecError::from("blosc_decompress_ctx failed")),
        }
    }
}
