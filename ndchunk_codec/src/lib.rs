//! The chunk codec API for the `ndchunk` crate.
//!
//! A [`ChunkCodec`] compresses the raw bytes of a padded chunk and decompresses them again.
//! Codecs never see special (zero, NaN, constant, uninitialized) chunks, which bypass compression entirely.
//!
//! Included codecs:
//!  - `none`: the identity codec ([`NoneCodec`]),
//!  - `gzip`: **Default feature** ([`GzipCodec`]),
//!  - `zstd`: **Default feature** ([`ZstdCodec`]),
//!  - `blosc`: **Default feature** ([`BloscCodec`]).
//!
//! A codec is usually created from a serialisable [`CompressionConfig`] with [`codec_from_config`].
//!
//! ## Licence
//! `ndchunk_codec` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod compression_config;
pub use compression_config::{BloscCompressor, BloscShuffleMode, CompressionConfig};

mod recommended_concurrency;
pub use recommended_concurrency::RecommendedConcurrency;

mod none;
pub use none::NoneCodec;

#[cfg(feature = "gzip")]
mod gzip;
#[cfg(feature = "gzip")]
pub use gzip::GzipCodec;

#[cfg(feature = "zstd")]
mod zstd;
#[cfg(feature = "zstd")]
pub use zstd::ZstdCodec;

#[cfg(feature = "blosc")]
mod blosc;
#[cfg(feature = "blosc")]
pub use blosc::BloscCodec;

use std::sync::Arc;

use derive_more::{Deref, From};
use thiserror::Error;

/// The byte layout of a padded chunk presented to a codec.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkRepresentation {
    element_size: usize,
    chunk_size: usize,
    block_size: usize,
}

impl ChunkRepresentation {
    /// Create a new chunk representation.
    ///
    /// `chunk_elements` is the number of elements in a padded chunk and `block_elements` the number of elements in a block.
    /// Returns [`None`] if the chunk or block size in bytes exceeds [`usize::MAX`].
    #[must_use]
    pub fn new(element_size: usize, chunk_elements: u64, block_elements: u64) -> Option<Self> {
        let size = |elements: u64| usize::try_from(elements).ok()?.checked_mul(element_size);
        Some(Self {
            element_size,
            chunk_size: size(chunk_elements)?,
            block_size: size(block_elements)?,
        })
    }

    /// Return the size of an element in bytes.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Return the size of a decoded padded chunk in bytes.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Return the size of a block in bytes.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Check that `len` matches the decoded chunk size.
    ///
    /// # Errors
    /// Returns [`InvalidBytesLengthError`] if `len` is not [`chunk_size`](Self::chunk_size).
    pub const fn validate_decoded_len(&self, len: usize) -> Result<(), InvalidBytesLengthError> {
        if len == self.chunk_size {
            Ok(())
        } else {
            Err(InvalidBytesLengthError::new(len, self.chunk_size))
        }
    }
}

/// Codec options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CodecOptions {
    concurrent_target: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            concurrent_target: 1,
        }
    }
}

impl CodecOptions {
    /// Return the concurrent target.
    #[must_use]
    pub const fn concurrent_target(&self) -> usize {
        self.concurrent_target
    }

    /// Set the concurrent target.
    pub fn set_concurrent_target(&mut self, concurrent_target: usize) {
        self.concurrent_target = concurrent_target.max(1);
    }

    /// Set the concurrent target.
    #[must_use]
    pub fn with_concurrent_target(mut self, concurrent_target: usize) -> Self {
        self.set_concurrent_target(concurrent_target);
        self
    }
}

/// Traits for a chunk codec.
pub trait ChunkCodec: core::fmt::Debug + Send + Sync {
    /// Return the configuration of the codec.
    fn configuration(&self) -> CompressionConfig;

    /// Return the recommended concurrency for encoding or decoding a chunk with this `representation`.
    fn recommended_concurrency(
        &self,
        representation: &ChunkRepresentation,
    ) -> RecommendedConcurrency;

    /// Compress the raw bytes of a padded chunk.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `raw` does not match the chunk size of `representation` or compression fails.
    fn compress(
        &self,
        raw: &[u8],
        representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decompress an encoded chunk to the raw bytes of a padded chunk.
    ///
    /// # Errors
    /// Returns [`CodecError`] if decompression fails or the decoded size does not match the chunk size of `representation`.
    fn decompress(
        &self,
        encoded: &[u8],
        representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError>;
}

/// A shared [`ChunkCodec`].
#[derive(Debug, Clone, Deref, From)]
pub struct Codec(Arc<dyn ChunkCodec>);

impl<T: ChunkCodec + 'static> From<Arc<T>> for Codec {
    fn from(codec: Arc<T>) -> Self {
        Self(codec)
    }
}

/// Create a codec from a [`CompressionConfig`].
///
/// # Errors
/// Returns [`CodecError::Unsupported`] if the codec feature is not enabled, or [`CodecError::InvalidConfiguration`] if the configuration is invalid.
pub fn codec_from_config(config: &CompressionConfig) -> Result<Codec, CodecError> {
    match config {
        CompressionConfig::None => Ok(Arc::new(NoneCodec).into()),
        #[cfg(feature = "gzip")]
        CompressionConfig::Gzip { level } => Ok(Arc::new(GzipCodec::new(*level)?).into()),
        #[cfg(feature = "zstd")]
        CompressionConfig::Zstd { level } => Ok(Arc::new(ZstdCodec::new(*level)?).into()),
        #[cfg(feature = "blosc")]
        CompressionConfig::Blosc {
            cname,
            clevel,
            shuffle,
        } => Ok(Arc::new(BloscCodec::new(*cname, *clevel, *shuffle)?).into()),
        #[allow(unreachable_patterns)]
        _ => Err(CodecError::Unsupported(format!(
            "the {} codec is not enabled",
            config.name()
        ))),
    }
}

/// An invalid bytes length error.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("got {len} bytes, expected {expected_len}")]
pub struct InvalidBytesLengthError {
    len: usize,
    expected_len: usize,
}

impl InvalidBytesLengthError {
    /// Create a new [`InvalidBytesLengthError`].
    #[must_use]
    pub const fn new(len: usize, expected_len: usize) -> Self {
        Self { len, expected_len }
    }

    /// Return the length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Return the expected length.
    #[must_use]
    pub const fn expected_len(&self) -> usize {
        self.expected_len
    }
}

/// A codec error.
#[derive(Clone, Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// The size of a decoded chunk did not match what was expected.
    #[error("the size of a decoded chunk is {}, expected {}", _0.len, _0.expected_len)]
    UnexpectedChunkDecodedSize(#[from] InvalidBytesLengthError),
    /// The codec is not supported.
    #[error("unsupported codec: {_0}")]
    Unsupported(String),
    /// The codec configuration is invalid.
    #[error("invalid codec configuration: {_0}")]
    InvalidConfiguration(String),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bytes(representation: &ChunkRepresentation) -> Vec<u8> {
        (0..representation.chunk_size())
            .map(|i| u8::try_from(i / 7 % 256).unwrap())
            .collect()
    }

    fn round_trip(config: &CompressionConfig) {
        let codec = codec_from_config(config).unwrap();
        assert_eq!(&codec.configuration(), config);
        let representation = ChunkRepresentation::new(4, 8 * 5, 2 * 2).unwrap();
        let options = CodecOptions::default();
        let bytes = test_bytes(&representation);
        let encoded = codec.compress(&bytes, &representation, &options).unwrap();
        let decoded = codec
            .decompress(&encoded, &representation, &options)
            .unwrap();
        assert_eq!(bytes, decoded);

        // The wrong raw size is rejected
        assert!(codec.compress(&bytes[1..], &representation, &options).is_err());

        assert!(codec.recommended_concurrency(&representation).min() >= 1);

        // The wrong decoded size is rejected
        let smaller = ChunkRepresentation::new(4, 8 * 4, 2 * 2).unwrap();
        assert!(codec.decompress(&encoded, &smaller, &options).is_err());
    }

    #[test]
    fn chunk_representation_sizes() {
        let representation = ChunkRepresentation::new(4, 8 * 5, 2 * 2).unwrap();
        assert_eq!(representation.chunk_size(), 160);
        assert_eq!(representation.block_size(), 16);
        assert!(ChunkRepresentation::new(4, 1 << 62, 1).is_none());
        assert!(ChunkRepresentation::new(2, 8, u64::MAX).is_none());
    }

    #[test]
    fn codec_none_round_trip() {
        round_trip(&CompressionConfig::None);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn codec_gzip_round_trip() {
        round_trip(&CompressionConfig::Gzip { level: 5 });
        assert!(codec_from_config(&CompressionConfig::Gzip { level: 10 }).is_err());
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn codec_zstd_round_trip() {
        round_trip(&CompressionConfig::Zstd { level: 3 });
        assert!(codec_from_config(&CompressionConfig::Zstd { level: 100 }).is_err());
    }

    #[cfg(feature = "blosc")]
    #[test]
    fn codec_blosc_round_trip() {
        for cname in [BloscCompressor::BloscLZ, BloscCompressor::LZ4, BloscCompressor::Zstd] {
            for shuffle in [
                BloscShuffleMode::NoShuffle,
                BloscShuffleMode::Shuffle,
                BloscShuffleMode::BitShuffle,
            ] {
                round_trip(&CompressionConfig::Blosc {
                    cname,
                    clevel: 5,
                    shuffle,
                });
            }
        }
        assert!(
            codec_from_config(&CompressionConfig::Blosc {
                cname: BloscCompressor::LZ4,
                clevel: 10,
                shuffle: BloscShuffleMode::Shuffle,
            })
            .is_err()
        );
    }

    #[test]
    fn codec_options() {
        let options = CodecOptions::default().with_concurrent_target(0);
        assert_eq!(options.concurrent_target(), 1);
        let options = options.with_concurrent_target(4);
        assert_eq!(options.concurrent_target(), 4);
    }
}
