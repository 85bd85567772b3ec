use serde::{Deserialize, Serialize};

/// A blosc internal compressor.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// [BloscLZ](https://github.com/Blosc/c-blosc/blob/master/blosc/blosclz.h): blosc default compressor, heavily based on [FastLZ](http://fastlz.org/).
    BloscLZ,
    /// [LZ4](http://fastcompression.blogspot.com/p/lz4.html): a compact, very popular and fast compressor.
    LZ4,
    /// [LZ4HC](http://fastcompression.blogspot.com/p/lz4.html): a tweaked version of LZ4, produces better compression ratios at the expense of speed.
    LZ4HC,
    /// [Snappy](https://code.google.com/p/snappy): a popular compressor used in many places.
    Snappy,
    /// [Zlib](http://www.zlib.net/): a classic; somewhat slower than the previous ones, but achieving better compression ratios.
    Zlib,
    /// [Zstd](http://www.zstd.net/): an extremely well balanced codec.
    Zstd,
}

impl BloscCompressor {
    /// Return the nul terminated compressor name understood by blosc.
    #[must_use]
    pub const fn as_cstr(&self) -> &'static [u8] {
        match self {
            Self::BloscLZ => b"blosclz\0",
            Self::LZ4 => b"lz4\0",
            Self::LZ4HC => b"lz4hc\0",
            Self::Snappy => b"snappy\0",
            Self::Zlib => b"zlib\0",
            Self::Zstd => b"zstd\0",
        }
    }
}

/// The blosc shuffle mode.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BloscShuffleMode {
    /// No shuffling.
    NoShuffle = 0,
    /// Byte-wise shuffling.
    Shuffle = 1,
    /// Bit-wise shuffling.
    BitShuffle = 2,
}

/// A serialisable chunk compression configuration.
///
/// ```json
/// {
///     "name": "blosc",
///     "configuration": { "cname": "lz4", "clevel": 5, "shuffle": "shuffle" }
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(tag = "name", content = "configuration", rename_all = "lowercase")]
pub enum CompressionConfig {
    /// No compression.
    None,
    /// gzip compression with a level from 0 to 9.
    Gzip {
        /// The compression level.
        level: u32,
    },
    /// zstd compression.
    Zstd {
        /// The compression level.
        level: i32,
    },
    /// blosc compression.
    Blosc {
        /// The internal compressor.
        cname: BloscCompressor,
        /// The compression level from 0 to 9.
        clevel: u8,
        /// The shuffle mode.
        shuffle: BloscShuffleMode,
    },
}

impl Default for CompressionConfig {
    fn default() -> Self {
        #[cfg(feature = "blosc")]
        {
            Self::Blosc {
                cname: BloscCompressor::LZ4,
                clevel: 5,
                shuffle: BloscShuffleMode::Shuffle,
            }
        }
        #[cfg(not(feature = "blosc"))]
        {
            Self::None
        }
    }
}

impl CompressionConfig {
    /// Return the codec name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip { .. } => "gzip",
            Self::Zstd { .. } => "zstd",
            Self::Blosc { .. } => "blosc",
        }
    }
}
