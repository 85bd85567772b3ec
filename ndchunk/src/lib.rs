//! `ndchunk` is a Rust library for multidimensional chunked and blocked arrays.
//!
//! An N-dimensional array of fixed-size elements is partitioned into a regular grid of chunks, and each chunk is partitioned into blocks.
//! Chunks are compressed with a pluggable codec and persisted through a pluggable chunk store.
//!
//! Arrays filled with zeros, NaNs, a constant value, or left uninitialized are stored as *special* chunks with no payload.
//! Creating them never touches the codec, and reading them expands the fill directly into the output.
//! A special chunk is materialized (compressed) only when a write covers part of it.
//!
//! ## Getting Started
//! - Create a [`Context`] before the first array operation and tear it down after the last.
//! - Describe an array with [`Params`]: its shape, chunk shape, block shape, element size, compression, and storage back-end.
//! - Create a [`PartitionedArray`] with one of its constructors, read and write it with buffers, and [`release`](PartitionedArray::release) it.
//!
//! ## Storage Support
//! - [`StorageBackend::Memory`]: chunks held in memory and discarded on release.
//! - [`StorageBackend::Contiguous`]: an append-only single file.
//! - [`StorageBackend::Sparse`]: a directory with one file per chunk.
//!
//! Custom stores implement [`ChunkStore`](storage::ChunkStore) and are used with [`PartitionedArray::create_with_store`].
//!
//! ## Codec Support
//! `none`, `gzip`, `zstd` and `blosc` (with the `blosclz`, `lz4`, `lz4hc`, `snappy`, `zlib` and `zstd` compressors).
//! See [`CompressionConfig`](codec::CompressionConfig).
//!
//! ## Examples
//! ```
//! # use ndchunk::{Context, ContextConfig, Params, PartitionedArray, Region, StorageBackend};
//! let context = Context::init(ContextConfig::default())?;
//! let params = Params::new(vec![20, 10], vec![7, 5], vec![3, 5], 4)?.backend(StorageBackend::Memory);
//!
//! // A zero filled array with 6 special chunks
//! let mut array = PartitionedArray::create_zeros(&context, &params)?;
//! assert_eq!(array.num_chunks(), 6);
//! assert_eq!(array.to_vec(&context)?, vec![0; 800]);
//!
//! // Write a 2x2 region, materializing the one chunk it touches
//! let region = Region::new_with_ranges(&[1..3, 1..3]);
//! array.set_slice_buffer(&context, &region, &[1; 16])?;
//! assert_eq!(array.get_slice_vec(&context, &region)?, vec![1; 16]);
//! assert!(!array.get_chunk(0)?.is_special());
//! assert!(array.get_chunk(1)?.is_special());
//!
//! array.release()?;
//! context.teardown();
//! # Ok::<_, ndchunk::ArrayError>(())
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `blosc`: enable the `blosc` codec.
//!  - `gzip`: enable the `gzip` codec.
//!  - `zstd`: enable the `zstd` codec.
//!
//! ## Licence
//! `ndchunk` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod concurrency;
mod context;
mod fill;
mod params;

pub use array::{ArrayError, ArrayMetadata, PartitionedArray};
pub use context::{Context, ContextConfig};
pub use fill::SpecialChunkPolicy;
pub use params::{Params, StorageConfig};

pub use ndchunk_geometry::{ArrayIndices, ArrayShape, ChunkGrid, MAX_DIM, Region, RegionOverlap};
pub use ndchunk_storage::{ChunkRecord, FillValue, SpecialChunk, StorageBackend};

/// Re-export [`ndchunk_codec`].
pub use ndchunk_codec as codec;
/// Re-export [`ndchunk_geometry`].
pub use ndchunk_geometry as geometry;
/// Re-export [`ndchunk_storage`].
pub use ndchunk_storage as storage;
