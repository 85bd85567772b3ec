//! The chunk storage API for the `ndchunk` crate.
//!
//! A chunk store persists and retrieves the chunks of one array by linear chunk index.
//! Each chunk is a [`ChunkRecord`]: either a special chunk (a fill tag with an optional value and no payload) or an encoded (compressed) payload.
//!
//! This crate includes three stores, selected with a [`StorageBackend`]:
//!  - [`MemoryChunkStore`](store::MemoryChunkStore): chunks held in memory and discarded on drop,
//!  - [`ContiguousChunkStore`](store::ContiguousChunkStore): an append-only single file,
//!  - [`SparseChunkStore`](store::SparseChunkStore): a directory with one file per chunk.
//!
//! ## Licence
//! `ndchunk_storage` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod chunk_record;
mod storage_backend;
pub mod store;

use std::sync::Arc;

use auto_impl::auto_impl;
use thiserror::Error;

pub use bytes::Bytes;
pub use chunk_record::{ChunkRecord, FillValue, SpecialChunk};
pub use storage_backend::StorageBackend;

/// The linear index of a chunk in a store.
pub type ChunkId = u64;

/// [`Arc`] wrapped chunk storage.
pub type ChunkStorage = Arc<dyn ChunkStore>;

/// Chunk store traits.
///
/// Stores serialise concurrent access internally, so every method takes `&self`.
#[auto_impl(Arc, Box)]
pub trait ChunkStore: Send + Sync + core::fmt::Debug {
    /// Return the number of chunks in the store.
    fn num_chunks(&self) -> u64;

    /// Append a chunk and return its [`ChunkId`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn append(&self, record: ChunkRecord) -> Result<ChunkId, StorageError>;

    /// Retrieve the chunk at `chunk_id`.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidChunkId`] if `chunk_id` is out of bounds, or another [`StorageError`] if there is an underlying storage error.
    fn get(&self, chunk_id: ChunkId) -> Result<ChunkRecord, StorageError>;

    /// Replace the chunk at `chunk_id`.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidChunkId`] if `chunk_id` is out of bounds, or another [`StorageError`] if there is an underlying storage error.
    fn set(&self, chunk_id: ChunkId, record: ChunkRecord) -> Result<(), StorageError>;

    /// Resize the store to `num_chunks` chunks.
    ///
    /// Chunks beyond `num_chunks` are removed, and new chunks are initialised to `fill`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn resize(&self, num_chunks: u64, fill: &ChunkRecord) -> Result<(), StorageError>;

    /// Retrieve the store metadata.
    ///
    /// Returns [`None`] if the metadata has not been set.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn metadata(&self) -> Result<Option<Bytes>, StorageError>;

    /// Replace the store metadata.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn set_metadata(&self, metadata: Bytes) -> Result<(), StorageError>;

    /// Flush pending writes to the underlying storage.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn flush(&self) -> Result<(), StorageError>;

    /// Returns true if the chunks outlive the store.
    fn is_persistent(&self) -> bool;
}

/// A storage error.
#[derive(Clone, Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// A chunk id is out of bounds.
    #[error("chunk id {chunk_id} is out of bounds, the store has {num_chunks} chunks")]
    InvalidChunkId {
        /// The chunk id.
        chunk_id: ChunkId,
        /// The number of chunks in the store.
        num_chunks: u64,
    },
    /// The stored data is corrupt.
    #[error("corrupt store: {0}")]
    Corrupt(String),
    /// The store does not exist.
    #[error("missing store at {0}")]
    MissingStore(String),
    /// The requested method is not supported.
    #[error("{0}")]
    Unsupported(String),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Return [`StorageError::InvalidChunkId`] unless `chunk_id` is less than `num_chunks`.
pub(crate) fn check_chunk_id(chunk_id: ChunkId, num_chunks: u64) -> Result<(), StorageError> {
    if chunk_id < num_chunks {
        Ok(())
    } else {
        Err(StorageError::InvalidChunkId {
            chunk_id,
            num_chunks,
        })
    }
}
