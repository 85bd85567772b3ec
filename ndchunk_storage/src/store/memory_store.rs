//! A synchronous in-memory chunk store.

use parking_lot::RwLock;

use crate::{check_chunk_id, Bytes, ChunkId, ChunkRecord, ChunkStore, StorageError};

/// A synchronous in-memory chunk store.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<Vec<ChunkRecord>>,
    metadata: RwLock<Option<Bytes>>,
}

impl MemoryChunkStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn num_chunks(&self) -> u64 {
        self.chunks.read().len() as u64
    }

    fn append(&self, record: ChunkRecord) -> Result<ChunkId, StorageError> {
        let mut chunks = self.chunks.write();
        chunks.push(record);
        Ok(chunks.len() as u64 - 1)
    }

    fn get(&self, chunk_id: ChunkId) -> Result<ChunkRecord, StorageError> {
        let chunks = self.chunks.read();
        check_chunk_id(chunk_id, chunks.len() as u64)?;
        Ok(chunks[usize::try_from(chunk_id).map_err(|_| "chunk id exceeds usize::MAX")?].clone())
    }

    fn set(&self, chunk_id: ChunkId, record: ChunkRecord) -> Result<(), StorageError> {
        let mut chunks = self.chunks.write();
        check_chunk_id(chunk_id, chunks.len() as u64)?;
        chunks[usize::try_from(chunk_id).map_err(|_| "chunk id exceeds usize::MAX")?] = record;
        Ok(())
    }

    fn resize(&self, num_chunks: u64, fill: &ChunkRecord) -> Result<(), StorageError> {
        let num_chunks =
            usize::try_from(num_chunks).map_err(|_| "number of chunks exceeds usize::MAX")?;
        self.chunks.write().resize(num_chunks, fill.clone());
        Ok(())
    }

    fn metadata(&self) -> Result<Option<Bytes>, StorageError> {
        Ok(self.metadata.read().clone())
    }

    fn set_metadata(&self, metadata: Bytes) -> Result<(), StorageError> {
        *self.metadata.write() = Some(metadata);
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
