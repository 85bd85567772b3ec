//! Chunk store implementations.

mod contiguous_store;
mod memory_store;
mod sparse_store;

pub use contiguous_store::ContiguousChunkStore;
pub use memory_store::MemoryChunkStore;
pub use sparse_store::SparseChunkStore;
