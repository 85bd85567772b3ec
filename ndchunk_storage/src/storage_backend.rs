use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::store::{ContiguousChunkStore, MemoryChunkStore, SparseChunkStore};
use crate::{ChunkStorage, StorageError};

/// The selection of a chunk store back-end.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StorageBackend {
    /// Chunks are held in memory and discarded when the store is dropped.
    #[default]
    Memory,
    /// Chunks are persisted to a single contiguous file.
    Contiguous(PathBuf),
    /// Chunks are persisted to a directory with one file per chunk.
    Sparse(PathBuf),
}

impl StorageBackend {
    /// Return the path of a persistent back-end.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Memory => None,
            Self::Contiguous(path) | Self::Sparse(path) => Some(path),
        }
    }

    /// Returns true if the back-end persists chunks beyond the lifetime of the store.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.path().is_some()
    }

    /// Returns true if both back-ends are persistent and resolve to the same location on disk.
    ///
    /// Paths are compared after resolving `.`, `..` and symbolic links, so differently spelled paths to one store are equal.
    #[must_use]
    pub fn shares_path(&self, other: &Self) -> bool {
        match (self.path(), other.path()) {
            (Some(path), Some(other)) => canonical_path(path) == canonical_path(other),
            _ => false,
        }
    }

    /// Create a new empty store, replacing any existing store at the same path.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store cannot be created.
    pub fn create(&self) -> Result<ChunkStorage, StorageError> {
        self.remove()?;
        Ok(match self {
            Self::Memory => Arc::new(MemoryChunkStore::new()),
            Self::Contiguous(path) => Arc::new(ContiguousChunkStore::create(path)?),
            Self::Sparse(path) => Arc::new(SparseChunkStore::create(path)?),
        })
    }

    /// Open an existing store.
    ///
    /// # Errors
    /// Returns [`StorageError::Unsupported`] for [`StorageBackend::Memory`], [`StorageError::MissingStore`] if there is no store at the path, or another [`StorageError`] if it cannot be read.
    pub fn open(&self) -> Result<ChunkStorage, StorageError> {
        Ok(match self {
            Self::Memory => {
                return Err(StorageError::Unsupported(
                    "a memory store cannot be reopened".to_string(),
                ))
            }
            Self::Contiguous(path) => Arc::new(ContiguousChunkStore::open(path)?),
            Self::Sparse(path) => Arc::new(SparseChunkStore::open(path)?),
        })
    }

    /// Remove the store at the path of a persistent back-end.
    ///
    /// A missing store is not an error.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store exists but cannot be removed.
    pub fn remove(&self) -> Result<(), StorageError> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => {
                log::debug!("removed store at {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Resolve `path` to an absolute path without symbolic links.
///
/// A path that does not exist yet is resolved through its parent directory.
fn canonical_path(path: &Path) -> PathBuf {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let resolved = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize().ok().map(|parent| parent.join(name)),
        _ => None,
    };
    resolved.unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_shares_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = dir.path().join("array");
        std::fs::create_dir(&store).unwrap();
        std::fs::create_dir(dir.path().join("other")).unwrap();
        let sparse = StorageBackend::Sparse(store.clone());

        assert!(sparse.shares_path(&StorageBackend::Sparse(store.clone())));
        assert!(sparse.shares_path(&StorageBackend::Sparse(dir.path().join(".").join("array"))));
        assert!(sparse.shares_path(&StorageBackend::Sparse(
            dir.path().join("other").join("..").join("array")
        )));
        // Creating either back-end replaces whatever is at the path
        assert!(sparse.shares_path(&StorageBackend::Contiguous(store.clone())));

        assert!(!sparse.shares_path(&StorageBackend::Sparse(dir.path().join("copy"))));
        assert!(!sparse.shares_path(&StorageBackend::Memory));
        assert!(!StorageBackend::Memory.shares_path(&StorageBackend::Memory));

        // A store that does not exist yet
        let missing = StorageBackend::Contiguous(dir.path().join("missing.ndchunk"));
        assert!(missing.shares_path(&StorageBackend::Contiguous(
            dir.path().join(".").join("missing.ndchunk")
        )));
    }
}
