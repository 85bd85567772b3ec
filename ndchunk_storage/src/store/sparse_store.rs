//! A directory chunk store with one file per chunk.
//!
//! ```text
//! <path>/metadata.json
//! <path>/chunks/0.chunk
//! <path>/chunks/1.chunk
//! ...
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::{check_chunk_id, Bytes, ChunkId, ChunkRecord, ChunkStore, StorageError};

const METADATA_FILE: &str = "metadata.json";
const CHUNKS_DIR: &str = "chunks";
const CHUNK_EXTENSION: &str = "chunk";

/// A chunk store persisting every chunk to its own file in a directory.
#[derive(Debug)]
pub struct SparseChunkStore {
    path: PathBuf,
    num_chunks: RwLock<u64>,
    files: Mutex<HashMap<ChunkId, Arc<RwLock<()>>>>,
}

impl SparseChunkStore {
    /// Create a new empty store in the directory `path`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let chunks_path = path.join(CHUNKS_DIR);
        if chunks_path.exists() {
            std::fs::remove_dir_all(&chunks_path)?;
        }
        std::fs::create_dir_all(&chunks_path)?;
        log::debug!("created sparse store at {}", path.display());
        Ok(Self {
            path,
            num_chunks: RwLock::new(0),
            files: Mutex::default(),
        })
    }

    /// Open an existing store in the directory `path`.
    ///
    /// # Errors
    /// Returns [`StorageError::MissingStore`] if the directory does not exist, or [`StorageError::Corrupt`] if the chunk files are not numbered contiguously from zero.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let chunks_path = path.join(CHUNKS_DIR);
        if !chunks_path.is_dir() {
            return Err(StorageError::MissingStore(path.display().to_string()));
        }

        let mut chunk_ids = Vec::new();
        for entry in std::fs::read_dir(&chunks_path)? {
            let entry_path = entry?.path();
            let chunk_id = entry_path
                .extension()
                .filter(|extension| *extension == CHUNK_EXTENSION)
                .and_then(|_| entry_path.file_stem())
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<ChunkId>().ok())
                .ok_or_else(|| {
                    StorageError::Corrupt(format!(
                        "unexpected file {} in sparse store",
                        entry_path.display()
                    ))
                })?;
            chunk_ids.push(chunk_id);
        }
        chunk_ids.sort_unstable();
        if let Some((position, chunk_id)) = chunk_ids
            .iter()
            .enumerate()
            .find(|(position, chunk_id)| *position as u64 != **chunk_id)
        {
            return Err(StorageError::Corrupt(format!(
                "sparse store is missing chunk {position}, found chunk {chunk_id}"
            )));
        }

        log::debug!(
            "opened sparse store at {} with {} chunks",
            path.display(),
            chunk_ids.len()
        );
        Ok(Self {
            path,
            num_chunks: RwLock::new(chunk_ids.len() as u64),
            files: Mutex::default(),
        })
    }

    /// Return the path of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the path of the file holding the chunk at `chunk_id`.
    #[must_use]
    pub fn chunk_path(&self, chunk_id: ChunkId) -> PathBuf {
        self.path
            .join(CHUNKS_DIR)
            .join(format!("{chunk_id}.{CHUNK_EXTENSION}"))
    }

    fn get_file_mutex(&self, chunk_id: ChunkId) -> Arc<RwLock<()>> {
        let mut files = self.files.lock();
        let file = files
            .entry(chunk_id)
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone();
        drop(files);
        file
    }

    fn write_chunk(&self, chunk_id: ChunkId, record: &ChunkRecord) -> Result<(), StorageError> {
        let file = self.get_file_mutex(chunk_id);
        let _lock = file.write();
        std::fs::write(self.chunk_path(chunk_id), record.to_bytes()?)?;
        Ok(())
    }
}

impl ChunkStore for SparseChunkStore {
    fn num_chunks(&self) -> u64 {
        *self.num_chunks.read()
    }

    fn append(&self, record: ChunkRecord) -> Result<ChunkId, StorageError> {
        let mut num_chunks = self.num_chunks.write();
        let chunk_id = *num_chunks;
        self.write_chunk(chunk_id, &record)?;
        *num_chunks += 1;
        Ok(chunk_id)
    }

    fn get(&self, chunk_id: ChunkId) -> Result<ChunkRecord, StorageError> {
        check_chunk_id(chunk_id, self.num_chunks())?;
        let file = self.get_file_mutex(chunk_id);
        let bytes = {
            let _lock = file.read();
            std::fs::read(self.chunk_path(chunk_id))?
        };
        ChunkRecord::from_bytes(&bytes)
    }

    fn set(&self, chunk_id: ChunkId, record: ChunkRecord) -> Result<(), StorageError> {
        let num_chunks = self.num_chunks.read();
        check_chunk_id(chunk_id, *num_chunks)?;
        self.write_chunk(chunk_id, &record)
    }

    fn resize(&self, num_chunks: u64, fill: &ChunkRecord) -> Result<(), StorageError> {
        let mut current = self.num_chunks.write();
        while *current > num_chunks {
            let chunk_id = *current - 1;
            let file = self.get_file_mutex(chunk_id);
            let _lock = file.write();
            std::fs::remove_file(self.chunk_path(chunk_id))?;
            *current -= 1;
        }
        while *current < num_chunks {
            self.write_chunk(*current, fill)?;
            *current += 1;
        }
        Ok(())
    }

    fn metadata(&self) -> Result<Option<Bytes>, StorageError> {
        match std::fs::read(self.path.join(METADATA_FILE)) {
            Ok(metadata) => Ok(Some(Bytes::from(metadata))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_metadata(&self, metadata: Bytes) -> Result<(), StorageError> {
        std::fs::write(self.path.join(METADATA_FILE), metadata)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
