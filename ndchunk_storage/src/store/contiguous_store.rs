//! A single-file chunk store.
//!
//! The file starts with an 8 byte magic header and is followed by append-only entries:
//! ```text
//! [kind: u8][id: u64 LE][len: u32 LE][payload: len bytes]
//! ```
//! where kind is `0` for a chunk, `1` for metadata, and `2` for a truncation to `id` chunks.
//! Later entries supersede earlier ones, and the chunk index is rebuilt by scanning the file on open.
//!
//! Superseded entries are never reclaimed, so the file grows with every write, rewrite and truncation.
//! Copying an array to a new store compacts it.
//!
//! A trailing entry cut short by an interrupted write is discarded on open and the file is truncated to the last complete entry.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::{check_chunk_id, Bytes, ChunkId, ChunkRecord, ChunkStore, StorageError};

const MAGIC: &[u8; 8] = b"NDCHUNK\x01";
const ENTRY_CHUNK: u8 = 0;
const ENTRY_METADATA: u8 = 1;
const ENTRY_TRUNCATE: u8 = 2;
const ENTRY_HEADER_SIZE: usize = 1 + 8 + 4;

#[derive(Debug, Clone, Copy)]
struct EntryLocation {
    offset: u64,
    len: u32,
}

#[derive(Debug)]
struct ContiguousFile {
    file: File,
    end: u64,
    chunks: Vec<EntryLocation>,
    metadata: Option<EntryLocation>,
}

impl ContiguousFile {
    fn write_entry(&mut self, kind: u8, id: u64, payload: &[u8]) -> Result<EntryLocation, StorageError> {
        let len = u32::try_from(payload.len())
            .map_err(|_| StorageError::from("entry exceeds the maximum size of a contiguous store entry"))?;
        let mut entry = Vec::with_capacity(ENTRY_HEADER_SIZE + payload.len());
        entry.push(kind);
        entry.extend_from_slice(&id.to_le_bytes());
        entry.extend_from_slice(&len.to_le_bytes());
        entry.extend_from_slice(payload);

        self.file.seek(SeekFrom::Start(self.end))?;
        self.file.write_all(&entry)?;
        let location = EntryLocation {
            offset: self.end + ENTRY_HEADER_SIZE as u64,
            len,
        };
        self.end += entry.len() as u64;
        Ok(location)
    }

    fn read_entry(&mut self, location: EntryLocation) -> Result<Vec<u8>, StorageError> {
        let mut payload = vec![0; location.len as usize];
        self.file.seek(SeekFrom::Start(location.offset))?;
        self.file.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn append_chunk(&mut self, record: &ChunkRecord) -> Result<ChunkId, StorageError> {
        let chunk_id = self.chunks.len() as u64;
        let location = self.write_entry(ENTRY_CHUNK, chunk_id, &record.to_bytes()?)?;
        self.chunks.push(location);
        Ok(chunk_id)
    }
}

/// A chunk store persisting every chunk to a single contiguous file.
#[derive(Debug)]
pub struct ContiguousChunkStore {
    path: PathBuf,
    inner: Mutex<ContiguousFile>,
}

impl ContiguousChunkStore {
    /// Create a new empty store at `path`, truncating any existing file.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(MAGIC)?;
        log::debug!("created contiguous store at {}", path.display());
        Ok(Self {
            path,
            inner: Mutex::new(ContiguousFile {
                file,
                end: MAGIC.len() as u64,
                chunks: Vec::new(),
                metadata: None,
            }),
        })
    }

    /// Open an existing store at `path`.
    ///
    /// A torn trailing entry is discarded with a warning.
    ///
    /// # Errors
    /// Returns [`StorageError::MissingStore`] if the file does not exist, or [`StorageError::Corrupt`] if it is not a valid contiguous store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(StorageError::MissingStore(path.display().to_string()));
        }
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let file_len = file.metadata()?.len();

        let mut magic = [0u8; 8];
        if file.read_exact(&mut magic).is_err() || &magic != MAGIC {
            return Err(StorageError::Corrupt(format!(
                "{} is not a contiguous chunk store",
                path.display()
            )));
        }

        let mut chunks: Vec<EntryLocation> = Vec::new();
        let mut metadata = None;
        let mut offset = MAGIC.len() as u64;
        let mut header = [0u8; ENTRY_HEADER_SIZE];
        let mut torn = false;
        while offset < file_len {
            if offset + ENTRY_HEADER_SIZE as u64 > file_len {
                torn = true;
                break;
            }
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut header)?;
            let kind = header[0];
            let id = u64::from_le_bytes(header[1..9].try_into().map_err(|_| "invalid entry id")?);
            let len = u32::from_le_bytes(header[9..13].try_into().map_err(|_| "invalid entry length")?);
            let location = EntryLocation {
                offset: offset + ENTRY_HEADER_SIZE as u64,
                len,
            };
            if location.offset + u64::from(len) > file_len {
                torn = true;
                break;
            }
            match kind {
                ENTRY_CHUNK => match usize::try_from(id) {
                    Ok(id) if id < chunks.len() => chunks[id] = location,
                    Ok(id) if id == chunks.len() => chunks.push(location),
                    _ => {
                        return Err(StorageError::Corrupt(format!(
                            "chunk entry {id} at offset {offset} is not contiguous with {} chunks",
                            chunks.len()
                        )))
                    }
                },
                ENTRY_METADATA => metadata = Some(location),
                ENTRY_TRUNCATE => {
                    chunks.truncate(usize::try_from(id).unwrap_or(usize::MAX));
                }
                kind => {
                    return Err(StorageError::Corrupt(format!(
                        "unknown entry kind {kind} at offset {offset}"
                    )))
                }
            }
            offset = location.offset + u64::from(len);
        }
        if torn {
            log::warn!(
                "discarding a torn entry of {} bytes at offset {offset} of {}",
                file_len - offset,
                path.display()
            );
            file.set_len(offset)?;
        }

        log::debug!(
            "opened contiguous store at {} with {} chunks",
            path.display(),
            chunks.len()
        );
        Ok(Self {
            path,
            inner: Mutex::new(ContiguousFile {
                file,
                end: offset,
                chunks,
                metadata,
            }),
        })
    }

    /// Return the path of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkStore for ContiguousChunkStore {
    fn num_chunks(&self) -> u64 {
        self.inner.lock().chunks.len() as u64
    }

    fn append(&self, record: ChunkRecord) -> Result<ChunkId, StorageError> {
        self.inner.lock().append_chunk(&record)
    }

    fn get(&self, chunk_id: ChunkId) -> Result<ChunkRecord, StorageError> {
        let mut inner = self.inner.lock();
        check_chunk_id(chunk_id, inner.chunks.len() as u64)?;
        #[allow(clippy::cast_possible_truncation)]
        let location = inner.chunks[chunk_id as usize];
        let bytes = inner.read_entry(location)?;
        drop(inner);
        ChunkRecord::from_bytes(&bytes)
    }

    fn set(&self, chunk_id: ChunkId, record: ChunkRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        check_chunk_id(chunk_id, inner.chunks.len() as u64)?;
        let location = inner.write_entry(ENTRY_CHUNK, chunk_id, &record.to_bytes()?)?;
        #[allow(clippy::cast_possible_truncation)]
        {
            inner.chunks[chunk_id as usize] = location;
        }
        Ok(())
    }

    fn resize(&self, num_chunks: u64, fill: &ChunkRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let current = inner.chunks.len() as u64;
        if num_chunks < current {
            inner.write_entry(ENTRY_TRUNCATE, num_chunks, &[])?;
            inner
                .chunks
                .truncate(usize::try_from(num_chunks).map_err(|_| "number of chunks exceeds usize::MAX")?);
        } else {
            for _ in current..num_chunks {
                inner.append_chunk(fill)?;
            }
        }
        Ok(())
    }

    fn metadata(&self) -> Result<Option<Bytes>, StorageError> {
        let mut inner = self.inner.lock();
        let metadata = inner.metadata;
        match metadata {
            Some(location) => Ok(Some(Bytes::from(inner.read_entry(location)?))),
            None => Ok(None),
        }
    }

    fn set_metadata(&self, metadata: Bytes) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let location = inner.write_entry(ENTRY_METADATA, 0, &metadata)?;
        inner.metadata = Some(location);
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.file.flush()?;
        inner.file.sync_data()?;
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
