use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bitgrain_error::{GrainError, Result};

use crate::traits::{OpenFlags, Vfs, VfsFile};

/// Shared storage for one file in the memory VFS.
#[derive(Debug, Default)]
struct FileStorage {
    data: Vec<u8>,
}

/// Shared state for the entire memory VFS.
#[derive(Debug, Default)]
struct MemoryVfsInner {
    files: HashMap<PathBuf, Arc<Mutex<FileStorage>>>,
    next_temp_id: u64,
}

/// An in-memory VFS for tests and throwaway sequences.
///
/// All files are byte vectors with no persistence. Multiple handles opened
/// through the same `MemoryVfs` instance see the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryVfs {
    inner: Arc<Mutex<MemoryVfsInner>>,
}

impl MemoryVfs {
    /// Create a new empty in-memory VFS.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err() -> GrainError {
    GrainError::internal("MemoryVfs lock poisoned")
}

impl Vfs for MemoryVfs {
    type File = MemoryFile;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, path: Option<&Path>, flags: OpenFlags) -> Result<(Self::File, PathBuf)> {
        let mut inner = self.inner.lock().map_err(|_| lock_err())?;

        let resolved = if let Some(p) = path {
            p.to_path_buf()
        } else {
            let id = inner.next_temp_id;
            inner.next_temp_id += 1;
            PathBuf::from(format!("__temp_{id}__"))
        };

        let storage = if let Some(existing) = inner.files.get(&resolved) {
            Arc::clone(existing)
        } else if flags.contains(OpenFlags::CREATE) {
            let storage = Arc::new(Mutex::new(FileStorage::default()));
            inner.files.insert(resolved.clone(), Arc::clone(&storage));
            storage
        } else {
            return Err(GrainError::CannotOpen {
                path: resolved.clone(),
            });
        };
        drop(inner);

        if flags.contains(OpenFlags::TRUNCATE) {
            storage.lock().map_err(|_| lock_err())?.data.clear();
        }

        Ok((MemoryFile { storage }, resolved))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_err())?;
        if inner.files.remove(path).is_none() {
            return Err(GrainError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        let inner = self.inner.lock().map_err(|_| lock_err())?;
        Ok(inner.files.contains_key(path))
    }
}

/// A handle to a file stored in a [`MemoryVfs`].
#[derive(Debug)]
pub struct MemoryFile {
    storage: Arc<Mutex<FileStorage>>,
}

impl VfsFile for MemoryFile {
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let storage = self.storage.lock().map_err(|_| lock_err())?;
        let len = storage.data.len() as u64;
        if offset >= len {
            buf.fill(0);
            return Ok(0);
        }
        let start = offset as usize;
        let available = storage.data.len() - start;
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&storage.data[start..start + n]);
        buf[n..].fill(0);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let mut storage = self.storage.lock().map_err(|_| lock_err())?;
        let end = offset as usize + buf.len();
        if storage.data.len() < end {
            storage.data.resize(end, 0);
        }
        storage.data[offset as usize..end].copy_from_slice(buf);
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        let mut storage = self.storage.lock().map_err(|_| lock_err())?;
        storage.data.resize(size as usize, 0);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn file_size(&self) -> Result<u64> {
        let storage = self.storage.lock().map_err(|_| lock_err())?;
        Ok(storage.data.len() as u64)
    }
}
