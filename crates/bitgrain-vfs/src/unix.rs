//! Real-filesystem VFS backed by POSIX positional I/O.
//!
//! Reads and writes go through `FileExt::read_at`/`write_at`, so no handle
//! carries seek-position state and concurrent page I/O through clones of the
//! same storage never races on a cursor.

use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use bitgrain_error::{GrainError, Result};

use crate::traits::{OpenFlags, Vfs, VfsFile};

/// A VFS backed by the real Unix filesystem.
#[derive(Debug, Default)]
pub struct UnixVfs;

impl UnixVfs {
    /// Create a new Unix VFS instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn temp_path(&self) -> PathBuf {
        let mut rng_buf = [0u8; 8];
        self.randomness(&mut rng_buf);
        let mut hex = String::with_capacity(16);
        for b in rng_buf {
            let _ = write!(hex, "{b:02x}");
        }
        std::env::temp_dir().join(format!("bitgrain-{hex}.seq"))
    }
}

impl Vfs for UnixVfs {
    type File = UnixFile;

    fn name(&self) -> &'static str {
        "unix"
    }

    fn open(&self, path: Option<&Path>, flags: OpenFlags) -> Result<(Self::File, PathBuf)> {
        let resolved = match path {
            Some(p) => p.to_path_buf(),
            None => self.temp_path(),
        };

        let file = OpenOptions::new()
            .read(true)
            .write(flags.contains(OpenFlags::READWRITE))
            .create(flags.contains(OpenFlags::CREATE))
            .truncate(flags.contains(OpenFlags::TRUNCATE))
            .open(&resolved)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => GrainError::CannotOpen {
                    path: resolved.clone(),
                },
                _ => GrainError::Io(err),
            })?;

        debug!(path = %resolved.display(), ?flags, "opened backing file");
        Ok((UnixFile { file }, resolved))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "deleting backing file");
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(GrainError::FileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => Err(GrainError::Io(err)),
        }
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(path.exists())
    }

    fn randomness(&self, buf: &mut [u8]) {
        // Seed the xorshift stream from wall clock, pid, and a process-wide
        // counter so concurrent temp files never collide in practice.
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        let mut state = u64::from(std::process::id())
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ u64::from(nanos).rotate_left(32)
            ^ COUNTER.fetch_add(1, Ordering::Relaxed).wrapping_mul(0xA24B_AED4_963E_E407);
        for chunk in buf.chunks_mut(8) {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let bytes = state.to_le_bytes();
            for (dst, &src) in chunk.iter_mut().zip(bytes.iter()) {
                *dst = src;
            }
        }
    }
}

/// A file handle on the real filesystem.
#[derive(Debug)]
pub struct UnixFile {
    file: File,
}

impl VfsFile for UnixFile {
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut total = 0usize;
        while total < buf.len() {
            let n = self
                .file
                .read_at(&mut buf[total..], offset + total as u64)?;
            if n == 0 {
                break;
            }
            total += n;
        }
        // Short read: the caller observes zeroes past the end of the file.
        buf[total..].fill(0);
        Ok(total)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    fn truncate(&mut self, size: u64) -> Result<()> {
        self.file.set_len(size)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
