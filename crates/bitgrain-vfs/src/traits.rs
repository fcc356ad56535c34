use std::path::{Path, PathBuf};

use bitgrain_error::Result;

bitflags::bitflags! {
    /// How a backing file should be opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Create the file if it does not exist.
        const CREATE = 1 << 0;
        /// Open for reading and writing.
        const READWRITE = 1 << 1;
        /// Truncate to zero length on open.
        const TRUNCATE = 1 << 2;
    }
}

/// A virtual filesystem implementation.
///
/// Abstracts the file operations paged storage needs, allowing different
/// backends: real files for persistence, in-memory for tests.
pub trait Vfs: Send + Sync {
    /// The file handle type produced by this VFS.
    type File: VfsFile;

    /// The name of this VFS (e.g., "unix", "memory").
    fn name(&self) -> &'static str;

    /// Open a file.
    ///
    /// `path` is `None` for temporary files that should be auto-named.
    /// Returns the opened file and the path it lives at, so callers can
    /// delete auto-named files when they release the sequence.
    fn open(&self, path: Option<&Path>, flags: OpenFlags) -> Result<(Self::File, PathBuf)>;

    /// Delete a file.
    fn delete(&self, path: &Path) -> Result<()>;

    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Fill `buf` with bytes suitable for temporary file naming.
    ///
    /// The default implementation is deterministic (xorshift) for
    /// reproducible tests; real VFS implementations should mix in external
    /// entropy to avoid collisions.
    fn randomness(&self, buf: &mut [u8]) {
        let mut state: u64 = 0x5DEE_CE66_D1A4_F681;
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

/// A file handle opened by a [`Vfs`].
pub trait VfsFile: Send + Sync {
    /// Read up to `buf.len()` bytes starting at byte offset `offset`.
    ///
    /// Returns the number of bytes actually read. On a short read the
    /// remaining bytes in `buf` are zeroed: reads past the end of the file
    /// observe zero-filled content. This is what makes a never-written page
    /// logically zero without the file pre-existing at full length.
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Write `buf` starting at byte offset `offset`, extending the file if
    /// needed.
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()>;

    /// Truncate (or extend with zeros) the file to `size` bytes.
    fn truncate(&mut self, size: u64) -> Result<()>;

    /// Sync the file contents to stable storage.
    fn sync(&mut self) -> Result<()>;

    /// Return the current file size in bytes.
    fn file_size(&self) -> Result<u64>;
}
