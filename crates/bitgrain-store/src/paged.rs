//! Disk-paged storage for sequences too large to hold in memory.
//!
//! The backing file is a flat array of encoded elements split into
//! fixed-size pages; the page is the unit of I/O. A bounded set of pages is
//! resident at any time. On a miss the least-recently-used page is evicted
//! (flushed first if modified) and the requested page is loaded, zero-filling
//! whatever the file does not yet contain. A fresh sequence is therefore
//! logically all-zero without the file pre-existing at full length, and the
//! resident-set budget bounds peak memory regardless of element count.
//!
//! Eviction and load happen synchronously inside the `get`/`set` that
//! triggered them, under the storage lock, so no caller can observe a
//! half-loaded or half-flushed page.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use bitgrain_error::{GrainError, Result};
use bitgrain_types::{FixedInt, IntKind};
use bitgrain_vfs::{OpenFlags, Vfs, VfsFile};

use crate::sequence::{check_index, check_kind, IndexedSequence};
use crate::StorageConfig;

/// One resident page.
struct PageSlot {
    buf: Vec<u8>,
    dirty: bool,
}

/// Mutable paging state: the open file plus the resident-page table.
struct PagedInner<F> {
    file: F,
    resident: HashMap<u64, PageSlot>,
    /// Recency order, least-recently-used at the front.
    lru: VecDeque<u64>,
}

/// A file-backed sequence with a bounded in-memory page buffer.
pub struct PagedStorage<V: Vfs> {
    kind: IntKind,
    len: u64,
    elem_size: usize,
    /// Page payload size in bytes; a whole multiple of `elem_size`.
    page_bytes: usize,
    elems_per_page: u64,
    /// Maximum number of resident pages.
    capacity: usize,
    vfs: Arc<V>,
    path: PathBuf,
    /// Auto-named temp files are deleted when the sequence is dropped.
    owns_file: bool,
    inner: Mutex<PagedInner<V::File>>,
}

impl<V: Vfs> PagedStorage<V> {
    /// Create a fresh all-zero sequence of `len` elements.
    ///
    /// `path` of `None` backs the sequence with an auto-named temp file that
    /// is deleted on drop. An existing file at a caller-supplied path is
    /// truncated: a new sequence is all-zero by contract.
    pub fn create(
        vfs: Arc<V>,
        path: Option<&Path>,
        kind: IntKind,
        len: u64,
        config: &StorageConfig,
    ) -> Result<Self> {
        Self::build(
            vfs,
            path,
            kind,
            len,
            config,
            OpenFlags::CREATE | OpenFlags::READWRITE | OpenFlags::TRUNCATE,
        )
    }

    /// Reopen a sequence previously persisted at `path`.
    ///
    /// The caller supplies the same kind and length the sequence was created
    /// with; bytes already in the file are preserved.
    pub fn open(
        vfs: Arc<V>,
        path: &Path,
        kind: IntKind,
        len: u64,
        config: &StorageConfig,
    ) -> Result<Self> {
        Self::build(vfs, Some(path), kind, len, config, OpenFlags::READWRITE)
    }

    fn build(
        vfs: Arc<V>,
        path: Option<&Path>,
        kind: IntKind,
        len: u64,
        config: &StorageConfig,
        flags: OpenFlags,
    ) -> Result<Self> {
        let elem_size = kind.encoded_size();
        if len > crate::select::MAX_SEQUENCE_LEN
            || len.checked_mul(elem_size as u64).is_none()
        {
            return Err(GrainError::InvalidSize {
                count: len,
                max: crate::select::MAX_SEQUENCE_LEN,
            });
        }
        // Trim the page to a whole number of elements so none straddles a
        // page boundary; a page always holds at least one element.
        let page_bytes = ((config.page_size / elem_size) * elem_size).max(elem_size);
        let elems_per_page = (page_bytes / elem_size) as u64;
        let capacity = (config.page_budget / page_bytes).max(1);

        let owns_file = path.is_none();
        let (file, resolved) = vfs.open(path, flags)?;
        debug!(
            path = %resolved.display(),
            len,
            kind = %kind,
            page_bytes,
            capacity,
            "paged sequence opened"
        );

        Ok(Self {
            kind,
            len,
            elem_size,
            page_bytes,
            elems_per_page,
            capacity,
            vfs,
            path: resolved,
            owns_file,
            inner: Mutex::new(PagedInner {
                file,
                resident: HashMap::new(),
                lru: VecDeque::new(),
            }),
        })
    }

    /// The path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total length of the fully materialized file in bytes.
    #[inline]
    fn total_bytes(&self) -> u64 {
        self.len * self.elem_size as u64
    }

    /// Byte length of page `page_no` (the final page may be partial).
    fn page_len(&self, page_no: u64) -> usize {
        let start = page_no * self.page_bytes as u64;
        let remaining = self.total_bytes() - start;
        remaining.min(self.page_bytes as u64) as usize
    }

    /// Flush one page to the backing file.
    fn write_page(&self, file: &mut V::File, page_no: u64, slot: &PageSlot) -> Result<()> {
        let offset = page_no * self.page_bytes as u64;
        file.write(&slot.buf, offset)
    }

    /// Make `page_no` resident, evicting the least-recently-used page first
    /// if the buffer is full. On success the page is at the back of the
    /// recency queue.
    fn ensure_resident(&self, inner: &mut PagedInner<V::File>, page_no: u64) -> Result<()> {
        if inner.resident.contains_key(&page_no) {
            // Refresh recency.
            inner.lru.retain(|p| *p != page_no);
            inner.lru.push_back(page_no);
            return Ok(());
        }

        while inner.resident.len() >= self.capacity {
            let victim = inner.lru.front().copied().ok_or_else(|| {
                GrainError::internal("resident page table full but recency queue empty")
            })?;
            let slot = inner
                .resident
                .remove(&victim)
                .ok_or_else(|| GrainError::internal("recency queue out of sync"))?;
            if slot.dirty {
                // Flush before unmapping; if the write fails the page stays
                // resident and dirty, and the error surfaces to the caller.
                if let Err(err) = self.write_page(&mut inner.file, victim, &slot) {
                    inner.resident.insert(victim, slot);
                    return Err(err);
                }
            }
            inner.lru.pop_front();
            debug!(page = victim, "evicted page");
        }

        // Load, zero-filling whatever the file does not yet contain: a
        // never-written page reads as all zeroes.
        let mut buf = vec![0u8; self.page_len(page_no)];
        let offset = page_no * self.page_bytes as u64;
        let _ = inner.file.read(&mut buf, offset)?;
        inner.resident.insert(
            page_no,
            PageSlot {
                buf,
                dirty: false,
            },
        );
        inner.lru.push_back(page_no);
        Ok(())
    }

    /// Write every dirty page to the backing file and sync it.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let PagedInner {
            file, resident, ..
        } = &mut *inner;
        for (&page_no, slot) in resident.iter_mut() {
            if slot.dirty {
                let offset = page_no * self.page_bytes as u64;
                file.write(&slot.buf, offset)?;
                slot.dirty = false;
            }
        }
        file.sync()
    }
}

impl<V: Vfs> IndexedSequence for PagedStorage<V> {
    fn kind(&self) -> IntKind {
        self.kind
    }

    fn size(&self) -> u64 {
        self.len
    }

    fn get(&self, index: u64) -> Result<FixedInt> {
        check_index(index, self.len)?;
        let page_no = index / self.elems_per_page;
        let offset = (index % self.elems_per_page) as usize * self.elem_size;

        let mut inner = self.inner.lock();
        self.ensure_resident(&mut inner, page_no)?;
        let slot = inner
            .resident
            .get(&page_no)
            .ok_or_else(|| GrainError::internal("page vanished after load"))?;
        FixedInt::decode(self.kind, &slot.buf[offset..offset + self.elem_size])
    }

    fn set(&self, index: u64, value: FixedInt) -> Result<()> {
        check_index(index, self.len)?;
        check_kind(self.kind, value.kind())?;
        let page_no = index / self.elems_per_page;
        let offset = (index % self.elems_per_page) as usize * self.elem_size;

        let mut inner = self.inner.lock();
        self.ensure_resident(&mut inner, page_no)?;
        let slot = inner
            .resident
            .get_mut(&page_no)
            .ok_or_else(|| GrainError::internal("page vanished after load"))?;
        value.encode_into(&mut slot.buf[offset..offset + self.elem_size])?;
        slot.dirty = true;
        Ok(())
    }

    fn backing(&self) -> &'static str {
        "paged"
    }
}

impl<V: Vfs> Drop for PagedStorage<V> {
    fn drop(&mut self) {
        if !self.owns_file {
            if let Err(err) = self.flush() {
                warn!(path = %self.path.display(), %err, "flush on drop failed");
            }
            return;
        }
        // Temp-backed: nothing to preserve, just release the file.
        if let Err(err) = self.vfs.delete(&self.path) {
            warn!(path = %self.path.display(), %err, "temp file cleanup failed");
        }
    }
}

impl<V: Vfs> std::fmt::Debug for PagedStorage<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedStorage")
            .field("kind", &self.kind)
            .field("len", &self.len)
            .field("page_bytes", &self.page_bytes)
            .field("capacity", &self.capacity)
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitgrain_vfs::MemoryVfs;

    fn tiny_config() -> StorageConfig {
        // 4 resident pages of 16 bytes each: evictions happen constantly.
        StorageConfig {
            memory_threshold: 0,
            page_size: 16,
            page_budget: 64,
        }
    }

    fn make(kind: IntKind, len: u64) -> PagedStorage<MemoryVfs> {
        PagedStorage::create(Arc::new(MemoryVfs::new()), None, kind, len, &tiny_config()).unwrap()
    }

    #[test]
    fn fresh_sequence_reads_zero_everywhere() {
        let kind = IntKind::signed(16).unwrap();
        let seq = make(kind, 1000);
        for i in [0u64, 1, 499, 999] {
            assert_eq!(seq.get(i).unwrap(), kind.zero());
        }
    }

    #[test]
    fn set_survives_eviction_and_reload() {
        let kind = IntKind::signed(16).unwrap();
        let seq = make(kind, 10_000);

        seq.set(0, FixedInt::from_i128(kind, -42)).unwrap();
        // Touch enough distinct pages to evict page 0 many times over.
        for i in 0..1000u64 {
            let idx = i * 8;
            seq.set(idx, FixedInt::from_i128(kind, i128::from(i as i64 % 100)))
                .unwrap();
        }
        assert_eq!(seq.get(0).unwrap().to_i128(), 0 % 100);

        seq.set(0, FixedInt::from_i128(kind, -42)).unwrap();
        for i in 1..1000u64 {
            let _ = seq.get(i * 8).unwrap();
        }
        assert_eq!(seq.get(0).unwrap().to_i128(), -42);
    }

    #[test]
    fn neighbors_within_page_preserved() {
        let kind = IntKind::unsigned(8).unwrap();
        let seq = make(kind, 64);
        for i in 0..64u64 {
            seq.set(i, FixedInt::from_u128(kind, u128::from(i) * 2 % 256))
                .unwrap();
        }
        for i in 0..64u64 {
            assert_eq!(seq.get(i).unwrap().to_u128(), u128::from(i) * 2 % 256);
        }
    }

    #[test]
    fn wide_elements_round_trip() {
        let kind = IntKind::unsigned(128).unwrap();
        let seq = make(kind, 100);
        seq.set(99, FixedInt::from_u128(kind, u128::MAX)).unwrap();
        seq.set(0, FixedInt::from_u128(kind, 7)).unwrap();
        assert_eq!(seq.get(99).unwrap().to_u128(), u128::MAX);
        assert_eq!(seq.get(0).unwrap().to_u128(), 7);
    }

    #[test]
    fn out_of_bounds() {
        let kind = IntKind::unsigned(8).unwrap();
        let seq = make(kind, 5);
        assert!(matches!(
            seq.get(5),
            Err(GrainError::IndexOutOfBounds { index: 5, len: 5 })
        ));
        assert!(matches!(
            seq.set(u64::MAX, kind.zero()),
            Err(GrainError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn flush_then_reopen_preserves_data() {
        let vfs = Arc::new(MemoryVfs::new());
        let kind = IntKind::signed(32).unwrap();
        let path = Path::new("persist.seq");
        let config = tiny_config();

        {
            let seq =
                PagedStorage::create(Arc::clone(&vfs), Some(path), kind, 100, &config).unwrap();
            seq.set(3, FixedInt::from_i128(kind, 123_456)).unwrap();
            seq.set(97, FixedInt::from_i128(kind, -1)).unwrap();
            seq.flush().unwrap();
        }

        let seq = PagedStorage::open(Arc::clone(&vfs), path, kind, 100, &config).unwrap();
        assert_eq!(seq.get(3).unwrap().to_i128(), 123_456);
        assert_eq!(seq.get(97).unwrap().to_i128(), -1);
        assert_eq!(seq.get(0).unwrap().to_i128(), 0);
    }

    #[test]
    fn temp_file_removed_on_drop() {
        let vfs = Arc::new(MemoryVfs::new());
        let kind = IntKind::unsigned(8).unwrap();
        let path = {
            let seq =
                PagedStorage::create(Arc::clone(&vfs), None, kind, 100, &tiny_config()).unwrap();
            seq.set(50, FixedInt::from_u128(kind, 9)).unwrap();
            seq.path().to_path_buf()
        };
        assert!(!vfs.exists(&path).unwrap());
    }

    #[test]
    fn create_on_existing_path_starts_all_zero() {
        let vfs = Arc::new(MemoryVfs::new());
        let kind = IntKind::unsigned(8).unwrap();
        let path = Path::new("reused.seq");
        let config = tiny_config();

        {
            let seq =
                PagedStorage::create(Arc::clone(&vfs), Some(path), kind, 10, &config).unwrap();
            seq.set(1, FixedInt::from_u128(kind, 200)).unwrap();
            seq.flush().unwrap();
        }
        let seq = PagedStorage::create(Arc::clone(&vfs), Some(path), kind, 10, &config).unwrap();
        assert_eq!(seq.get(1).unwrap().to_u128(), 0);
    }

    #[test]
    fn excessive_length_rejected() {
        let vfs = Arc::new(MemoryVfs::new());
        let kind = IntKind::unsigned(8).unwrap();
        let err = PagedStorage::create(vfs, None, kind, u64::MAX, &tiny_config()).unwrap_err();
        assert!(matches!(err, GrainError::InvalidSize { .. }));
    }
}
