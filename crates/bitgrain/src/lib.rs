//! bitgrain: fixed-bit-width wrapping integers plus storage that scales
//! past in-memory array limits.
//!
//! The value side is [`FixedInt`]/[`IntKind`]: integers of any width from 1
//! to 128 bits, signed or unsigned, with every arithmetic result reduced
//! into the width's range by modular wraparound. The storage side is
//! [`IndexedSequence`]: up to `2^63 - 1` values addressable by a 64-bit
//! index, transparently backed by packed in-memory words or by disk-paged
//! storage with a bounded resident set.
//!
//! ```
//! use bitgrain::{FixedInt, IndexedSequence, IntKind};
//!
//! let kind = IntKind::signed(5).expect("valid width");
//! let seq = bitgrain::allocate(1000, kind.zero()).expect("allocate");
//! seq.set(999, FixedInt::parse(kind, "42").expect("literal")).expect("set");
//! // 42 wraps into the 5-bit signed window [-16, 16).
//! assert_eq!(seq.get(999).expect("get").to_i128(), 10);
//! ```

pub use bitgrain_error::{GrainError, Result};
pub use bitgrain_store::{
    allocate_with, BitPackedArray, FlatArray, IndexedSequence, PagedStorage, StorageConfig,
    MAX_SEQUENCE_LEN,
};
pub use bitgrain_types::{FixedInt, IntKind, Signedness, Width};
pub use bitgrain_vfs::{MemoryVfs, OpenFlags, Vfs, VfsFile};
#[cfg(unix)]
pub use bitgrain_vfs::UnixVfs;

use std::sync::Arc;

/// Allocate a zero-initialized sequence, taking the element kind from
/// `sample` and using the default [`StorageConfig`].
///
/// Large footprints page to auto-named temp files on the real filesystem;
/// pass a custom VFS and config to [`allocate_with`] for anything else.
#[cfg(unix)]
pub fn allocate(count: u64, sample: FixedInt) -> Result<Box<dyn IndexedSequence>> {
    allocate_with(
        Arc::new(UnixVfs::new()),
        count,
        sample.kind(),
        &StorageConfig::default(),
    )
}
