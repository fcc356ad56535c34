//! Allocation policy: pick a backing for a requested sequence.
//!
//! Small footprints stay in memory: a flat byte array when the width is
//! byte-aligned, a bit-packed word array otherwise. Anything past the
//! configured threshold goes to disk-paged storage on an auto-named temp
//! file. Callers only ever see the [`IndexedSequence`] contract.

use std::sync::Arc;

use tracing::debug;

use bitgrain_error::{GrainError, Result};
use bitgrain_types::IntKind;
use bitgrain_vfs::Vfs;

use crate::flat::FlatArray;
use crate::packed::BitPackedArray;
use crate::paged::PagedStorage;
use crate::sequence::IndexedSequence;
use crate::StorageConfig;

/// The largest allowed element count: `2^63 - 1`.
///
/// The unsigned argument makes negative requests unrepresentable; requests
/// past the signed-64-bit ceiling fail with `InvalidSize`.
pub const MAX_SEQUENCE_LEN: u64 = i64::MAX as u64;

/// Allocate a zero-initialized sequence of `count` elements of `kind`.
///
/// The footprint `count * encoded_size` decides the backing: within
/// `config.memory_threshold` it stays in memory, otherwise it is paged to
/// disk through `vfs` with peak residency bounded by `config.page_budget`.
pub fn allocate_with<V: Vfs + 'static>(
    vfs: Arc<V>,
    count: u64,
    kind: IntKind,
    config: &StorageConfig,
) -> Result<Box<dyn IndexedSequence>> {
    if count > MAX_SEQUENCE_LEN {
        return Err(GrainError::InvalidSize {
            count,
            max: MAX_SEQUENCE_LEN,
        });
    }

    let footprint = u128::from(count) * kind.encoded_size() as u128;
    let seq: Box<dyn IndexedSequence> = if footprint <= u128::from(config.memory_threshold) {
        if kind.width().get() % 8 == 0 {
            Box::new(FlatArray::new(kind, count)?)
        } else {
            Box::new(BitPackedArray::new(kind, count)?)
        }
    } else {
        Box::new(PagedStorage::create(vfs, None, kind, count, config)?)
    };
    debug!(count, kind = %kind, backing = seq.backing(), "allocated sequence");
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitgrain_types::FixedInt;
    use bitgrain_vfs::MemoryVfs;

    fn alloc(count: u64, kind: IntKind, config: &StorageConfig) -> Box<dyn IndexedSequence> {
        allocate_with(Arc::new(MemoryVfs::new()), count, kind, config).unwrap()
    }

    #[test]
    fn byte_aligned_widths_get_flat_backing() {
        let config = StorageConfig::default();
        let seq = alloc(100, IntKind::unsigned(16).unwrap(), &config);
        assert_eq!(seq.backing(), "flat");
    }

    #[test]
    fn odd_widths_get_bit_packed_backing() {
        let config = StorageConfig::default();
        let seq = alloc(100, IntKind::signed(5).unwrap(), &config);
        assert_eq!(seq.backing(), "bit-packed");
    }

    #[test]
    fn large_footprints_get_paged_backing() {
        let config = StorageConfig {
            memory_threshold: 1024,
            ..StorageConfig::default()
        };
        let kind = IntKind::unsigned(16).unwrap();
        let seq = alloc(10_000, kind, &config);
        assert_eq!(seq.backing(), "paged");
        assert_eq!(seq.size(), 10_000);
        // Still zero-initialized and writable through the same contract.
        assert_eq!(seq.get(9_999).unwrap(), kind.zero());
        seq.set(9_999, FixedInt::from_u128(kind, 4)).unwrap();
        assert_eq!(seq.get(9_999).unwrap().to_u128(), 4);
    }

    #[test]
    fn footprint_exactly_at_threshold_stays_in_memory() {
        let kind = IntKind::unsigned(8).unwrap();
        let config = StorageConfig {
            memory_threshold: 100,
            ..StorageConfig::default()
        };
        assert_eq!(alloc(100, kind, &config).backing(), "flat");
        assert_eq!(alloc(101, kind, &config).backing(), "paged");
    }

    #[test]
    fn excessive_count_fails() {
        let err = allocate_with(
            Arc::new(MemoryVfs::new()),
            MAX_SEQUENCE_LEN + 1,
            IntKind::unsigned(8).unwrap(),
            &StorageConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            GrainError::InvalidSize { count, max }
                if count == MAX_SEQUENCE_LEN + 1 && max == MAX_SEQUENCE_LEN
        ));
    }

    #[test]
    fn zero_length_sequence_is_valid_but_unindexable() {
        let seq = alloc(
            0,
            IntKind::unsigned(8).unwrap(),
            &StorageConfig::default(),
        );
        assert_eq!(seq.size(), 0);
        assert!(matches!(
            seq.get(0),
            Err(GrainError::IndexOutOfBounds { .. })
        ));
    }
}
