pub mod flat;
pub mod packed;
pub mod paged;
pub mod select;
pub mod sequence;

pub use flat::FlatArray;
pub use packed::BitPackedArray;
pub use paged::PagedStorage;
pub use select::{allocate_with, MAX_SEQUENCE_LEN};
pub use sequence::IndexedSequence;

/// Tuning knobs for sequence allocation and paged storage.
///
/// The defaults keep small sequences entirely in memory and bound a paged
/// sequence's resident set regardless of its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StorageConfig {
    /// Largest in-memory footprint, in bytes, before an allocation is
    /// backed by disk instead.
    pub memory_threshold: u64,
    /// Byte size of one disk page. Rounded down to a whole number of
    /// elements at construction so no element straddles a page.
    pub page_size: usize,
    /// In-memory budget, in bytes, for resident pages of one paged
    /// sequence.
    pub page_budget: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            memory_threshold: 1 << 26, // 64 MiB
            page_size: 2048,
            page_budget: 1 << 20, // 1 MiB of resident pages
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = StorageConfig::default();
        assert!(config.page_size <= config.page_budget);
        assert!(config.page_budget as u64 <= config.memory_threshold);
    }
}
