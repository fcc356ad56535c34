use bitgrain_error::{GrainError, Result};
use bitgrain_types::{FixedInt, IntKind};

/// The uniform random-access contract shared by every storage backing.
///
/// A sequence holds up to `2^63 - 1` values of one [`IntKind`], addressable
/// by a 64-bit index. Methods take `&self`: backings use interior locking so
/// one sequence can be shared across worker threads.
pub trait IndexedSequence: Send + Sync {
    /// The integer kind every element of this sequence has.
    fn kind(&self) -> IntKind;

    /// Number of elements, fixed at construction.
    fn size(&self) -> u64;

    /// Read the element at `index`.
    fn get(&self, index: u64) -> Result<FixedInt>;

    /// Replace the element at `index`.
    fn set(&self, index: u64, value: FixedInt) -> Result<()>;

    /// A short static name for the backing ("flat", "bit-packed", "paged"),
    /// for diagnostics.
    fn backing(&self) -> &'static str;
}

/// Bounds check shared by all backings.
#[inline]
pub(crate) fn check_index(index: u64, len: u64) -> Result<()> {
    if index >= len {
        return Err(GrainError::IndexOutOfBounds { index, len });
    }
    Ok(())
}

/// Kind check applied on every `set`.
#[inline]
pub(crate) fn check_kind(expected: IntKind, actual: IntKind) -> Result<()> {
    if expected != actual {
        return Err(GrainError::KindMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
