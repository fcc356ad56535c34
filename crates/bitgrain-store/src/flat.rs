//! Flat byte-array storage for byte-aligned widths.
//!
//! When `W` is a multiple of 8 there is nothing to pack: element `i` owns
//! bytes `[i*S, (i+1)*S)` outright, with `S = encoded_size`. One contiguous
//! buffer plus the shared encode/decode contract is the whole
//! implementation.

use parking_lot::Mutex;

use bitgrain_error::{GrainError, Result};
use bitgrain_types::{FixedInt, IntKind};

use crate::sequence::{check_index, check_kind, IndexedSequence};

/// A fixed-length sequence stored one encoded element per slot.
pub struct FlatArray {
    kind: IntKind,
    len: u64,
    elem_size: usize,
    bytes: Mutex<Vec<u8>>,
}

impl FlatArray {
    /// Create a zero-initialized array of `len` elements.
    ///
    /// Valid for any kind (non-byte-aligned widths simply carry pad bits),
    /// but the allocation policy only picks it for byte-aligned ones.
    pub fn new(kind: IntKind, len: u64) -> Result<Self> {
        let elem_size = kind.encoded_size();
        let total = u128::from(len) * elem_size as u128;
        let total = usize::try_from(total).map_err(|_| GrainError::InvalidSize {
            count: len,
            max: crate::select::MAX_SEQUENCE_LEN,
        })?;
        Ok(Self {
            kind,
            len,
            elem_size,
            bytes: Mutex::new(vec![0u8; total]),
        })
    }

    #[inline]
    fn byte_range(&self, index: u64) -> std::ops::Range<usize> {
        let start = index as usize * self.elem_size;
        start..start + self.elem_size
    }
}

impl IndexedSequence for FlatArray {
    fn kind(&self) -> IntKind {
        self.kind
    }

    fn size(&self) -> u64 {
        self.len
    }

    fn get(&self, index: u64) -> Result<FixedInt> {
        check_index(index, self.len)?;
        let bytes = self.bytes.lock();
        FixedInt::decode(self.kind, &bytes[self.byte_range(index)])
    }

    fn set(&self, index: u64, value: FixedInt) -> Result<()> {
        check_index(index, self.len)?;
        check_kind(self.kind, value.kind())?;
        let mut bytes = self.bytes.lock();
        let range = self.byte_range(index);
        value.encode_into(&mut bytes[range])
    }

    fn backing(&self) -> &'static str {
        "flat"
    }
}

impl std::fmt::Debug for FlatArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatArray")
            .field("kind", &self.kind)
            .field("len", &self.len)
            .finish()
    }
}
