//! In-memory bit-packed storage for sub-word integer widths.
//!
//! Value `i` of width `W` occupies bits `[i*W, i*W + W)` of a conceptual
//! bitstream, realized LSB-first over an array of `u64` words. A value whose
//! bit range crosses a word boundary is split across the affected words (up
//! to three for widths past 64) and reassembled on read. `set` rewrites only
//! the bits belonging to its index; neighbors packed into the same word are
//! never disturbed.

use parking_lot::Mutex;

use bitgrain_error::{GrainError, Result};
use bitgrain_types::{FixedInt, IntKind};

use crate::sequence::{check_index, check_kind, IndexedSequence};

/// A fixed-length sequence of width-`W` values packed into shared words.
///
/// The word array sits behind a mutex: `set` is a read-modify-write of a
/// shared word, so concurrent writers whose indices land in the same word
/// must serialize. One region for the whole array also keeps the
/// word-straddling case trivially atomic.
pub struct BitPackedArray {
    kind: IntKind,
    len: u64,
    words: Mutex<Vec<u64>>,
}

impl BitPackedArray {
    /// Create a zero-initialized array of `len` elements.
    ///
    /// Fails with `InvalidSize` when the packed footprint does not fit an
    /// in-memory allocation.
    pub fn new(kind: IntKind, len: u64) -> Result<Self> {
        let total_bits = u128::from(len) * u128::from(kind.width().get());
        let word_count = total_bits.div_ceil(64);
        let word_count = usize::try_from(word_count).map_err(|_| GrainError::InvalidSize {
            count: len,
            max: crate::select::MAX_SEQUENCE_LEN,
        })?;
        Ok(Self {
            kind,
            len,
            words: Mutex::new(vec![0u64; word_count]),
        })
    }

    /// Extract `width` bits starting at absolute bit position `bit`.
    fn get_bits(words: &[u64], bit: u128, width: u32) -> u128 {
        let mut out = 0u128;
        let mut got = 0u32;
        let mut word_idx = (bit / 64) as usize;
        let mut bit_in_word = (bit % 64) as u32;
        while got < width {
            let take = (64 - bit_in_word).min(width - got);
            let chunk = (u128::from(words[word_idx]) >> bit_in_word) & ((1u128 << take) - 1);
            out |= chunk << got;
            got += take;
            word_idx += 1;
            bit_in_word = 0;
        }
        out
    }

    /// Overwrite `width` bits starting at absolute bit position `bit`.
    fn set_bits(words: &mut [u64], bit: u128, width: u32, value: u128) {
        let mut put = 0u32;
        let mut word_idx = (bit / 64) as usize;
        let mut bit_in_word = (bit % 64) as u32;
        while put < width {
            let take = (64 - bit_in_word).min(width - put);
            let mask = (((1u128 << take) - 1) as u64) << bit_in_word;
            let chunk = (((value >> put) as u64) << bit_in_word) & mask;
            words[word_idx] = (words[word_idx] & !mask) | chunk;
            put += take;
            word_idx += 1;
            bit_in_word = 0;
        }
    }

    #[inline]
    fn bit_position(&self, index: u64) -> u128 {
        u128::from(index) * u128::from(self.kind.width().get())
    }
}

impl IndexedSequence for BitPackedArray {
    fn kind(&self) -> IntKind {
        self.kind
    }

    fn size(&self) -> u64 {
        self.len
    }

    fn get(&self, index: u64) -> Result<FixedInt> {
        check_index(index, self.len)?;
        let words = self.words.lock();
        let raw = Self::get_bits(
            &words,
            self.bit_position(index),
            u32::from(self.kind.width().get()),
        );
        Ok(FixedInt::from_bits(self.kind, raw))
    }

    fn set(&self, index: u64, value: FixedInt) -> Result<()> {
        check_index(index, self.len)?;
        check_kind(self.kind, value.kind())?;
        let mut words = self.words.lock();
        Self::set_bits(
            &mut words,
            self.bit_position(index),
            u32::from(self.kind.width().get()),
            value.bits(),
        );
        Ok(())
    }

    fn backing(&self) -> &'static str {
        "bit-packed"
    }
}

impl std::fmt::Debug for BitPackedArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitPackedArray")
            .field("kind", &self.kind)
            .field("len", &self.len)
            .finish()
    }
}
