//! The fixed-width integer value type and its byte-encoding contract.
//!
//! A [`FixedInt`] carries its [`IntKind`] alongside a canonical bit pattern:
//! the low `W` bits of the backing word hold the value's residue modulo
//! `2^W`, and every bit at or above `W` is zero. Signed interpretation
//! sign-extends on read. Keeping storage canonical means equality, hashing,
//! and the packed-storage encodings all operate on the same bits.

use std::cmp::Ordering;
use std::fmt;

use bitgrain_error::{GrainError, Result};

use crate::{IntKind, Signedness};

/// One integer value of a fixed bit width.
///
/// Construction always reduces modulo `2^W`, so an out-of-range input
/// behaves exactly like a computed overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedInt {
    kind: IntKind,
    bits: u128,
}

impl FixedInt {
    /// Construct from a raw bit pattern, keeping only the low `W` bits.
    #[inline]
    pub fn from_bits(kind: IntKind, bits: u128) -> Self {
        Self {
            kind,
            bits: bits & kind.mask(),
        }
    }

    /// Construct from a signed value, wrapping into the kind's range.
    #[inline]
    pub fn from_i128(kind: IntKind, value: i128) -> Self {
        Self::from_bits(kind, value as u128)
    }

    /// Construct from an unsigned value, wrapping into the kind's range.
    #[inline]
    pub fn from_u128(kind: IntKind, value: u128) -> Self {
        Self::from_bits(kind, value)
    }

    /// The kind this value belongs to.
    #[inline]
    pub const fn kind(self) -> IntKind {
        self.kind
    }

    /// The canonical low-`W`-bit residue.
    #[inline]
    pub const fn bits(self) -> u128 {
        self.bits
    }

    /// The logical value, sign-extended for signed kinds.
    #[inline]
    pub fn to_i128(self) -> i128 {
        if self.kind.is_signed() && self.sign_bit() {
            (self.bits | !self.kind.mask()) as i128
        } else {
            self.bits as i128
        }
    }

    /// The residue as an unsigned value.
    ///
    /// For signed kinds this is the two's-complement bit pattern, not the
    /// magnitude.
    #[inline]
    pub const fn to_u128(self) -> u128 {
        self.bits
    }

    /// Whether the value is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.bits == 0
    }

    /// Whether the value is negative under its kind's interpretation.
    ///
    /// Always false for unsigned kinds.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.kind.is_signed() && self.sign_bit()
    }

    /// The magnitude of the value as an unsigned word.
    ///
    /// Exact even for the signed minimum, whose magnitude `2^(W-1)` does not
    /// fit the signed range but always fits the backing word.
    #[inline]
    pub fn magnitude(self) -> u128 {
        if self.is_negative() {
            self.bits.wrapping_neg() & self.kind.mask()
        } else {
            self.bits
        }
    }

    #[inline]
    fn sign_bit(self) -> bool {
        self.bits >> (self.kind.width().get() - 1) & 1 == 1
    }

    // --- Decimal literals ---

    /// Parse a decimal literal, wrapping into the kind's range.
    ///
    /// Accepts an optional leading `+` or `-`. Digits are folded with
    /// wrapping arithmetic, so a literal of any length reduces to exactly
    /// the residue a computed overflow would produce: `2^W + i` parses to
    /// the same value as `i`.
    pub fn parse(kind: IntKind, text: &str) -> Result<Self> {
        let invalid = || GrainError::InvalidLiteral {
            text: text.to_owned(),
        };

        let (negative, digits) = match text.as_bytes() {
            [b'-', rest @ ..] => (true, rest),
            [b'+', rest @ ..] => (false, rest),
            rest => (false, rest),
        };
        if digits.is_empty() {
            return Err(invalid());
        }

        let mut acc = 0u128;
        for &b in digits {
            if !b.is_ascii_digit() {
                return Err(invalid());
            }
            acc = acc
                .wrapping_mul(10)
                .wrapping_add(u128::from(b - b'0'));
        }
        if negative {
            acc = acc.wrapping_neg();
        }
        Ok(Self::from_bits(kind, acc))
    }

    // --- Byte encoding (shared by all storage backings) ---

    /// Encode into `buf`, little-endian, exactly `encoded_size` bytes.
    ///
    /// Pad bits in the final byte (widths not a multiple of 8) are zero.
    pub fn encode_into(self, buf: &mut [u8]) -> Result<()> {
        let size = self.kind.encoded_size();
        if buf.len() != size {
            return Err(GrainError::internal(format!(
                "encode buffer is {} bytes, kind {} needs {size}",
                buf.len(),
                self.kind
            )));
        }
        buf.copy_from_slice(&self.bits.to_le_bytes()[..size]);
        Ok(())
    }

    /// Decode a value previously written by [`encode_into`](Self::encode_into).
    ///
    /// Pad bits in the final byte are ignored, so a buffer with stale high
    /// bits still decodes to a canonical value.
    pub fn decode(kind: IntKind, buf: &[u8]) -> Result<Self> {
        let size = kind.encoded_size();
        if buf.len() != size {
            return Err(GrainError::ShortRead {
                expected: size,
                actual: buf.len(),
            });
        }
        let mut bytes = [0u8; 16];
        bytes[..size].copy_from_slice(buf);
        Ok(Self::from_bits(kind, u128::from_le_bytes(bytes)))
    }

    /// Compare two values of the same kind by logical value.
    ///
    /// Unsigned comparison is on the raw residue, so high bits of the
    /// backing word never masquerade as a sign.
    #[inline]
    pub fn logical_cmp(self, other: Self) -> Ordering {
        debug_assert_eq!(self.kind, other.kind, "comparing values of different kinds");
        match self.kind.signedness() {
            Signedness::Signed => self.to_i128().cmp(&other.to_i128()),
            Signedness::Unsigned => self.bits.cmp(&other.bits),
        }
    }
}

impl fmt::Display for FixedInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_signed() {
            write!(f, "{}", self.to_i128())
        } else {
            write!(f, "{}", self.bits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(bits: u8) -> IntKind {
        IntKind::signed(bits).unwrap()
    }

    fn u(bits: u8) -> IntKind {
        IntKind::unsigned(bits).unwrap()
    }

    #[test]
    fn construction_reduces_modulo_range() {
        // 5-bit signed: range [-16, 15], 35 ≡ 3 (mod 32).
        assert_eq!(FixedInt::from_i128(s(5), 35).to_i128(), 3);
        // 17 ≡ -15 (mod 32) in the signed window.
        assert_eq!(FixedInt::from_i128(s(5), 17).to_i128(), -15);
        assert_eq!(FixedInt::from_i128(s(5), -16).to_i128(), -16);
        // 5-bit unsigned: 32 wraps to 0.
        assert_eq!(FixedInt::from_u128(u(5), 32).to_u128(), 0);
        assert_eq!(FixedInt::from_i128(u(5), -1).to_u128(), 31);
    }

    #[test]
    fn canonical_bits_are_zero_above_width() {
        let v = FixedInt::from_i128(s(9), -1);
        assert_eq!(v.bits(), 0x1FF);
        assert_eq!(v.to_i128(), -1);
    }

    #[test]
    fn magnitude_of_signed_minimum() {
        let min = s(9).min_value();
        assert_eq!(min.to_i128(), -256);
        assert_eq!(min.magnitude(), 256);
    }

    #[test]
    fn parse_basics() {
        assert_eq!(FixedInt::parse(s(16), "42").unwrap().to_i128(), 42);
        assert_eq!(FixedInt::parse(s(16), "-7").unwrap().to_i128(), -7);
        assert_eq!(FixedInt::parse(s(16), "+7").unwrap().to_i128(), 7);
        assert_eq!(FixedInt::parse(u(8), "255").unwrap().to_u128(), 255);
        // Out-of-range literals wrap like computed overflow.
        assert_eq!(FixedInt::parse(u(8), "256").unwrap().to_u128(), 0);
        assert_eq!(FixedInt::parse(s(8), "128").unwrap().to_i128(), -128);
        assert_eq!(FixedInt::parse(s(8), "-129").unwrap().to_i128(), 127);
    }

    #[test]
    fn parse_rejects_garbage() {
        for text in ["", "-", "+", "12a", "0x10", " 1"] {
            assert!(
                matches!(
                    FixedInt::parse(s(8), text),
                    Err(GrainError::InvalidLiteral { .. })
                ),
                "expected InvalidLiteral for {text:?}"
            );
        }
    }

    #[test]
    fn parse_very_long_literal_wraps_exactly() {
        // 2^64 + 1 reduces to 1 modulo 2^16.
        let v = FixedInt::parse(s(16), "18446744073709551617").unwrap();
        assert_eq!(v.bits(), 1);
        // 10^40 is divisible by 2^40, so it reduces to 0 modulo 2^16.
        let v = FixedInt::parse(u(16), "10000000000000000000000000000000000000000").unwrap();
        assert_eq!(v.bits(), 0);
    }

    #[test]
    fn display_logical_value() {
        assert_eq!(FixedInt::from_i128(s(5), -4).to_string(), "-4");
        assert_eq!(FixedInt::from_u128(u(5), 28).to_string(), "28");
    }

    #[test]
    fn decode_ignores_pad_bits() {
        // 5-bit value encoded in 1 byte; stale pad bits must not survive.
        let raw = [0b1110_0110u8];
        let v = FixedInt::decode(u(5), &raw).unwrap();
        assert_eq!(v.to_u128(), 0b0_0110);
    }

    #[test]
    fn decode_wrong_length_is_short_read() {
        let err = FixedInt::decode(u(16), &[1]).unwrap_err();
        assert!(matches!(
            err,
            GrainError::ShortRead {
                expected: 2,
                actual: 1
            }
        ));
    }

    fn arb_kind() -> impl Strategy<Value = IntKind> {
        (1u8..=128, any::<bool>()).prop_map(|(w, signed)| {
            if signed {
                IntKind::signed(w).unwrap()
            } else {
                IntKind::unsigned(w).unwrap()
            }
        })
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(kind in arb_kind(), raw in any::<u128>()) {
            let v = FixedInt::from_bits(kind, raw);
            let mut buf = vec![0u8; kind.encoded_size()];
            v.encode_into(&mut buf).unwrap();
            let back = FixedInt::decode(kind, &buf).unwrap();
            prop_assert_eq!(v, back);
        }

        #[test]
        fn rollover_multiples_of_range_collapse(kind in arb_kind(), raw in any::<u128>(), k in 0u32..4) {
            // offset + i for offset a multiple of 2^W stores the same value as i.
            let base = FixedInt::from_bits(kind, raw);
            let span = if kind.width().get() == 128 {
                0u128
            } else {
                1u128 << kind.width().get()
            };
            let shifted = FixedInt::from_u128(kind, raw.wrapping_add(span.wrapping_mul(u128::from(k))));
            prop_assert_eq!(base.bits(), shifted.bits());
        }

        #[test]
        fn signed_round_trips_through_i128(kind in arb_kind(), raw in any::<u128>()) {
            let v = FixedInt::from_bits(kind, raw);
            prop_assert_eq!(FixedInt::from_i128(kind, v.to_i128()), v);
        }
    }
}
