//! Wrapping arithmetic over [`IntKind`] operands.
//!
//! Every operation reduces its result into the kind's range by modular
//! wraparound, never by saturation and never by silently widening. The only
//! failures are the ones the value range forces: negation/absolute-value of
//! the signed minimum, division by zero, signed `MIN / -1`, `0^0`, and
//! negative exponents.
//!
//! All operations are pure and allocation-free. Binary operands must share
//! the kind; mixing kinds is a caller bug and is debug-asserted.

use std::cmp::Ordering;

use bitgrain_error::{GrainError, Result};

use crate::{FixedInt, IntKind, Signedness};

impl IntKind {
    #[inline]
    fn check_operands(self, a: FixedInt, b: FixedInt) {
        debug_assert_eq!(a.kind(), self, "left operand kind mismatch");
        debug_assert_eq!(b.kind(), self, "right operand kind mismatch");
    }

    // --- Ring operations (infallible, always wrap) ---

    /// Wrapping addition: `(a + b) mod 2^W`.
    #[inline]
    pub fn add(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        FixedInt::from_bits(self, a.bits().wrapping_add(b.bits()))
    }

    /// Wrapping subtraction: `(a - b) mod 2^W`.
    #[inline]
    pub fn sub(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        FixedInt::from_bits(self, a.bits().wrapping_sub(b.bits()))
    }

    /// Wrapping multiplication: `(a * b) mod 2^W`.
    ///
    /// The backing word is at least as wide as `W`, and `2^W` divides
    /// `2^128`, so reducing the wrapped 128-bit product reduces the exact
    /// product.
    #[inline]
    pub fn mul(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        FixedInt::from_bits(self, a.bits().wrapping_mul(b.bits()))
    }

    /// Successor, wrapping at the top of the range (`max → min`).
    #[inline]
    pub fn succ(self, a: FixedInt) -> FixedInt {
        debug_assert_eq!(a.kind(), self);
        FixedInt::from_bits(self, a.bits().wrapping_add(1))
    }

    /// Predecessor, wrapping at the bottom of the range (`min → max`).
    #[inline]
    pub fn pred(self, a: FixedInt) -> FixedInt {
        debug_assert_eq!(a.kind(), self);
        FixedInt::from_bits(self, a.bits().wrapping_sub(1))
    }

    // --- Negation / absolute value ---

    /// Exact negation.
    ///
    /// Fails with `UnrepresentableValue` for the signed minimum, whose
    /// negation does not fit in `W` bits. Unsigned negation is the additive
    /// inverse modulo `2^W` and never fails.
    pub fn neg(self, a: FixedInt) -> Result<FixedInt> {
        debug_assert_eq!(a.kind(), self);
        if self.is_signed() && a == self.min_value() {
            return Err(GrainError::unrepresentable("negate", self.width().get()));
        }
        Ok(FixedInt::from_bits(self, a.bits().wrapping_neg()))
    }

    /// Exact absolute value.
    ///
    /// Identity for unsigned kinds; fails with `UnrepresentableValue` for
    /// the signed minimum.
    pub fn abs(self, a: FixedInt) -> Result<FixedInt> {
        debug_assert_eq!(a.kind(), self);
        if !a.is_negative() {
            return Ok(a);
        }
        if a == self.min_value() {
            return Err(GrainError::unrepresentable("abs", self.width().get()));
        }
        Ok(FixedInt::from_bits(self, a.bits().wrapping_neg()))
    }

    // --- Division ---

    /// Truncating division (quotient rounds toward zero).
    ///
    /// Fails with `DivisionByZero` for a zero divisor and with
    /// `UnrepresentableValue` for signed `MIN / -1`.
    pub fn div(self, a: FixedInt, b: FixedInt) -> Result<FixedInt> {
        self.check_operands(a, b);
        if b.is_zero() {
            return Err(GrainError::DivisionByZero);
        }
        match self.signedness() {
            Signedness::Signed => {
                if a == self.min_value() && b.to_i128() == -1 {
                    return Err(GrainError::unrepresentable("divide", self.width().get()));
                }
                Ok(FixedInt::from_i128(self, a.to_i128() / b.to_i128()))
            }
            Signedness::Unsigned => Ok(FixedInt::from_u128(self, a.bits() / b.bits())),
        }
    }

    /// Remainder of truncating division; the sign follows the dividend.
    ///
    /// Fails exactly where [`div`](Self::div) fails: the remainder is
    /// defined through the quotient, and for signed `MIN % -1` the quotient
    /// does not exist in-width.
    pub fn rem(self, a: FixedInt, b: FixedInt) -> Result<FixedInt> {
        self.check_operands(a, b);
        if b.is_zero() {
            return Err(GrainError::DivisionByZero);
        }
        match self.signedness() {
            Signedness::Signed => {
                if a == self.min_value() && b.to_i128() == -1 {
                    return Err(GrainError::unrepresentable("modulo", self.width().get()));
                }
                Ok(FixedInt::from_i128(self, a.to_i128() % b.to_i128()))
            }
            Signedness::Unsigned => Ok(FixedInt::from_u128(self, a.bits() % b.bits())),
        }
    }

    // --- Power ---

    /// Integer power with a non-negative exponent, by repeated wrapping
    /// multiplication (square-and-multiply).
    ///
    /// `0^0` fails with `UndefinedResult`; a negative exponent fails with
    /// `InvalidExponent`. Any nonzero base to the power 0 is the kind's
    /// (wrapped) one.
    pub fn pow(self, base: FixedInt, exponent: i64) -> Result<FixedInt> {
        debug_assert_eq!(base.kind(), self);
        if exponent < 0 {
            return Err(GrainError::InvalidExponent { exponent });
        }
        if base.is_zero() && exponent == 0 {
            return Err(GrainError::UndefinedResult);
        }

        let mut result = self.one();
        let mut square = base;
        let mut e = exponent as u64;
        while e > 0 {
            if e & 1 == 1 {
                result = self.mul(result, square);
            }
            e >>= 1;
            if e > 0 {
                square = self.mul(square, square);
            }
        }
        Ok(result)
    }

    // --- Shifts ---

    /// Left shift. Negative counts redirect to the arithmetic right shift;
    /// non-negative counts are reduced modulo `W`.
    pub fn shl(self, a: FixedInt, count: i32) -> FixedInt {
        debug_assert_eq!(a.kind(), self);
        if count < 0 {
            return self.shr_by(a, count.unsigned_abs());
        }
        self.shl_by(a, count as u32)
    }

    /// Arithmetic right shift: sign-extends for signed kinds, zero-fills
    /// for unsigned. Negative counts redirect to the left shift. Shifting
    /// by `W` or more converges to 0 (non-negative) or -1 (negative).
    pub fn shr(self, a: FixedInt, count: i32) -> FixedInt {
        debug_assert_eq!(a.kind(), self);
        if count < 0 {
            return self.shl_by(a, count.unsigned_abs());
        }
        self.shr_by(a, count as u32)
    }

    /// Logical right shift: always zero-fills, for signed kinds too.
    /// Negative counts redirect to the left shift.
    pub fn shr_unsigned(self, a: FixedInt, count: i32) -> FixedInt {
        debug_assert_eq!(a.kind(), self);
        if count < 0 {
            return self.shl_by(a, count.unsigned_abs());
        }
        let w = u32::from(self.width().get());
        if count as u32 >= w {
            return self.zero();
        }
        FixedInt::from_bits(self, a.bits() >> count)
    }

    #[inline]
    fn shl_by(self, a: FixedInt, count: u32) -> FixedInt {
        let n = count % u32::from(self.width().get());
        FixedInt::from_bits(self, a.bits() << n)
    }

    #[inline]
    fn shr_by(self, a: FixedInt, count: u32) -> FixedInt {
        let w = u32::from(self.width().get());
        match self.signedness() {
            // Shift the sign-extended logical value; i128 >> saturates the
            // sign bit in, so counts past W converge to 0 or -1.
            Signedness::Signed => FixedInt::from_i128(self, a.to_i128() >> count.min(127)),
            Signedness::Unsigned => {
                if count >= w {
                    self.zero()
                } else {
                    FixedInt::from_bits(self, a.bits() >> count)
                }
            }
        }
    }

    // --- Bitwise operations ---

    /// Bitwise AND.
    #[inline]
    pub fn bit_and(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        FixedInt::from_bits(self, a.bits() & b.bits())
    }

    /// Bitwise OR.
    #[inline]
    pub fn bit_or(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        FixedInt::from_bits(self, a.bits() | b.bits())
    }

    /// Bitwise XOR.
    #[inline]
    pub fn bit_xor(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        FixedInt::from_bits(self, a.bits() ^ b.bits())
    }

    /// Bitwise NOT within the width.
    #[inline]
    pub fn bit_not(self, a: FixedInt) -> FixedInt {
        debug_assert_eq!(a.kind(), self);
        FixedInt::from_bits(self, !a.bits())
    }

    // --- Ordering ---

    /// Compare two values by logical value.
    ///
    /// Unsigned comparison works on the canonical residue, so the backing
    /// word's high bits never leak a phantom sign.
    #[inline]
    pub fn compare(self, a: FixedInt, b: FixedInt) -> Ordering {
        self.check_operands(a, b);
        a.logical_cmp(b)
    }

    /// `a < b`.
    #[inline]
    pub fn is_less(self, a: FixedInt, b: FixedInt) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// `a <= b`.
    #[inline]
    pub fn is_less_equal(self, a: FixedInt, b: FixedInt) -> bool {
        self.compare(a, b) != Ordering::Greater
    }

    /// `a > b`.
    #[inline]
    pub fn is_greater(self, a: FixedInt, b: FixedInt) -> bool {
        self.compare(a, b) == Ordering::Greater
    }

    /// `a >= b`.
    #[inline]
    pub fn is_greater_equal(self, a: FixedInt, b: FixedInt) -> bool {
        self.compare(a, b) != Ordering::Less
    }

    /// `a == b` by logical value.
    #[inline]
    pub fn is_equal(self, a: FixedInt, b: FixedInt) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    /// `a != b` by logical value.
    #[inline]
    pub fn is_not_equal(self, a: FixedInt, b: FixedInt) -> bool {
        !self.is_equal(a, b)
    }

    /// The smaller of two values.
    #[inline]
    pub fn min(self, a: FixedInt, b: FixedInt) -> FixedInt {
        if self.is_less_equal(a, b) { a } else { b }
    }

    /// The larger of two values.
    #[inline]
    pub fn max(self, a: FixedInt, b: FixedInt) -> FixedInt {
        if self.is_greater_equal(a, b) { a } else { b }
    }

    // --- Number theory helpers ---

    /// Greatest common divisor of the magnitudes, reduced into the range.
    ///
    /// `gcd(0, 0)` is 0. `gcd(MIN, MIN)` for a signed kind is `2^(W-1)`,
    /// which wraps back to `MIN` like any other overflowing result.
    pub fn gcd(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        let mut x = a.magnitude();
        let mut y = b.magnitude();
        while y != 0 {
            let r = x % y;
            x = y;
            y = r;
        }
        FixedInt::from_u128(self, x)
    }

    /// Least common multiple of the magnitudes, reduced into the range.
    ///
    /// Zero if either operand is zero. Computed as `(|a| / gcd) * |b|` with
    /// a wrapping product.
    pub fn lcm(self, a: FixedInt, b: FixedInt) -> FixedInt {
        self.check_operands(a, b);
        if a.is_zero() || b.is_zero() {
            return self.zero();
        }
        let g = self.gcd(a, b).magnitude();
        let scaled = (a.magnitude() / g).wrapping_mul(b.magnitude());
        FixedInt::from_u128(self, scaled)
    }
}
