use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for bitgrain operations.
///
/// Structured variants for the arithmetic and storage failure modes, with
/// named fields where the caller can act on the detail.
#[derive(Error, Debug)]
pub enum GrainError {
    // === Arithmetic Errors ===
    /// The exact result does not fit the operand's bit width.
    ///
    /// Raised by negation and absolute value of the signed minimum, and by
    /// signed division of the minimum by -1.
    #[error("result of {op} is not representable in {width} bits")]
    UnrepresentableValue { op: &'static str, width: u8 },

    /// Division or remainder with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// 0 raised to the power 0.
    #[error("0^0 is undefined")]
    UndefinedResult,

    /// Negative exponent passed to an integer power.
    #[error("negative exponent {exponent} in integer power")]
    InvalidExponent { exponent: i64 },

    // === Indexing / Allocation Errors ===
    /// Index at or past the end of a sequence.
    #[error("index {index} out of bounds for sequence of {len} elements")]
    IndexOutOfBounds { index: u64, len: u64 },

    /// Allocation request outside the supported size range.
    #[error("invalid allocation size: {count} elements (max {max})")]
    InvalidSize { count: u64, max: u64 },

    /// A value of one integer kind was passed to a container of another.
    #[error("kind mismatch: sequence holds {expected}, got {actual}")]
    KindMismatch { expected: String, actual: String },

    /// A decimal literal that is not a valid integer.
    #[error("invalid integer literal: '{text}'")]
    InvalidLiteral { text: String },

    // === I/O Errors ===
    /// File I/O error from the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Short read (fewer bytes than expected) where the tail is not
    /// permitted to be zero-filled.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Cannot open a backing file.
    #[error("unable to open backing file: '{path}'")]
    CannotOpen { path: PathBuf },

    /// A backing file was not found.
    #[error("backing file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    // === Internal Errors ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl GrainError {
    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an `UnrepresentableValue` for the named operation.
    pub const fn unrepresentable(op: &'static str, width: u8) -> Self {
        Self::UnrepresentableValue { op, width }
    }

    /// Whether this error came from the pure arithmetic engine (as opposed
    /// to indexing, allocation, or the backing store).
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::UnrepresentableValue { .. }
                | Self::DivisionByZero
                | Self::UndefinedResult
                | Self::InvalidExponent { .. }
        )
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Arithmetic and indexing failures are deterministic; only backing
    /// store I/O can be transient.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Result type alias using `GrainError`.
pub type Result<T> = std::result::Result<T, GrainError>;
