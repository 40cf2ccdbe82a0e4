//! Geometry errors
//!
//! None of these escape a resolver pass: the offending range is logged and
//! skipped.

use marginalia_core::TextRange;

/// Why a range could not be positioned
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("inverted range [{}, {})", .0.start, .0.end)]
    InvertedRange(TextRange),

    #[error("range [{}, {}) outside text of length {len}", .range.start, .range.end)]
    OutOfBounds { range: TextRange, len: usize },

    #[error("text layout is detached from the view")]
    Detached,

    #[error("layout engine error: {0}")]
    Layout(String),

    #[error("range produced no visible rectangle")]
    Empty,
}

/// Result alias for geometry operations
pub type GeometryResult<T> = Result<T, GeometryError>;
