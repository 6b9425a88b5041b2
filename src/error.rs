//! Caller-contract errors
//!
//! Only violations of the calling contract surface as errors: bad creation
//! dimensions, out-of-range cell coordinates, undersized output buffers.
//! Malformed escape-sequence input is never an error (see `parser`).

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Terminal created with zero columns or rows
    #[error("terminal dimensions must be at least 1x1")]
    InvalidDimensions,

    /// Row, column, or scrollback offset outside the addressable range
    #[error("row or column index out of range")]
    OutOfRange,

    /// Caller-supplied output buffer cannot hold the result
    #[error("output buffer too small")]
    BufferTooSmall,
}
