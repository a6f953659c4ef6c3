//! Core error types for JPEG/MPF container operations.

use thiserror::Error;

/// Errors that can occur while parsing or rewriting a JPEG/MPF container.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The buffer does not begin with a Start-Of-Image marker.
    #[error("not a JPEG (missing SOI marker)")]
    NotAJpeg,

    /// The stream ended before a structure the operation depends on.
    ///
    /// The marker scanner itself never fails with this: a length field that
    /// would leave the buffer stops the scan early and the markers collected
    /// so far are returned. Operations that need the terminal Start-Of-Scan
    /// such a truncated scan never reached report it here.
    #[error("truncated JPEG stream: {0}")]
    Truncated(String),

    /// The MPF APP2 payload could not be interpreted as a directory.
    ///
    /// Fatal for gain-map extraction only; callers should treat the buffer
    /// as a plain single JPEG.
    #[error("malformed MPF directory: {0}")]
    MalformedMpf(String),

    /// A sub-image range failed Start-Of-Image validation even after
    /// fallback scanning, or falls outside the buffer.
    ///
    /// Fatal for that one sub-image only.
    #[error("invalid sub-image offset: {0}")]
    InvalidSubImageOffset(String),

    /// The requested container composition is impossible.
    #[error("invalid assembly: {0}")]
    InvalidAssembly(String),
}

/// Result type for container operations.
pub type Result<T> = core::result::Result<T, Error>;
