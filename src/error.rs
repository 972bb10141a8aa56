use thiserror::Error;

/// A decode engine refused to build its per-decode context for an image.
///
/// Context construction failure is fatal for the decode call that requested
/// it; it is surfaced to the caller and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode engine rejected the image: {reason}")]
pub struct EngineError {
    reason: String,
}

impl EngineError {
    /// Create an engine error from a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by reader operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    /// The reader does not implement the requested capability.
    ///
    /// Capability mismatches are reported explicitly rather than silently
    /// ignored; check the corresponding `is_*_supported` flag first.
    #[error("operation `{0}` is not supported by this reader")]
    Unsupported(&'static str),

    /// The underlying decode engine rejected the image.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The pixel buffer length does not match the declared dimensions.
    #[error("image buffer length {len} does not match {width}x{height} pixels")]
    ImageSize {
        /// Declared width in pixels.
        width: usize,
        /// Declared height in pixels.
        height: usize,
        /// Actual buffer length in bytes.
        len: usize,
    },
}
