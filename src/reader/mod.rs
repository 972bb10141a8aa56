//! Reader variants over the decode-engine contract
//!
//! Three capability-gated readers share one contract:
//! - [`SingleBackendReader`] wraps one engine and exposes eager, callback
//!   and streaming decoding
//! - [`CombinedReader`] runs an accurate and a fast backend concurrently
//!   and merges their detections
//! - [`ResultStream`] is the lazy sequence both build on

mod combined;
mod merge;
mod single;
mod stream;

use std::sync::Arc;

pub use combined::CombinedReader;
pub use single::{DEFAULT_MAX_CODES, DEFAULT_TIMEOUT_MS, SingleBackendReader};
pub use stream::ResultStream;

use crate::error::ReaderError;
use crate::image::ImageView;
use crate::models::DecodeResult;

/// Callback invoked once per decoded result during
/// [`CodeReader::decode_with_callback`]
pub type ResultCallback = Arc<dyn Fn(DecodeResult) + Send + Sync>;

/// Capability contract implemented by every reader variant
///
/// Not every reader supports every operation: calling an unsupported one
/// fails with [`ReaderError::Unsupported`] rather than silently succeeding,
/// so capability mismatches are programmatically detectable. Check the
/// `is_*_supported` flags before invoking the gated operations.
pub trait CodeReader {
    /// Decode all codes in the image, blocking until the scan finishes.
    ///
    /// Setting the maximum number of codes to detect makes this return
    /// faster; how fast the reader gives up searching is tuned with the
    /// timeout.
    fn decode(&self, image: &ImageView<'_>) -> Result<Vec<DecodeResult>, ReaderError>;

    /// Decode all codes, additionally dispatching each result to
    /// `on_result` on its own fire-and-forget task.
    ///
    /// The call waits only for the underlying scan, never for callback
    /// completion, and callback failures do not propagate to the caller.
    fn decode_with_callback(
        &self,
        image: &ImageView<'_>,
        on_result: ResultCallback,
    ) -> Result<Vec<DecodeResult>, ReaderError>;

    /// Decode lazily: one result per resumption of the returned stream.
    fn decode_stream<'r>(&'r self, image: ImageView<'r>) -> Result<ResultStream<'r>, ReaderError>;

    /// Set the per-attempt detection timeout in milliseconds (0 = unbounded).
    fn set_timeout(&mut self, timeout_ms: u32) -> Result<(), ReaderError>;

    /// The configured per-attempt detection timeout in milliseconds
    fn timeout_ms(&self) -> u32;

    /// Whether this reader honors detection timeouts
    fn is_timeout_supported(&self) -> bool;

    /// Bound the number of codes to detect.
    fn set_max_codes(&mut self, count: usize);

    /// The configured detection bound
    fn max_codes(&self) -> usize;

    /// Whether [`decode_with_callback`](Self::decode_with_callback) is
    /// supported
    fn is_callback_supported(&self) -> bool;

    /// Whether [`decode_stream`](Self::decode_stream) is supported
    fn is_streaming_supported(&self) -> bool;
}
