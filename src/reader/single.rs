use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::engine::{DecodeEngine, StopCause};
use crate::error::ReaderError;
use crate::image::ImageView;
use crate::models::DecodeResult;
use crate::reader::stream::ResultStream;
use crate::reader::{CodeReader, ResultCallback};

/// Default per-attempt detection timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u32 = 200;

/// Default maximum number of codes to detect
pub const DEFAULT_MAX_CODES: usize = 255;

/// Reader over a single decode engine
///
/// Runs the bounded region-search loop against one backend and exposes the
/// results eagerly ([`decode`](CodeReader::decode)) or lazily
/// ([`decode_stream`](CodeReader::decode_stream)).
///
/// The timeout applies to detection only, not message extraction, and is
/// reset for every detection attempt: each new attempt gets a full fresh
/// budget. 0 means searching continues until really nothing can be found.
pub struct SingleBackendReader<E> {
    engine: E,
    timeout_ms: u32,
    max_codes: usize,
}

impl<E: DecodeEngine> SingleBackendReader<E> {
    /// Wrap an engine with default timeout and detection bound
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_codes: DEFAULT_MAX_CODES,
        }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: DecodeEngine> CodeReader for SingleBackendReader<E> {
    fn decode(&self, image: &ImageView<'_>) -> Result<Vec<DecodeResult>, ReaderError> {
        Ok(self.decode_stream(*image)?.collect())
    }

    fn decode_with_callback(
        &self,
        image: &ImageView<'_>,
        on_result: ResultCallback,
    ) -> Result<Vec<DecodeResult>, ReaderError> {
        let mut results = Vec::new();
        for result in self.decode_stream(*image)? {
            let callback = on_result.clone();
            let dispatched = result.clone();
            // Fire-and-forget: the scan never waits for a callback, and a
            // panicking callback must not reach the caller.
            rayon::spawn(move || {
                if catch_unwind(AssertUnwindSafe(|| callback(dispatched))).is_err() {
                    debug!("result callback panicked; ignored");
                }
            });
            results.push(result);
        }
        Ok(results)
    }

    fn decode_stream<'r>(&'r self, image: ImageView<'r>) -> Result<ResultStream<'r>, ReaderError> {
        let mut ctx = self.engine.create_context(image)?;
        let engine = &self.engine;
        let timeout = (self.timeout_ms > 0 && engine.supports_deadline())
            .then(|| Duration::from_millis(self.timeout_ms.into()));
        let max_codes = self.max_codes;
        let image_height = image.height();
        let origin = engine.native_origin();
        let mut detected = 0usize;

        Ok(ResultStream::new(move || {
            while detected < max_codes {
                // Per-attempt deadline, not shared across the whole call.
                let deadline = timeout.map(|t| Instant::now() + t);
                let (region, cause) = engine.find_next_region(&mut ctx, deadline);
                let Some(region) = region else {
                    if cause == StopCause::Success {
                        // A missing region with a Success stop-cause does not
                        // mean exhaustion; keep scanning.
                        continue;
                    }
                    trace!(?cause, detected, "region search exhausted");
                    return None;
                };
                let Some(text) = engine.decode_region(&mut ctx, &region) else {
                    // Located but unreadable: discard the region, keep
                    // scanning, do not count it toward the maximum.
                    trace!("located region failed message extraction");
                    continue;
                };
                let quad = engine.region_quad(&ctx, &region);
                let position = quad.to_unified(image_height, origin);
                detected += 1;
                return Some(DecodeResult::new(text, position));
            }
            None
        }))
    }

    fn set_timeout(&mut self, timeout_ms: u32) -> Result<(), ReaderError> {
        if !self.engine.supports_deadline() {
            return Err(ReaderError::Unsupported("set_timeout"));
        }
        self.timeout_ms = timeout_ms;
        Ok(())
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    fn is_timeout_supported(&self) -> bool {
        self.engine.supports_deadline()
    }

    fn set_max_codes(&mut self, count: usize) {
        self.max_codes = count;
    }

    fn max_codes(&self) -> usize {
        self.max_codes
    }

    fn is_callback_supported(&self) -> bool {
        true
    }

    fn is_streaming_supported(&self) -> bool {
        true
    }
}
