use std::thread;

use tracing::debug;

use crate::engine::DecodeEngine;
use crate::error::ReaderError;
use crate::image::ImageView;
use crate::models::DecodeResult;
use crate::reader::merge::{ResultAccumulator, Source};
use crate::reader::single::SingleBackendReader;
use crate::reader::stream::ResultStream;
use crate::reader::{CodeReader, ResultCallback};

/// Reader combining an accurate backend and a fast backend
///
/// Runs both backends concurrently against one image, plus a second pass of
/// the accurate backend against a 180°-rotated copy to catch codes at the
/// orientation a single scan direction is biased to miss. All three
/// producers feed one lock-guarded collection that deduplicates by
/// geometric proximity; overall wall-clock time is bounded by the slowest
/// producer, not their sum.
///
/// `A` is the accurate backend: slower, streaming, honors timeouts. `B` is
/// the fast backend: returns a single batch, no timeout concept. With
/// double-check mode enabled (the default), the accurate backend's text
/// overwrites a conflicting fast-backend result at the same position — the
/// fast backend is known to occasionally misread text on a minority of
/// codes.
pub struct CombinedReader<A, B> {
    accurate: SingleBackendReader<A>,
    fast: SingleBackendReader<B>,
    double_check: bool,
}

impl<A: DecodeEngine, B: DecodeEngine> CombinedReader<A, B> {
    /// Build a combined reader from the accurate and the fast engine
    pub fn new(accurate: A, fast: B) -> Self {
        Self {
            accurate: SingleBackendReader::new(accurate),
            fast: SingleBackendReader::new(fast),
            double_check: true,
        }
    }

    /// Toggle double-check mode.
    ///
    /// Disabled, the fast backend's first result at a position is final and
    /// never overwritten, and producers stop as soon as the distinct-
    /// position budget is met — trading accuracy for lower latency.
    pub fn set_double_check(&mut self, value: bool) {
        self.double_check = value;
    }

    /// Whether double-check mode is enabled
    pub fn double_check(&self) -> bool {
        self.double_check
    }

    /// Stream the accurate backend over one image view into the shared
    /// collection, optionally reflecting positions back into the original
    /// image's coordinates.
    fn accurate_pass(
        &self,
        image: ImageView<'_>,
        accumulator: &ResultAccumulator,
        reflect: Option<(usize, usize)>,
    ) -> Result<(), ReaderError> {
        let mut stream = self.accurate.decode_stream(image)?;
        while accumulator.wants_more() {
            let Some(result) = stream.next() else { break };
            let result = match reflect {
                Some((width, height)) => DecodeResult::new(
                    result.text,
                    result.position.point_reflected(width, height),
                ),
                None => result,
            };
            accumulator.offer(result, Source::Accurate);
        }
        Ok(())
    }

    /// Run the fast backend to completion and merge its batch.
    fn fast_pass(
        &self,
        image: ImageView<'_>,
        accumulator: &ResultAccumulator,
    ) -> Result<(), ReaderError> {
        for result in self.fast.decode(&image)? {
            accumulator.offer(result, Source::Fast);
        }
        Ok(())
    }
}

fn join_pass<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

impl<A: DecodeEngine, B: DecodeEngine> CodeReader for CombinedReader<A, B> {
    /// Decode with both backends plus the rotated rescan, blocking until
    /// all three producers finish. The merged collection is unordered.
    fn decode(&self, image: &ImageView<'_>) -> Result<Vec<DecodeResult>, ReaderError> {
        let accumulator = ResultAccumulator::new(self.accurate.max_codes(), self.double_check);
        let (width, height) = (image.width(), image.height());
        debug!(width, height, double_check = self.double_check, "combined decode");

        // The only owned pixel copy the core creates.
        let rotated = image.rotated_180();
        let rotated_view = rotated.view();
        let direct_view = *image;
        let acc = &accumulator;

        let (direct, reflected, batch) = thread::scope(|s| {
            let direct = s.spawn(move || self.accurate_pass(direct_view, acc, None));
            let reflected =
                s.spawn(move || self.accurate_pass(rotated_view, acc, Some((width, height))));
            let batch = s.spawn(move || self.fast_pass(direct_view, acc));
            (join_pass(direct), join_pass(reflected), join_pass(batch))
        });
        // A fatal context failure from the accurate backend takes
        // precedence over one from the fast backend.
        direct?;
        reflected?;
        batch?;

        let results = accumulator.into_results();
        debug!(count = results.len(), "combined decode finished");
        Ok(results)
    }

    /// Per-result callbacks are not supported: the merged result set is
    /// only final after both backends converge.
    fn decode_with_callback(
        &self,
        _image: &ImageView<'_>,
        _on_result: ResultCallback,
    ) -> Result<Vec<DecodeResult>, ReaderError> {
        Err(ReaderError::Unsupported("decode_with_callback"))
    }

    /// Streaming is not supported, for the same reason as callbacks.
    fn decode_stream<'r>(&'r self, _image: ImageView<'r>) -> Result<ResultStream<'r>, ReaderError> {
        Err(ReaderError::Unsupported("decode_stream"))
    }

    /// Forwarded to the accurate backend only; the fast backend has no
    /// timeout concept.
    fn set_timeout(&mut self, timeout_ms: u32) -> Result<(), ReaderError> {
        self.accurate.set_timeout(timeout_ms)
    }

    fn timeout_ms(&self) -> u32 {
        self.accurate.timeout_ms()
    }

    /// True whenever the accurate constituent honors timeouts.
    fn is_timeout_supported(&self) -> bool {
        self.accurate.is_timeout_supported()
    }

    /// Forwarded to both backends identically.
    fn set_max_codes(&mut self, count: usize) {
        self.accurate.set_max_codes(count);
        self.fast.set_max_codes(count);
    }

    fn max_codes(&self) -> usize {
        self.accurate.max_codes()
    }

    fn is_callback_supported(&self) -> bool {
        false
    }

    fn is_streaming_supported(&self) -> bool {
        false
    }
}
