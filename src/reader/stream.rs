use crate::models::DecodeResult;

/// Lazy stream of decode results from one backend
///
/// A single-threaded cooperative generator: each call to
/// [`Iterator::next`] resumes the underlying region-search until exactly one
/// result is produced, then suspends. The sequence is finite — bounded by
/// the reader's configured maximum or by backend exhaustion — and not
/// restartable: once exhausted or abandoned it cannot be reused.
///
/// The stream exclusively owns the backend's decode context for its entire
/// lifetime. Dropping the stream releases the context exactly once, whether
/// the consumer drained it fully or abandoned it early.
pub struct ResultStream<'a> {
    step: Box<dyn FnMut() -> Option<DecodeResult> + 'a>,
    current: Option<DecodeResult>,
    exhausted: bool,
}

impl<'a> ResultStream<'a> {
    pub(crate) fn new(step: impl FnMut() -> Option<DecodeResult> + 'a) -> Self {
        Self {
            step: Box::new(step),
            current: None,
            exhausted: false,
        }
    }

    /// The most recently yielded result, or `None` before the first yield
    pub fn current(&self) -> Option<&DecodeResult> {
        self.current.as_ref()
    }
}

impl Iterator for ResultStream<'_> {
    type Item = DecodeResult;

    fn next(&mut self) -> Option<DecodeResult> {
        if self.exhausted {
            return None;
        }
        match (self.step)() {
            Some(result) => {
                self.current = Some(result.clone());
                Some(result)
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

impl std::fmt::Debug for ResultStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("current", &self.current)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}
