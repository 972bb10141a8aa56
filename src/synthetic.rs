//! Scripted decode engine for tests and benchmarks
//!
//! [`ScriptedEngine`] replays a fixed sequence of region-search outcomes,
//! which makes orchestration behavior reproducible without a real backend:
//! planted codes can be anchored to marker pixels (so a detection is an
//! honest function of the pixels the engine is handed — a rotated image
//! yields different detections), carry a simulated detection cost checked
//! against the advisory deadline, and the engine counts live contexts so
//! resource release is observable.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::{DecodeEngine, NativeOrigin, RawPoint, RawQuad, StopCause};
use crate::error::EngineError;
use crate::image::ImageView;

/// Axis-aligned square detection quad with top-left corner at `(x, y)`
pub fn square_quad(x: f64, y: f64, size: f64) -> RawQuad {
    RawQuad {
        top_left: RawPoint::new(x, y),
        top_right: RawPoint::new(x + size, y),
        bottom_left: RawPoint::new(x, y + size),
        bottom_right: RawPoint::new(x + size, y + size),
    }
}

/// A code the scripted engine can find
#[derive(Debug, Clone)]
pub struct PlantedCode {
    /// Payload the code decodes to
    pub text: Vec<u8>,
    /// Detection corners in the engine's native space
    pub quad: RawQuad,
    /// Simulated detection cost; slept before the region is reported and
    /// checked against the deadline budget
    pub effort_ms: u64,
    /// Anchor pixel value the image must carry at the quad's top-left
    /// corner for this code to be found; `None` finds it in any image
    pub marker: Option<u8>,
}

impl PlantedCode {
    /// Plant a code with no detection cost and no anchor marker
    pub fn new(text: impl Into<Vec<u8>>, quad: RawQuad) -> Self {
        Self {
            text: text.into(),
            quad,
            effort_ms: 0,
            marker: None,
        }
    }

    /// Require `marker` at the quad's top-left corner pixel
    pub fn anchored(mut self, marker: u8) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Simulate a detection cost of `effort_ms` milliseconds
    pub fn with_effort(mut self, effort_ms: u64) -> Self {
        self.effort_ms = effort_ms;
        self
    }
}

/// One scripted region-search outcome
#[derive(Debug, Clone)]
pub enum ScanStep {
    /// A readable code: region found, message extraction succeeds
    Code(PlantedCode),
    /// A region is located but message extraction fails
    Unreadable(RawQuad),
    /// A successful attempt that reports no region; the scan must continue
    NullSuccess,
}

/// Deterministic decode engine replaying a scripted scan sequence
pub struct ScriptedEngine {
    steps: Vec<ScanStep>,
    origin: NativeOrigin,
    deadline_supported: bool,
    rejection: Option<String>,
    live_contexts: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    /// Build an engine that replays `steps` in order
    pub fn new(steps: Vec<ScanStep>) -> Self {
        Self {
            steps,
            origin: NativeOrigin::TopLeft,
            deadline_supported: true,
            rejection: None,
            live_contexts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report detections in the given native coordinate convention
    pub fn with_origin(mut self, origin: NativeOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Behave like a batch backend with no timeout concept
    pub fn without_deadline(mut self) -> Self {
        self.deadline_supported = false;
        self
    }

    /// Reject every image at context construction
    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.rejection = Some(reason.into());
        self
    }

    /// Number of decode contexts currently alive
    pub fn live_contexts(&self) -> usize {
        self.live_contexts.load(Ordering::SeqCst)
    }

    fn marker_present(&self, image: ImageView<'_>, code: &PlantedCode) -> bool {
        let Some(marker) = code.marker else {
            return true;
        };
        let x = code.quad.top_left.x.round().max(0.0) as usize;
        let y_native = code.quad.top_left.y.round().max(0.0) as usize;
        let y = match self.origin {
            NativeOrigin::TopLeft => y_native,
            NativeOrigin::BottomLeft => image.height().saturating_sub(1 + y_native),
        };
        image.get(x, y) == Some(marker)
    }
}

/// Scoped per-decode state of a [`ScriptedEngine`]
pub struct ScriptedContext<'img> {
    image: ImageView<'img>,
    cursor: usize,
    _guard: ContextGuard,
}

struct ContextGuard(Arc<AtomicUsize>);

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to one scripted detection
pub struct ScriptedRegion {
    index: usize,
}

impl DecodeEngine for ScriptedEngine {
    type Context<'img>
        = ScriptedContext<'img>
    where
        Self: 'img;
    type Region = ScriptedRegion;

    fn create_context<'img>(
        &self,
        image: ImageView<'img>,
    ) -> Result<Self::Context<'img>, EngineError> {
        if let Some(reason) = &self.rejection {
            return Err(EngineError::new(reason.clone()));
        }
        self.live_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedContext {
            image,
            cursor: 0,
            _guard: ContextGuard(Arc::clone(&self.live_contexts)),
        })
    }

    fn find_next_region(
        &self,
        ctx: &mut Self::Context<'_>,
        deadline: Option<Instant>,
    ) -> (Option<ScriptedRegion>, StopCause) {
        while ctx.cursor < self.steps.len() {
            let index = ctx.cursor;
            match &self.steps[index] {
                ScanStep::Code(code) => {
                    if !self.marker_present(ctx.image, code) {
                        // Not present in this image; scan past it.
                        ctx.cursor += 1;
                        continue;
                    }
                    let effort = Duration::from_millis(code.effort_ms);
                    if let Some(deadline) = deadline {
                        let budget = deadline.saturating_duration_since(Instant::now());
                        if effort > budget {
                            thread::sleep(budget);
                            return (None, StopCause::TimeLimit);
                        }
                    }
                    if !effort.is_zero() {
                        thread::sleep(effort);
                    }
                    ctx.cursor += 1;
                    return (Some(ScriptedRegion { index }), StopCause::Success);
                }
                ScanStep::Unreadable(_) => {
                    ctx.cursor += 1;
                    return (Some(ScriptedRegion { index }), StopCause::Success);
                }
                ScanStep::NullSuccess => {
                    ctx.cursor += 1;
                    return (None, StopCause::Success);
                }
            }
        }
        (None, StopCause::NotFound)
    }

    fn decode_region(&self, _ctx: &mut Self::Context<'_>, region: &ScriptedRegion) -> Option<Vec<u8>> {
        match &self.steps[region.index] {
            ScanStep::Code(code) => Some(code.text.clone()),
            _ => None,
        }
    }

    fn region_quad(&self, _ctx: &Self::Context<'_>, region: &ScriptedRegion) -> RawQuad {
        match &self.steps[region.index] {
            ScanStep::Code(code) => code.quad,
            ScanStep::Unreadable(quad) => *quad,
            ScanStep::NullSuccess => RawQuad::default(),
        }
    }

    fn native_origin(&self) -> NativeOrigin {
        self.origin
    }

    fn supports_deadline(&self) -> bool {
        self.deadline_supported
    }
}
