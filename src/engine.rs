//! The contract between the orchestration core and a decode engine
//!
//! An engine is an opaque external collaborator: it locates candidate code
//! regions in an image and extracts their payloads. The core drives it
//! through three operations — create a scoped per-decode context, find the
//! next candidate region under an advisory deadline, and decode a located
//! region — and transforms the engine's native detection coordinates into
//! the unified top-left-origin image space.

use std::time::Instant;

use crate::error::EngineError;
use crate::image::ImageView;
use crate::models::{CodePosition, Point};

/// Outcome of one region-search attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// The engine found nothing further
    NotFound,
    /// The attempt ended successfully
    ///
    /// May co-occur with a missing region in some engine configurations;
    /// the scan must continue in that case, since a genuine code may still
    /// be recoverable on a subsequent attempt.
    Success,
    /// The attempt ran past its deadline
    TimeLimit,
    /// The attempt exhausted its iteration budget
    IterLimit,
}

/// Corner of a detection in an engine's native coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawPoint {
    /// Native X coordinate
    pub x: f64,
    /// Native Y coordinate
    pub y: f64,
}

impl RawPoint {
    /// Create a raw point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Four named corners of a detection in an engine's native space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawQuad {
    /// Top-left corner
    pub top_left: RawPoint,
    /// Top-right corner
    pub top_right: RawPoint,
    /// Bottom-left corner
    pub bottom_left: RawPoint,
    /// Bottom-right corner
    pub bottom_right: RawPoint,
}

impl RawQuad {
    /// Transform this quad into the unified coordinate space.
    ///
    /// Coordinates are rounded to the nearest pixel. Engines with a
    /// bottom-left native origin get an explicit vertical-axis flip:
    /// `y_unified = height - 1 - y_native`.
    pub fn to_unified(&self, image_height: usize, origin: NativeOrigin) -> CodePosition {
        let map = |p: RawPoint| {
            let x = round_to_nearest(p.x);
            let y = round_to_nearest(p.y);
            match origin {
                NativeOrigin::TopLeft => Point::new(x, y),
                NativeOrigin::BottomLeft => Point::new(x, invert_y_axis(image_height, y)),
            }
        };
        CodePosition::new(
            map(self.top_left),
            map(self.top_right),
            map(self.bottom_left),
            map(self.bottom_right),
        )
    }
}

/// Where an engine's native coordinate space puts its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeOrigin {
    /// Origin at the top-left corner, y increasing downward
    #[default]
    TopLeft,
    /// Origin at the bottom-left corner, y increasing upward
    BottomLeft,
}

fn round_to_nearest(value: f64) -> u32 {
    if value <= 0.0 {
        return 0;
    }
    (value + 0.5) as u32
}

fn invert_y_axis(image_height: usize, value: u32) -> u32 {
    (image_height as u32).saturating_sub(1).saturating_sub(value)
}

/// A decode engine: locates candidate regions and extracts their payloads
///
/// Implementations are opaque to the core. Contexts are created once per
/// decode invocation, owned by the consuming stream for its whole lifetime,
/// and released exactly once on every exit path via `Drop`.
pub trait DecodeEngine: Send + Sync {
    /// Scoped per-decode scanning state, tied to the image it was built for
    type Context<'img>: 'img
    where
        Self: 'img;

    /// Handle describing a located, not-yet-decoded candidate code area
    type Region;

    /// Build the per-decode context for an image.
    ///
    /// Failure is fatal for the decode call; it is never retried.
    fn create_context<'img>(
        &self,
        image: ImageView<'img>,
    ) -> Result<Self::Context<'img>, EngineError>;

    /// Search for the next candidate region.
    ///
    /// The deadline is advisory and cooperative: the engine polls it
    /// internally and the core never preempts a search in progress.
    /// `None` means unbounded.
    fn find_next_region(
        &self,
        ctx: &mut Self::Context<'_>,
        deadline: Option<Instant>,
    ) -> (Option<Self::Region>, StopCause);

    /// Extract the payload of a located region.
    ///
    /// `None` means message extraction failed; the region is discarded and
    /// the scan continues.
    fn decode_region(&self, ctx: &mut Self::Context<'_>, region: &Self::Region) -> Option<Vec<u8>>;

    /// The region's detection corners in the engine's native space
    fn region_quad(&self, ctx: &Self::Context<'_>, region: &Self::Region) -> RawQuad;

    /// The native coordinate convention of [`region_quad`](Self::region_quad)
    fn native_origin(&self) -> NativeOrigin {
        NativeOrigin::TopLeft
    }

    /// Whether [`find_next_region`](Self::find_next_region) honors deadlines
    fn supports_deadline(&self) -> bool;
}
