//! duomatrix - dual-backend 2D matrix code reading
//!
//! Locates and decodes 2D matrix codes in raster images by coordinating two
//! independently-implemented decode backends and reconciling their outputs
//! into one consistent result set. The decode engines themselves are
//! external collaborators behind the narrow [`DecodeEngine`] contract; this
//! crate is the orchestration layer:
//!
//! - a bounded region-search loop per backend ([`SingleBackendReader`])
//! - a lazy, abandonable result stream ([`ResultStream`])
//! - a concurrent combiner that merges, deduplicates and arbitrates
//!   detections from both backends, with a 180°-rotated rescan for
//!   orientation coverage ([`CombinedReader`])
//!
//! Images are borrowed, never owned: readers take an [`ImageView`] over a
//! caller-provided 8-bit grayscale buffer.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// The contract between the core and a decode engine
pub mod engine;
/// Error types surfaced by readers and engines
pub mod error;
/// Non-owning image views and the rotated copy
pub mod image;
/// Geometric-proximity duplicate matching
pub mod matcher;
/// Core data structures (Point, CodePosition, DecodeResult)
pub mod models;
/// Reader variants and the capability contract
pub mod reader;
/// Scripted engine fixture for tests and benchmarks
pub mod synthetic;
/// Image file loading helpers
pub mod tools;

pub use engine::{DecodeEngine, NativeOrigin, RawPoint, RawQuad, StopCause};
pub use error::{EngineError, ReaderError};
pub use image::{ImageView, OwnedImage};
pub use models::{CodePosition, DecodeResult, Point};
pub use reader::{
    CodeReader, CombinedReader, ResultCallback, ResultStream, SingleBackendReader,
};
