//! Capture adapter contract for framewire.
//!
//! The real desktop-duplication primitive (DXGI, PipeWire ScreenCast, or
//! similar) is an external collaborator — this crate defines only the
//! [`CaptureSource`] trait the rest of the pipeline consumes, plus
//! [`SyntheticSource`], a deterministic in-memory implementation used for
//! `--synthetic` mode and for the delta-encoder test suite.

pub mod frame;
pub mod synthetic;

pub use frame::{CapturedFrame, FrameStatus};
pub use framewire_wire::DirtyRect;
pub use synthetic::SyntheticSource;

use std::time::Duration;

use async_trait::async_trait;

/// Contract a desktop-duplication source must satisfy (spec.md §4.2).
///
/// A successful [`acquire_frame`](CaptureSource::acquire_frame) "holds" the
/// frame; [`release_frame`](CaptureSource::release_frame) must be called
/// exactly once before the next `acquire_frame`. All other accessors are
/// valid only while a frame is held.
#[async_trait]
pub trait CaptureSource: Send {
    /// Screen width in pixels. Fixed for the lifetime of the source.
    fn width(&self) -> u32;
    /// Screen height in pixels. Fixed for the lifetime of the source.
    fn height(&self) -> u32;

    /// Block up to `timeout` for the next frame.
    async fn acquire_frame(&mut self, timeout: Duration) -> FrameStatus;

    /// Return the held frame to the platform. Must be called exactly once
    /// per successful `acquire_frame`.
    fn release_frame(&mut self);

    /// Number of dirty rects for the held frame. Zero means unchanged.
    fn dirty_rect_count(&self) -> u32;

    /// Append the held frame's dirty rects, in order, to `out`.
    fn dirty_rects(&self, out: &mut Vec<DirtyRect>);

    /// Write the full BGRA snapshot of the held frame into `out`.
    ///
    /// `out` must be exactly `width * height * 4` bytes.
    fn copy_full_frame(&self, out: &mut [u8]);

    /// Total bytes across all dirty rects (`sum(w_i * h_i * 4)`).
    fn dirty_region_size(&self) -> u32;

    /// Concatenate dirty-rect pixel bodies, in `dirty_rects()` order, into
    /// `out`. Returns the number of bytes written.
    fn copy_dirty_regions(&self, out: &mut [u8]) -> usize;
}
