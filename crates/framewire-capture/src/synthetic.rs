//! A deterministic, scriptable [`CaptureSource`] used in place of the real
//! desktop-duplication primitive.
//!
//! Analogous to `cosmic-rdp-server`'s `StaticDisplay` blue-screen fallback,
//! generalized from "always the same bitmap" to "play back a scripted
//! sequence of no-op and damage ticks" so the delta encoder can be tested
//! without a real capture backend.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;

use crate::frame::FrameStatus;
use crate::{CaptureSource, DirtyRect};

/// One scripted capture tick.
#[derive(Debug, Clone)]
pub enum Tick {
    /// No pixels changed; `acquire_frame` returns OK with zero dirty rects.
    NoChange,
    /// Pixels changed in the given rects; `pixels` must be `rect.byte_len()`
    /// bytes of row-major BGRA for each rect, in order.
    Damage(Vec<(DirtyRect, Vec<u8>)>),
    /// The platform failed to deliver a frame at all.
    Timeout,
}

/// An in-memory capture source that plays back a queue of [`Tick`]s.
///
/// Starts from a canvas filled with `fill`. When the script runs dry,
/// further ticks are [`Tick::NoChange`] — a session that outlives its
/// script just idles, which is the common case in tests.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    canvas: Vec<u8>,
    script: VecDeque<Tick>,
    held: bool,
    held_dirty: Vec<DirtyRect>,
    held_region: Vec<u8>,
}

impl SyntheticSource {
    #[must_use]
    pub fn new(width: u32, height: u32, fill: u8) -> Self {
        Self {
            width,
            height,
            canvas: vec![fill; width as usize * height as usize * 4],
            script: VecDeque::new(),
            held: false,
            held_dirty: Vec::new(),
            held_region: Vec::new(),
        }
    }

    /// Queue a tick to be returned by a future `acquire_frame` call.
    pub fn push(&mut self, tick: Tick) {
        self.script.push_back(tick);
    }

    /// Current full-canvas snapshot, independent of any held frame.
    #[must_use]
    pub fn canvas(&self) -> &[u8] {
        &self.canvas
    }
}

#[async_trait]
impl CaptureSource for SyntheticSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    async fn acquire_frame(&mut self, _timeout: Duration) -> FrameStatus {
        assert!(!self.held, "acquire_frame called while a frame is held");

        match self.script.pop_front().unwrap_or(Tick::NoChange) {
            Tick::Timeout => FrameStatus::Timeout,
            Tick::NoChange => {
                self.held = true;
                self.held_dirty.clear();
                self.held_region.clear();
                FrameStatus::Ok
            }
            Tick::Damage(rects) => {
                self.held_dirty.clear();
                self.held_region.clear();
                for (rect, pixels) in rects {
                    debug_assert_eq!(pixels.len(), rect.byte_len());
                    blit_rect(&mut self.canvas, self.width, &rect, &pixels);
                    self.held_dirty.push(rect);
                    self.held_region.extend_from_slice(&pixels);
                }
                self.held = true;
                FrameStatus::Ok
            }
        }
    }

    fn release_frame(&mut self) {
        assert!(self.held, "release_frame called without a held frame");
        self.held = false;
    }

    fn dirty_rect_count(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.held_dirty.len() as u32
        }
    }

    fn dirty_rects(&self, out: &mut Vec<DirtyRect>) {
        out.extend_from_slice(&self.held_dirty);
    }

    fn copy_full_frame(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.canvas);
    }

    fn dirty_region_size(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.held_region.len() as u32
        }
    }

    fn copy_dirty_regions(&self, out: &mut [u8]) -> usize {
        out[..self.held_region.len()].copy_from_slice(&self.held_region);
        self.held_region.len()
    }
}

/// Blit `pixels` (row-major BGRA within `rect`) into `canvas`, a
/// `canvas_width`-wide BGRA buffer.
fn blit_rect(canvas: &mut [u8], canvas_width: u32, rect: &DirtyRect, pixels: &[u8]) {
    let stride = canvas_width as usize * 4;
    let rect_stride = rect.width() as usize * 4;
    for row in 0..rect.height() as usize {
        let canvas_off = (rect.top as usize + row) * stride + rect.left as usize * 4;
        let pixel_off = row * rect_stride;
        canvas[canvas_off..canvas_off + rect_stride]
            .copy_from_slice(&pixels[pixel_off..pixel_off + rect_stride]);
    }
}
