//! Capture-side frame and geometry types.

pub use framewire_wire::DirtyRect;

/// A single captured video frame: BGRA, row-major, top row first.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw BGRA pixel data, `width * height * 4` bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedFrame {
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Status returned by [`crate::CaptureSource::acquire_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame is held; `release_frame` must be called exactly once.
    Ok,
    /// No frame arrived within the timeout; nothing is held.
    Timeout,
    /// The platform source failed; the session should close.
    Error,
}
