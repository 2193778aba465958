//! Presenter adapter: owns a read-only view of the viewer framebuffer and
//! hands periodic snapshots to a [`PresenterSink`].
//!
//! The real on-screen blitter is out of scope here (any 2D blitter will
//! do); [`FrameCounterSink`] stands in for it in this repo, the same way
//! the teacher leaves actual bitmap rendering to the surrounding RDP
//! client and keeps only the display-update plumbing in-tree.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, RwLock};

use crate::receiver::FrameVersion;

/// Receives framebuffer snapshots. Never sees alpha — presentation is
/// always opaque RGB/BGR.
pub trait PresenterSink: Send {
    fn present(&mut self, frame: &[u8], width: u32, height: u32);
}

/// A sink that records snapshot count, total bytes, and a checksum of the
/// last snapshot, for tests and headless observability.
#[derive(Debug, Default)]
pub struct FrameCounterSink {
    pub snapshots: u64,
    pub bytes: u64,
    pub last_checksum: u64,
}

impl FrameCounterSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresenterSink for FrameCounterSink {
    fn present(&mut self, frame: &[u8], _width: u32, _height: u32) {
        self.snapshots += 1;
        self.bytes += frame.len() as u64;
        self.last_checksum = fnv1a(frame);
    }
}

/// Shares a [`FrameCounterSink`] with a background reporter task without
/// requiring the sink itself to be `Clone` or async-aware.
#[derive(Clone, Default)]
pub struct SharedCounterSink(Arc<Mutex<FrameCounterSink>>);

impl SharedCounterSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(snapshots, bytes, last_checksum)` for periodic logging.
    pub fn stats(&self) -> (u64, u64, u64) {
        let sink = self.0.lock().expect("presenter sink mutex poisoned");
        (sink.snapshots, sink.bytes, sink.last_checksum)
    }
}

impl PresenterSink for SharedCounterSink {
    fn present(&mut self, frame: &[u8], width: u32, height: u32) {
        self.0.lock().expect("presenter sink mutex poisoned").present(frame, width, height);
    }
}

/// Logs `sink`'s running totals at `interval` until `version` closes.
pub async fn spawn_stats_reporter(sink: SharedCounterSink, mut version: watch::Receiver<FrameVersion>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick fires immediately; skip it
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (snapshots, bytes, checksum) = sink.stats();
                tracing::info!(snapshots, bytes, checksum, "presenter stats");
            }
            changed = version.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Reference cadence: present ~16ms after a new frame lands, or at worst
/// every 50ms if nothing changed (mirrors the reference client's polling
/// loop, not a hard real-time guarantee).
const FAST_POLL: Duration = Duration::from_millis(16);
const SLOW_POLL: Duration = Duration::from_millis(34);

/// Drive `sink` from `framebuffer`'s snapshots until `version` closes
/// (the receiver task exited). Width/height are read from `version` itself,
/// so the presenter never needs to learn geometry any other way.
pub async fn run(framebuffer: Arc<RwLock<Vec<u8>>>, mut version: watch::Receiver<FrameVersion>, mut sink: impl PresenterSink) {
    loop {
        match tokio::time::timeout(FAST_POLL, version.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return, // receiver task dropped the sender, viewer is shutting down
            Err(_elapsed) => {
                // No new frame within the fast window; give it one more
                // chance before presenting the unchanged buffer anyway.
                if tokio::time::timeout(SLOW_POLL, version.changed()).await.is_err() {
                    // still nothing new — present the stale buffer
                }
            }
        }

        let current = *version.borrow();
        if current.width == 0 || current.height == 0 {
            continue;
        }
        let buf = framebuffer.read().await;
        sink.present(&buf, current.width, current.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_changes_with_content() {
        let a = fnv1a(&[1, 2, 3]);
        let b = fnv1a(&[1, 2, 4]);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn sink_records_snapshot_stats() {
        let mut sink = FrameCounterSink::new();
        sink.present(&[1, 2, 3, 4], 1, 1);
        assert_eq!(sink.snapshots, 1);
        assert_eq!(sink.bytes, 4);
        sink.present(&[5, 6, 7, 8], 1, 1);
        assert_eq!(sink.snapshots, 2);
        assert_eq!(sink.bytes, 8);
    }
}
