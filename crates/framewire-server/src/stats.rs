//! Per-session traffic counters, reported once a second via `tracing`.
//!
//! Stands in for the reference server's `self.stats` dict and its
//! once-a-second `print_stats` thread — same cadence and the same figures
//! (detect/skip counts, bandwidth, XOR compression ratio), routed through
//! `tracing::info!` instead of stdout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

#[derive(Default)]
pub struct SessionStats {
    pub frames_sent: AtomicU64,
    pub dirty_ticks: AtomicU64,
    pub skip_ticks: AtomicU64,
    pub raw_bytes: AtomicU64,
    pub wire_bytes: AtomicU64,
}

impl SessionStats {
    pub fn record_frame(&self, bytes: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.raw_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.wire_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_dirty(&self, raw_bytes: u64, wire_bytes: u64) {
        self.dirty_ticks.fetch_add(1, Ordering::Relaxed);
        self.raw_bytes.fetch_add(raw_bytes, Ordering::Relaxed);
        self.wire_bytes.fetch_add(wire_bytes, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skip_ticks.fetch_add(1, Ordering::Relaxed);
    }
}

/// Spawn a task that logs `stats` once a second until `closed` fires
/// (dropped by the session task on exit).
pub fn spawn_reporter(
    session_id: u64,
    peer: std::net::SocketAddr,
    stats: Arc<SessionStats>,
    mut closed: watch::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let raw = stats.raw_bytes.load(Ordering::Relaxed);
                    let wire = stats.wire_bytes.load(Ordering::Relaxed);
                    let ratio = if raw == 0 { 1.0 } else { wire as f64 / raw as f64 };
                    tracing::info!(
                        session_id,
                        %peer,
                        frames_sent = stats.frames_sent.load(Ordering::Relaxed),
                        dirty_ticks = stats.dirty_ticks.load(Ordering::Relaxed),
                        skip_ticks = stats.skip_ticks.load(Ordering::Relaxed),
                        raw_bytes = raw,
                        wire_bytes = wire,
                        compression_ratio = ratio,
                        "session stats",
                    );
                }
                _ = closed.changed() => break,
            }
        }
    });
}
