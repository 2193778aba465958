//! One independent pipeline per connected viewer: handshake, then the
//! acquire → XOR → send tick loop.
//!
//! Grounded on `original_source/server.py`'s `handle_client`: bootstrap by
//! discarding a warm-up frame then sending INIT+FRAME, then loop
//! acquire(16ms) → branch on dirty-rect count → XOR → pack → send → pace.
//! The capture source itself is driven independently by
//! [`crate::capture_driver`]; a session only ever acquires/releases it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use framewire_capture::{CaptureSource, FrameStatus, SyntheticSource};
use framewire_delta::encode::{DeltaEncoder, EncodedTick};
use framewire_wire::{write_packet, Packet};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};

use crate::stats::{spawn_reporter, SessionStats};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// How long to wait for a single acquire before retrying, during bootstrap.
const BOOTSTRAP_RETRY: Duration = Duration::from_millis(50);
const BOOTSTRAP_MAX_ATTEMPTS: u32 = 100;
const TICK_TIMEOUT: Duration = Duration::from_millis(16);

pub struct SessionConfig {
    pub tick_interval: Duration,
    pub keyframe_interval: Option<Duration>,
}

/// Run one viewer's session to completion.
///
/// `capture` is shared across every session via the coarse `captureLock`
/// design simplification: the whole acquire → copy → release span is held
/// across this session's send, serializing all sessions against one
/// capture backend.
pub async fn run(
    stream: TcpStream,
    peer: std::net::SocketAddr,
    capture: Arc<Mutex<SyntheticSource>>,
    config: SessionConfig,
) -> Result<()> {
    let session_id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    stream.set_nodelay(true).context("failed to set TCP_NODELAY")?;

    let (mut reader, mut writer) = stream.into_split();
    // The wire protocol is presenter-to-viewer only; watch for the peer
    // closing its side early so the tick loop can exit promptly.
    let detect_close = tokio::spawn(async move {
        let mut buf = [0u8; 1];
        use tokio::io::AsyncReadExt;
        let _ = reader.read(&mut buf).await;
    });

    let (width, height) = {
        let source = capture.lock().await;
        (source.width(), source.height())
    };

    let f0 = bootstrap(&capture, width, height).await?;
    let mut encoder = DeltaEncoder::new(width, height);
    encoder.bootstrap(&f0);

    write_packet(&mut writer, &Packet::Init { width, height }.encode()?)
        .await
        .context("failed to send INIT")?;
    write_packet(
        &mut writer,
        &Packet::Frame {
            compressed: true,
            body: f0.clone(),
        }
        .encode()?,
    )
    .await
    .context("failed to send bootstrap FRAME")?;

    let stats = Arc::new(SessionStats::default());
    stats.record_frame(f0.len() as u64);
    let (closed_tx, closed_rx) = watch::channel(());
    spawn_reporter(session_id, peer, stats.clone(), closed_rx);

    tracing::info!(session_id, %peer, width, height, "session streaming");

    let mut ticker = tokio::time::interval(config.tick_interval);
    let mut since_keyframe = Duration::ZERO;

    let result = loop {
        ticker.tick().await;

        if detect_close.is_finished() {
            tracing::info!(session_id, %peer, "peer closed connection");
            break Ok(());
        }

        since_keyframe += config.tick_interval;
        if let Some(interval) = config.keyframe_interval {
            if since_keyframe >= interval {
                since_keyframe = Duration::ZERO;
                match send_keyframe(&capture, &mut writer, &mut encoder, width, height).await {
                    Ok(bytes) => stats.record_frame(bytes),
                    Err(e) => break Err(e),
                }
                continue;
            }
        }

        match tick(&capture, &mut writer, &mut encoder).await {
            Ok(TickOutcome::Skip) => stats.record_skip(),
            Ok(TickOutcome::Dirty { raw_bytes, wire_bytes }) => stats.record_dirty(raw_bytes, wire_bytes),
            Ok(TickOutcome::Timeout) => {}
            Err(e) => break Err(e),
        }
    };

    drop(closed_tx);
    detect_close.abort();
    result
}

async fn bootstrap(capture: &Arc<Mutex<SyntheticSource>>, width: u32, height: u32) -> Result<Vec<u8>> {
    // Discard the warm-up frame: the real capture backend's first frame
    // after session start is documented as unreliable.
    {
        let mut source = acquire_with_retry(capture).await?;
        source.release_frame();
    }

    let mut frame = vec![0u8; width as usize * height as usize * 4];
    let mut source = acquire_with_retry(capture).await?;
    source.copy_full_frame(&mut frame);
    source.release_frame();
    Ok(frame)
}

/// Retries acquiring a frame until one arrives or capture fails outright,
/// returning the `captureLock` guard still locked with the frame held.
/// Callers must call `release_frame()` on the guard before dropping it: no
/// capture call may execute outside `captureLock` (spec.md §5), so the lock
/// must stay held for the guard's entire lifetime, not just the acquire.
async fn acquire_with_retry(
    capture: &Arc<Mutex<SyntheticSource>>,
) -> Result<tokio::sync::MutexGuard<'_, SyntheticSource>> {
    for _ in 0..BOOTSTRAP_MAX_ATTEMPTS {
        let mut source = capture.lock().await;
        match source.acquire_frame(BOOTSTRAP_RETRY).await {
            FrameStatus::Ok => return Ok(source),
            FrameStatus::Timeout => continue,
            FrameStatus::Error => anyhow::bail!("capture source reported a fatal error during bootstrap"),
        }
    }
    anyhow::bail!("capture source produced no frame during bootstrap")
}

enum TickOutcome {
    Skip,
    Dirty { raw_bytes: u64, wire_bytes: u64 },
    Timeout,
}

async fn tick(
    capture: &Arc<Mutex<SyntheticSource>>,
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    encoder: &mut DeltaEncoder,
) -> Result<TickOutcome> {
    let mut source = capture.lock().await;
    let status = source.acquire_frame(TICK_TIMEOUT).await;
    match status {
        FrameStatus::Timeout => return Ok(TickOutcome::Timeout),
        FrameStatus::Error => anyhow::bail!("capture source reported a fatal error"),
        FrameStatus::Ok => {}
    }

    let rect_count = source.dirty_rect_count();
    if rect_count == 0 {
        // captureLock stays held across the send (spec.md §4.3, §5): a slow
        // writer here backpressures this session's own tick and, via the
        // shared mutex, every other session's tick too.
        let result = write_packet(writer, &Packet::Skip.encode()?)
            .await
            .context("failed to send SKIP");
        source.release_frame();
        result?;
        return Ok(TickOutcome::Skip);
    }

    let mut rects = Vec::with_capacity(rect_count as usize);
    source.dirty_rects(&mut rects);
    let mut region = vec![0u8; source.dirty_region_size() as usize];
    source.copy_dirty_regions(&mut region);

    let raw_bytes = region.len() as u64;
    let EncodedTick::Dirty { rects, body } = encoder.encode_tick(&rects, &region) else {
        unreachable!("rects is non-empty, encode_tick cannot return Skip");
    };

    let packet = Packet::Dirty {
        compressed: true,
        rects,
        body,
    };
    let encoded = packet.encode()?;
    let wire_bytes = encoded.len() as u64;
    let result = write_packet(writer, &encoded).await.context("failed to send DIRTY");
    source.release_frame();
    result?;

    Ok(TickOutcome::Dirty { raw_bytes, wire_bytes })
}

async fn send_keyframe(
    capture: &Arc<Mutex<SyntheticSource>>,
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    encoder: &mut DeltaEncoder,
    width: u32,
    height: u32,
) -> Result<u64> {
    let mut frame = vec![0u8; width as usize * height as usize * 4];
    let mut source = acquire_with_retry(capture).await?;
    source.copy_full_frame(&mut frame);

    encoder.bootstrap(&frame);
    let packet = Packet::Frame {
        compressed: true,
        body: frame,
    };
    let encoded = packet.encode()?;
    let bytes = encoded.len() as u64;
    let result = write_packet(writer, &encoded).await.context("failed to send keyframe FRAME");
    source.release_frame();
    result?;
    Ok(bytes)
}
