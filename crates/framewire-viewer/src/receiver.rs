//! Wire receive loop: read packets, apply them to the shared framebuffer.
//!
//! Grounded on `original_source/client.py`'s `receive_loop` (packet-type
//! dispatch, per-rect XOR-in-place), reimplemented over the pure
//! `framewire_delta::apply` functions instead of inline numpy XORs.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use framewire_delta::{apply_dirty, apply_full};
use framewire_wire::{read_packet, Packet};
use tokio::io::AsyncRead;
use tokio::sync::{watch, RwLock};

/// Framebuffer geometry and a monotonic counter bumped on every applied
/// FRAME or DIRTY, so the presenter can tell "something changed" from
/// "nothing changed yet" without re-reading the buffer itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameVersion {
    pub counter: u64,
    pub width: u32,
    pub height: u32,
}

/// Run the receive loop until the peer closes cleanly or a fatal protocol
/// error occurs. Returns `Ok(())` only on a clean close.
pub async fn run<R>(
    mut reader: R,
    framebuffer: Arc<RwLock<Vec<u8>>>,
    version_tx: watch::Sender<FrameVersion>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut initialized = false;

    loop {
        let Some(payload) = read_packet(&mut reader).await.context("failed to read packet")? else {
            return Ok(());
        };
        let packet = Packet::decode(&payload).context("failed to decode packet")?;

        match packet {
            Packet::Init { width, height } => {
                let mut buf = framebuffer.write().await;
                *buf = vec![0u8; width as usize * height as usize * 4];
                drop(buf);
                initialized = true;
                version_tx.send_modify(|v| {
                    v.width = width;
                    v.height = height;
                });
            }
            Packet::Frame { body, .. } => {
                require_initialized(initialized)?;
                let version = *version_tx.borrow();
                let mut buf = framebuffer.write().await;
                apply_full(&mut buf, version.width, version.height, &body).context("failed to apply FRAME")?;
                drop(buf);
                version_tx.send_modify(|v| v.counter = v.counter.wrapping_add(1));
            }
            Packet::Dirty { rects, body, .. } => {
                require_initialized(initialized)?;
                let version = *version_tx.borrow();
                let mut buf = framebuffer.write().await;
                apply_dirty(&mut buf, version.width, version.height, &rects, &body).context("failed to apply DIRTY")?;
                drop(buf);
                version_tx.send_modify(|v| v.counter = v.counter.wrapping_add(1));
            }
            Packet::Skip => {}
            Packet::Heartbeat { timestamp_millis } => {
                tracing::trace!(timestamp_millis, "heartbeat");
            }
        }
    }
}

fn require_initialized(initialized: bool) -> Result<()> {
    if initialized {
        Ok(())
    } else {
        bail!("received a frame update before INIT")
    }
}
