//! Acceptor: binds the listening socket and spawns one independent session
//! pipeline per connection.
//!
//! Grounded on `cosmic-ext-rdp-broker/src/broker.rs`'s accept loop — bind,
//! then `loop { accept ... spawn(handle) }`, logging and continuing on a
//! per-connection failure rather than aborting the whole acceptor.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use framewire_capture::SyntheticSource;
use socket2::{Domain, Socket, Type};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::capture_driver;
use crate::session::{self, SessionConfig};

const SOCKET_BUF_BYTES: usize = 1024 * 1024;
const ACCEPT_BACKLOG: i32 = 16;

/// Default synthetic screen geometry when no real capture backend is wired
/// up; used for `--synthetic` mode, the only mode this binary supports.
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

pub struct RunConfig {
    pub bind: SocketAddr,
    pub fps: u32,
    pub keyframe_interval: Option<Duration>,
}

/// Bind and serve forever, spawning one session per accepted connection.
pub async fn run(config: RunConfig) -> Result<()> {
    let listener = bind_listener(config.bind).context("failed to bind listening socket")?;
    tracing::info!(bind = %config.bind, "framewire-serverd listening");
    serve(listener, config.fps, config.keyframe_interval).await
}

/// Accept connections from an already-bound `listener` forever, spawning one
/// session per connection. Split out from [`run`] so tests can bind to an
/// ephemeral port (`127.0.0.1:0`) and read back the real address before
/// serving, which `run` alone doesn't expose.
pub async fn serve(listener: TcpListener, fps: u32, keyframe_interval: Option<Duration>) -> Result<()> {
    let capture = Arc::new(Mutex::new(SyntheticSource::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, 0x00)));
    let tick_interval = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    capture_driver::spawn(capture.clone(), DEFAULT_WIDTH, DEFAULT_HEIGHT, tick_interval);

    loop {
        let (stream, peer_addr) = listener.accept().await.context("accept failed")?;
        tracing::info!(%peer_addr, "viewer connected");

        let capture = capture.clone();
        let session_config = SessionConfig {
            tick_interval,
            keyframe_interval,
        };

        tokio::spawn(async move {
            if let Err(e) = session::run(stream, peer_addr, capture, session_config).await {
                tracing::warn!(%peer_addr, error = %e, "session ended with an error");
            }
        });
    }
}

/// Bind a listening socket with the options spec.md §6 requires:
/// `SO_REUSEADDR`, raised send/receive buffers, and a backlog of at least 5.
pub fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.set_recv_buffer_size(SOCKET_BUF_BYTES)?;
    socket.set_send_buffer_size(SOCKET_BUF_BYTES)?;
    socket.bind(&addr.into())?;
    socket.listen(ACCEPT_BACKLOG)?;

    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
