use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpStream;
use tokio::sync::{watch, RwLock};

mod presenter;
mod receiver;

use presenter::SharedCounterSink;
use receiver::FrameVersion;

/// Raised to 1 MiB on both ends of the wire per spec.md §6; the server
/// applies this at bind time (see `framewire-server::server::bind_listener`),
/// the viewer applies it here right after connecting.
const SOCKET_BUF_BYTES: usize = 1024 * 1024;

/// Connects to a framewire host and reconstructs its mirrored screen.
#[derive(Parser, Debug)]
#[command(name = "framewire-view", version, about)]
struct Cli {
    /// Host to connect to
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Port to connect to
    #[arg(default_value_t = 9999)]
    port: u16,

    /// Seconds between logged presenter stats
    #[arg(long, default_value_t = 5)]
    stats_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        tracing::error!(error = %e, "framewire-view exiting on fatal error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    let addr = format!("{}:{}", cli.host, cli.port);

    tracing::info!(%addr, "connecting");
    // `TcpStream::connect` takes anything `ToSocketAddrs`-like and resolves
    // hostnames itself, unlike parsing straight to `SocketAddr` (which would
    // reject e.g. "localhost").
    let stream = TcpStream::connect(&addr).await.context("failed to connect")?;
    let stream = raise_socket_buffers(stream).context("failed to raise socket buffer sizes")?;
    stream.set_nodelay(true).context("failed to set TCP_NODELAY")?;
    let (reader, _writer) = stream.into_split();

    let framebuffer = Arc::new(RwLock::new(Vec::new()));
    let (version_tx, version_rx) = watch::channel(FrameVersion::default());

    let receiver_fb = framebuffer.clone();
    let receiver_task = tokio::spawn(async move { receiver::run(reader, receiver_fb, version_tx).await });

    let sink = SharedCounterSink::new();
    let stats_interval = Duration::from_secs(cli.stats_interval.max(1));
    let reporter_task = tokio::spawn(presenter::spawn_stats_reporter(sink.clone(), version_rx.clone(), stats_interval));
    let presenter_task = tokio::spawn(presenter::run(framebuffer, version_rx, sink));

    let result = receiver_task.await.context("receiver task panicked")?;
    presenter_task.abort();
    reporter_task.abort();
    result
}

/// Raise `SO_SNDBUF`/`SO_RCVBUF` on an already-connected socket. Round-trips
/// through `socket2` via `into_std`/`from_std`, the same mechanism
/// `framewire-server::server::bind_listener` uses for the listening socket.
fn raise_socket_buffers(stream: TcpStream) -> std::io::Result<TcpStream> {
    let std_stream = stream.into_std()?;
    let socket = socket2::Socket::from(std_stream);
    socket.set_recv_buffer_size(SOCKET_BUF_BYTES)?;
    socket.set_send_buffer_size(SOCKET_BUF_BYTES)?;
    TcpStream::from_std(socket.into())
}
