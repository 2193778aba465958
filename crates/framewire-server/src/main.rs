use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use framewire_server::{config, server};

/// Presenter-side streaming host for framewire.
///
/// Samples a (currently synthetic) display, XOR-deltas it against a
/// per-viewer shadow framebuffer, and streams the result to any number of
/// connected viewers over plain TCP.
#[derive(Parser, Debug)]
#[command(name = "framewire-serverd", version, about)]
struct Cli {
    /// Address to bind the listener to
    #[arg(long)]
    addr: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Path to a TOML configuration file; overlays the defaults
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Target capture/encode rate, in Hz
    #[arg(long)]
    fps: Option<u32>,

    /// Send a full keyframe at this interval regardless of dirty traffic
    #[arg(long)]
    keyframe_interval_secs: Option<u64>,

    /// Use the built-in procedurally animated screen instead of a real
    /// desktop-duplication backend. Currently the only supported mode.
    #[arg(long)]
    synthetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => config::ServerConfig::default(),
    };

    if let Some(addr) = &cli.addr {
        let port = cfg.bind.port();
        cfg.bind = format!("{addr}:{port}").parse().context("invalid --addr")?;
    }
    if let Some(port) = cli.port {
        let ip = cfg.bind.ip();
        cfg.bind = SocketAddr::new(ip, port);
    }
    if let Some(fps) = cli.fps {
        cfg.capture.fps = fps;
    }
    if cli.keyframe_interval_secs.is_some() {
        cfg.capture.keyframe_interval_secs = cli.keyframe_interval_secs;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cfg.log_filter.clone())),
        )
        .init();

    if !cli.synthetic {
        anyhow::bail!(
            "no platform capture backend is compiled into framewire-serverd; pass --synthetic to run the built-in demo source"
        );
    }

    tracing::info!(bind = %cfg.bind, fps = cfg.capture.fps, "starting framewire-serverd");

    server::run(server::RunConfig {
        bind: cfg.bind,
        fps: cfg.capture.fps,
        keyframe_interval: cfg.capture.keyframe_interval_secs.map(Duration::from_secs),
    })
    .await
    .context("server error")
}
