use std::net::SocketAddr;

use serde::Deserialize;

/// Server configuration, overlaid on defaults by an optional TOML file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Network bind address and port.
    pub bind: SocketAddr,

    /// Capture settings.
    pub capture: CaptureConfig,

    /// `tracing` env-filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target capture/encode rate in Hz.
    pub fps: u32,

    /// If set, send a full FRAME (and reset the shadow) at this interval
    /// regardless of dirty-rect traffic. Off by default.
    pub keyframe_interval_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9999".parse().unwrap(),
            capture: CaptureConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            keyframe_interval_secs: None,
        }
    }
}
