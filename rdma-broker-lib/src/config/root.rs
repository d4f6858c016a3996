use serde::Deserialize;
use std::net::SocketAddr;

use super::capacity::CapacityConfig;
use super::remote_write::RemoteWriteConfig;
use super::telemetry::TelemetryConfig;
use super::timeout::TimeoutConfig;
use super::tls::TlsConfig;

fn default_listen() -> SocketAddr {
    "0.0.0.0:4433".parse().expect("valid default listen address")
}

fn default_data_plane_port() -> u16 {
    4791
}

fn default_cq_fanout() -> usize {
    4
}

fn default_buffer_size() -> usize {
    4096
}

/// Top-level broker configuration, loaded from a TOML document.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Control-plane TLS listen address.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Informational only: the core never binds this port itself.
    #[serde(default = "default_data_plane_port")]
    pub data_plane_port: u16,
    /// TLS certificate/key material and version policy.
    pub tls: TlsConfig,
    /// Client-slot capacity mode and limit.
    #[serde(default)]
    pub capacity: CapacityConfig,
    /// Completion-queue fan-out width (`W` in the design).
    #[serde(default = "default_cq_fanout")]
    pub cq_fanout: usize,
    /// Per-buffer octet size for the send/receive buffer pool.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Whether `post_write` and remote-key exposure are offered at all.
    #[serde(default)]
    pub remote_write: RemoteWriteConfig,
    /// Shutdown and drain timeouts.
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Logging and metrics configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
