use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// `tracing-subscriber` env-filter default, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Optional dedicated counters listener (`HOST:PORT`). When absent, no
    /// metrics endpoint is started.
    #[serde(default)]
    pub metrics_addr: Option<std::net::SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), metrics_addr: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
