use serde::Deserialize;

/// `max_clients` hard ceilings per capacity mode.
const SIMPLE_CEILING: usize = 100;
const SCALABLE_CEILING: usize = 10_000;
const DEFAULT_MAX_CLIENTS: usize = 1000;

/// Client-admission mode. `Scalable` is intended for the pooled/worker-style
/// dispatch core; `Simple` caps at a size suitable for thread-per-connection.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CapacityMode {
    Simple,
    #[default]
    Scalable,
}

impl CapacityMode {
    pub fn ceiling(self) -> usize {
        match self {
            CapacityMode::Simple => SIMPLE_CEILING,
            CapacityMode::Scalable => SCALABLE_CEILING,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CapacityConfig {
    #[serde(default)]
    pub mode: CapacityMode,
    /// Resolved from the `MAX_CLIENTS` environment variable by the loader
    /// when absent from the file; defaults to 1000.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self { mode: CapacityMode::default(), max_clients: default_max_clients() }
    }
}

fn default_max_clients() -> usize {
    std::env::var("MAX_CLIENTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CLIENTS)
}
