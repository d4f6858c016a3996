use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Bound on how long shutdown waits for in-flight handlers to observe
    /// the running flag and exit before resources are reclaimed anyway.
    #[serde(default = "default_shutdown_drain_secs")]
    pub shutdown_drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { shutdown_drain_secs: default_shutdown_drain_secs() }
    }
}

fn default_shutdown_drain_secs() -> u64 {
    5
}
