use serde::Deserialize;

/// Gates `post_write` and remote-key exposure. Default-off: every connected
/// client can otherwise remote-write into the server's recv buffer, which is
/// a security hazard in a multi-tenant deployment.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RemoteWriteConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl Default for RemoteWriteConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}
