use serde::Deserialize;

/// TLS version floor. The control plane requires at least 1.2.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    V1_2,
    #[serde(rename = "1.3")]
    V1_3,
}

/// TLS termination configuration for the control plane.
#[derive(Debug, Deserialize, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format).
    pub cert_path: String,
    /// Path to the TLS private key file (PEM format).
    pub key_path: String,
    /// Minimum negotiated TLS version. Must be at least 1.2.
    #[serde(default = "default_min_version")]
    pub min_version: TlsVersion,
    /// Disables peer certificate verification on the client side. Development
    /// only; must never be the default in a production profile.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_min_version() -> TlsVersion {
    TlsVersion::V1_2
}
