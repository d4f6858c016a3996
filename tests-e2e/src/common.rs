//! Shared helpers for the broker's end-to-end test binaries.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use rdma_broker_lib::config::{
    CapacityConfig, CapacityMode, Config, RemoteWriteConfig, TelemetryConfig, TimeoutConfig,
    TlsConfig, TlsVersion,
};
use rdma_broker_lib::server::SharedResources;
use rdma_broker_lib::transport::mock::{MockFabric, MockProvider};
use tempfile::NamedTempFile;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub fn pick_free_port() -> TestResult<SocketAddr> {
    let listener = StdTcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Generates a self-signed cert/key pair and writes each to its own temp
/// file, returning the files (kept alive by the caller) and their paths.
pub fn make_self_signed_cert() -> TestResult<(NamedTempFile, NamedTempFile)> {
    use std::io::Write;

    let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])?;
    let cert_pem = cert.cert.pem();
    let key_pem = cert.signing_key.serialize_pem();

    let mut cert_file = NamedTempFile::new()?;
    cert_file.write_all(cert_pem.as_bytes())?;
    let mut key_file = NamedTempFile::new()?;
    key_file.write_all(key_pem.as_bytes())?;

    Ok((cert_file, key_file))
}

pub fn make_config(listen: SocketAddr, max_clients: usize, cert: &NamedTempFile, key: &NamedTempFile) -> Config {
    Config {
        listen,
        data_plane_port: 4791,
        tls: TlsConfig {
            cert_path: cert.path().to_string_lossy().to_string(),
            key_path: key.path().to_string_lossy().to_string(),
            min_version: TlsVersion::V1_2,
            dev_mode: true,
        },
        capacity: CapacityConfig { mode: CapacityMode::Scalable, max_clients },
        cq_fanout: 2,
        buffer_size: 4096,
        remote_write: RemoteWriteConfig::default(),
        timeout: TimeoutConfig { shutdown_drain_secs: 1 },
        telemetry: TelemetryConfig { log_level: "info".to_string(), metrics_addr: None },
    }
}

/// Builds the in-process mock-backed [`SharedResources`] a test server
/// needs. Mirrors what `rdma-broker`'s CLI does for its default build.
pub fn make_shared(max_clients: usize, cq_fanout: usize) -> TestResult<Arc<SharedResources>> {
    make_shared_on_fabric(&MockFabric::new(), max_clients, cq_fanout)
}

/// Like [`make_shared`] but opened against a caller-supplied fabric, so a
/// test's client and server resources are wired together and a `post_send`
/// on one side is observable as a completion on the other's receive CQ.
pub fn make_shared_on_fabric(
    fabric: &MockFabric,
    max_clients: usize,
    cq_fanout: usize,
) -> TestResult<Arc<SharedResources>> {
    let provider = MockProvider::new(fabric.clone());
    Ok(Arc::new(SharedResources::init(&provider, max_clients, cq_fanout)?))
}
