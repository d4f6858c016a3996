//! S3: once `max_clients` sessions are admitted, the broker stops handing
//! out slots and a further TCP client is never taken past the TLS handshake.

use std::time::Duration;

use rdma_broker_lib::tls::build_connector;
use rustls_pki_types::ServerName;
use tests_e2e::common::{make_config, make_self_signed_cert, make_shared, pick_free_port, TestResult};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[tokio::test]
async fn rejects_connections_past_max_clients() -> TestResult {
    let listen = pick_free_port()?;
    let (cert, key) = make_self_signed_cert()?;
    let config = make_config(listen, 1, &cert, &key);
    let shared = make_shared(1, config.cq_fanout)?;

    // Pre-admit the table's single slot so the accept loop rejects every
    // incoming connection without needing a live first client held open.
    let occupied_slot = shared.slots.admit()?;

    let server = tokio::spawn(rdma_broker_lib::run(config.clone(), shared.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let connector = build_connector(&config.tls)?;
    let server_name = ServerName::try_from(listen.ip().to_string())?;

    let tcp = TcpStream::connect(listen).await?;
    let handshake = timeout(Duration::from_millis(500), connector.connect(server_name, tcp)).await;
    assert!(
        handshake.is_err(),
        "a connection past capacity must never be accepted far enough to complete a TLS handshake"
    );

    shared.slots.release(occupied_slot);
    server.abort();
    Ok(())
}
