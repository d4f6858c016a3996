//! The optional metrics listener serves Prometheus exposition text and its
//! admission counter reflects connections that pass through the broker.

use std::time::Duration;

use rdma_broker_lib::tls::build_connector;
use rustls_pki_types::ServerName;
use tests_e2e::common::{make_config, make_self_signed_cert, make_shared, pick_free_port, TestResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn scrape(addr: std::net::SocketAddr) -> TestResult<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(b"GET /metrics HTTP/1.1\r\n\r\n").await?;
    stream.shutdown().await?;
    let mut body = String::new();
    stream.read_to_string(&mut body).await?;
    Ok(body)
}

#[tokio::test]
async fn metrics_endpoint_reports_admitted_connections() -> TestResult {
    let listen = pick_free_port()?;
    let metrics_addr = pick_free_port()?;
    let (cert, key) = make_self_signed_cert()?;
    let mut config = make_config(listen, 4, &cert, &key);
    config.telemetry.metrics_addr = Some(metrics_addr);
    let shared = make_shared(4, config.cq_fanout)?;

    let server = tokio::spawn(rdma_broker_lib::run(config.clone(), shared));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let before = scrape(metrics_addr).await?;
    assert!(before.contains("rdma_broker_connections_admitted_total 0"));
    assert!(before.contains("HTTP/1.1 200 OK"));

    let connector = build_connector(&config.tls)?;
    let server_name = ServerName::try_from(listen.ip().to_string())?;
    let tcp = TcpStream::connect(listen).await?;
    // Only drive the TLS handshake; one admitted session is enough to move
    // the counter, we don't need a full bring-up for this test.
    let _tls = timeout(Duration::from_secs(2), connector.connect(server_name, tcp)).await??;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let after = scrape(metrics_addr).await?;
    assert!(after.contains("rdma_broker_connections_admitted_total 1"));

    server.abort();
    Ok(())
}
