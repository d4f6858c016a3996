//! S1: a single client connects, receives the welcome message, and gets its
//! own message echoed back.

use std::sync::Arc;
use std::time::Duration;

use rdma_broker_lib::telemetry::Metrics;
use rdma_broker_lib::tls::build_connector;
use rdma_broker_lib::transport::mock::MockFabric;
use rustls_pki_types::ServerName;
use tests_e2e::common::{make_config, make_self_signed_cert, make_shared_on_fabric, pick_free_port, TestResult};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[tokio::test]
async fn client_receives_welcome_then_its_own_echo() -> TestResult {
    let listen = pick_free_port()?;
    let (cert, key) = make_self_signed_cert()?;
    let config = make_config(listen, 4, &cert, &key);

    let fabric = MockFabric::new();
    let server_shared = make_shared_on_fabric(&fabric, 4, config.cq_fanout)?;

    let server = tokio::spawn(rdma_broker_lib::run(config.clone(), server_shared));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client_shared = make_shared_on_fabric(&fabric, 4, config.cq_fanout)?;
    let slot_id = client_shared.slots.admit()?;

    let connector = build_connector(&config.tls)?;
    let tcp = TcpStream::connect(listen).await?;
    let server_name = ServerName::try_from(listen.ip().to_string())?;
    let tls_stream = connector.connect(server_name, tcp).await?;

    let metrics = Metrics::default();
    let mut connection = timeout(
        Duration::from_secs(2),
        rdma_broker_lib::client::connect(tls_stream, &client_shared.device, &client_shared.buffers, slot_id, &metrics),
    )
    .await??;

    let welcome = timeout(Duration::from_secs(2), rdma_broker_lib::client::recv_message(&mut connection)).await??;
    assert!(welcome.starts_with("Welcome Client"), "unexpected welcome: {welcome}");

    let reply = timeout(
        Duration::from_secs(2),
        rdma_broker_lib::client::send_and_receive(&mut connection, "ping"),
    )
    .await??;
    assert_eq!(reply, "Server echo [Client 0]: ping");

    client_shared.buffers.release(connection.buffers.chunk_id);
    client_shared.slots.release(slot_id);
    server.abort();
    Ok(())
}
