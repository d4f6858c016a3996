//! S6: a slot released at the end of one session is handed to the very next
//! admission, and a fresh client can bring up a connection on it cleanly.

use std::time::Duration;

use rdma_broker_lib::telemetry::Metrics;
use rdma_broker_lib::tls::build_connector;
use rdma_broker_lib::transport::mock::MockFabric;
use rustls_pki_types::ServerName;
use tests_e2e::common::{make_config, make_self_signed_cert, make_shared_on_fabric, pick_free_port, TestResult};
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn run_one_client(
    listen: std::net::SocketAddr,
    config: &rdma_broker_lib::Config,
    client_shared: &std::sync::Arc<rdma_broker_lib::server::SharedResources>,
) -> TestResult<usize> {
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

    let _welcome = timeout(Duration::from_secs(2), rdma_broker_lib::client::recv_message(&mut connection)).await??;
    let reply = timeout(
        Duration::from_secs(2),
        rdma_broker_lib::client::send_and_receive(&mut connection, "hi"),
    )
    .await??;
    assert!(reply.contains("hi"));

    // An empty message is the session's documented close signal: it ends
    // the server's echo loop so the slot that served this client is
    // released before the next admission is attempted.
    timeout(Duration::from_secs(2), rdma_broker_lib::client::send_message(&mut connection, "")).await??;

    client_shared.buffers.release(connection.buffers.chunk_id);
    client_shared.slots.release(slot_id);
    Ok(slot_id)
}

#[tokio::test]
async fn a_released_slot_serves_the_next_client() -> TestResult {
    let listen = pick_free_port()?;
    let (cert, key) = make_self_signed_cert()?;
    let config = make_config(listen, 1, &cert, &key);

    let fabric = MockFabric::new();
    let server_shared = make_shared_on_fabric(&fabric, 1, config.cq_fanout)?;
    let server_slots = server_shared.clone();
    let server = tokio::spawn(rdma_broker_lib::run(config.clone(), server_shared));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client_shared = make_shared_on_fabric(&fabric, 1, config.cq_fanout)?;

    let first_slot = run_one_client(listen, &config, &client_shared).await?;

    for _ in 0..40 {
        if server_slots.slots.active_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(server_slots.slots.active_count(), 0, "server must release the first session's slot");

    let second_slot = run_one_client(listen, &config, &client_shared).await?;
    assert_eq!(first_slot, second_slot, "the table only has one slot; both clients must use it");

    server.abort();
    Ok(())
}
