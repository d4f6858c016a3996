//! S4: a client that completes the PSN exchange but hangs up before sending
//! a full endpoint descriptor must not wedge the broker. The session ends
//! in error and its slot comes back for the next caller.

use std::time::Duration;

use rdma_broker_lib::protocol::encode_psn;
use rdma_broker_lib::tls::build_connector;
use rustls_pki_types::ServerName;
use tests_e2e::common::{make_config, make_self_signed_cert, make_shared, pick_free_port, TestResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn truncated_endpoint_descriptor_releases_the_slot() -> TestResult {
    let listen = pick_free_port()?;
    let (cert, key) = make_self_signed_cert()?;
    let config = make_config(listen, 2, &cert, &key);
    let shared = make_shared(2, config.cq_fanout)?;

    let server = tokio::spawn(rdma_broker_lib::run(config.clone(), shared.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let connector = build_connector(&config.tls)?;
    let server_name = ServerName::try_from(listen.ip().to_string())?;

    {
        let tcp = TcpStream::connect(listen).await?;
        let mut tls = connector.connect(server_name.clone(), tcp).await?;

        // Hold up our end of the PSN exchange, then read the server's half
        // so the exchange completes, but close before sending any part of
        // the endpoint descriptor the server is about to wait for.
        tls.write_all(&encode_psn(0x0000_0001)).await?;
        let mut psn_buf = [0u8; 4];
        tls.read_exact(&mut psn_buf).await?;
        tls.shutdown().await?;
        drop(tls);
    }

    // The server notices the dropped connection on its own task; give it a
    // moment rather than racing the assertion against that task's schedule.
    let mut released = false;
    for _ in 0..20 {
        if shared.slots.active_count() == 0 {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(released, "the aborted session's slot must be released");

    // The table still has capacity: the release was real, not just pending.
    let slot_id = shared.slots.admit()?;
    assert_eq!(slot_id, 0);
    shared.slots.release(slot_id);

    server.abort();
    Ok(())
}
