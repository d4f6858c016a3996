//! Client-side bring-up driver, used by the CLI's `client` subcommand and by
//! integration tests. Mirrors the original client's welcome-then-loop shape:
//! the server sends a welcome message as the first post-bring-up send, which
//! callers should drain with [`recv_message`] before issuing their own.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::bringup::bring_up_client;
use crate::connection::Connection;
use crate::error::{BrokerError, Result};
use crate::ops::{post_send, post_write, poll_recv};
use crate::telemetry::Metrics;
use crate::transport::{BufferPool, DevicePool};

/// Runs client-side bring-up over an already-established TLS channel.
pub async fn connect<S: AsyncRead + AsyncWrite + Unpin + Send>(
    channel: S,
    device: &DevicePool,
    buffers: &BufferPool,
    slot_id: usize,
    metrics: &Metrics,
) -> Result<Connection<S>> {
    bring_up_client(channel, device, buffers, slot_id, metrics).await
}

/// Sends `message` over the connection's QP and blocks for one completion.
pub async fn send_message<S>(connection: &mut Connection<S>, message: &str) -> Result<()> {
    post_send(connection.qp.as_ref(), connection.send_cq.as_ref(), message.as_bytes()).await?;
    connection.counters.messages_sent += 1;
    connection.counters.bytes_sent += message.len() as u64;
    Ok(())
}

/// Blocks for the next inbound message and returns it decoded as UTF-8
/// (lossily, matching the original's C-string treatment of the recv buffer).
pub async fn recv_message<S>(connection: &mut Connection<S>) -> Result<String> {
    let bytes = poll_recv(connection.qp.as_ref(), connection.recv_cq.as_ref()).await?;
    connection.counters.messages_received += 1;
    connection.counters.bytes_received += bytes as u64;
    let buf = connection.buffers.recv_buffer.lock().unwrap();
    Ok(String::from_utf8_lossy(&buf[..bytes]).into_owned())
}

/// Convenience: send `message`, then wait for the echoed reply.
pub async fn send_and_receive<S>(connection: &mut Connection<S>, message: &str) -> Result<String> {
    send_message(connection, message).await?;
    recv_message(connection).await
}

/// RDMA-writes `message` directly into the peer's registered receive buffer,
/// bypassing its recv queue entirely; the peer gets no completion and must
/// poll its own memory to notice the write. Mirrors the original client's
/// `write <message>` command. Refuses to run unless the caller passes
/// `remote_write_enabled`, which must come from `config.remote_write.enabled`:
/// this primitive is never reachable from a deployment that leaves the
/// default (disabled) in place.
pub async fn write_message<S>(
    connection: &mut Connection<S>,
    message: &str,
    remote_write_enabled: bool,
) -> Result<()> {
    if !remote_write_enabled {
        return Err(BrokerError::RemoteWriteDisabled);
    }
    post_write(
        connection.qp.as_ref(),
        connection.send_cq.as_ref(),
        message.as_bytes(),
        connection.remote_endpoint.remote_addr,
        connection.remote_endpoint.rkey,
    )
    .await?;
    connection.counters.messages_sent += 1;
    connection.counters.bytes_sent += message.len() as u64;
    Ok(())
}
