//! Per-connection bring-up. Runs independently per connection once a
//! TLS channel exists. Client and server differ only in exchange ordering,
//! asymmetric so neither side blocks writing while the other is also
//! writing on a duplex that is not guaranteed full-duplex; every other step
//! is identical.

use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};

use super::state::ConnectionState;
use crate::connection::{Connection, ConnectionCounters};
use crate::error::Result;
use crate::protocol::{
    exchange_endpoint_client, exchange_endpoint_server, exchange_psn_client, exchange_psn_server,
    EndpointDescriptor,
};
use crate::psn::draw_psn;
use crate::telemetry::Metrics;
use crate::transport::verbs::AccessFlags;
use crate::transport::{BufferPool, DevicePool};

enum Role {
    Client,
    Server,
}

/// Runs client-side bring-up to completion and returns the live connection,
/// parked at `CONNECTED`.
pub async fn bring_up_client<S: AsyncRead + AsyncWrite + Unpin + Send>(
    channel: S,
    device: &DevicePool,
    buffers: &BufferPool,
    slot_id: usize,
    metrics: &Metrics,
) -> Result<Connection<S>> {
    bring_up(channel, device, buffers, slot_id, Role::Client, metrics).await
}

/// Runs server-side bring-up to completion and returns the live connection,
/// parked at `CONNECTED`.
pub async fn bring_up_server<S: AsyncRead + AsyncWrite + Unpin + Send>(
    channel: S,
    device: &DevicePool,
    buffers: &BufferPool,
    slot_id: usize,
    metrics: &Metrics,
) -> Result<Connection<S>> {
    bring_up(channel, device, buffers, slot_id, Role::Server, metrics).await
}

async fn bring_up<S: AsyncRead + AsyncWrite + Unpin + Send>(
    mut channel: S,
    device: &DevicePool,
    buffers: &BufferPool,
    slot_id: usize,
    role: Role,
    metrics: &Metrics,
) -> Result<Connection<S>> {
    let mut state = ConnectionState::TlsHandshake;
    tracing::debug!(slot_id, ?state, "bring-up started");

    // Step 1-2: draw and exchange PSNs. Asymmetric ordering avoids a
    // write-write stall.
    let (local_psn, used_fallback_rng) = draw_psn();
    metrics.record_psn_draw();
    if used_fallback_rng {
        metrics.record_psn_fallback_rng();
    }
    state = ConnectionState::PsnExchange;
    tracing::debug!(slot_id, ?state, "psn exchange");
    let remote_psn = match role {
        Role::Client => exchange_psn_client(&mut channel, local_psn).await?,
        Role::Server => exchange_psn_server(&mut channel, local_psn).await?,
    };

    state = ConnectionState::RdmaSetup;
    tracing::debug!(slot_id, ?state, "rdma setup");

    // Step 3: allocate buffers, register MRs, create a QP bound to CQ
    // `slot_id mod W`.
    let port = device.context().query_port()?;
    let buffer_slab = buffers.alloc()?;
    let pd = device.pd();
    let recv_mr = pd.register_mr(buffer_slab.recv_buffer.clone(), AccessFlags::FULL)?;
    let send_mr = pd.register_mr(buffer_slab.send_buffer.clone(), AccessFlags::FULL)?;

    let cq = device.cq_for(slot_id).clone();
    let qp = device.context().create_qp(
        pd,
        &cq,
        &cq,
        recv_mr.as_ref(),
        buffer_slab.recv_buffer.clone(),
        send_mr.as_ref(),
        buffer_slab.send_buffer.clone(),
    )?;

    // Step 4: construct the local endpoint descriptor.
    let local_endpoint = EndpointDescriptor::new(
        qp.qp_num(),
        port.lid,
        port.gid,
        local_psn,
        recv_mr.rkey(),
        recv_mr.addr(),
    );

    // Step 5: exchange endpoint descriptors, asymmetric again.
    let remote_endpoint = match role {
        Role::Client => exchange_endpoint_client(&mut channel, &local_endpoint).await?,
        Role::Server => exchange_endpoint_server(&mut channel, &local_endpoint).await?,
    };
    debug_assert_eq!(remote_endpoint.psn, remote_psn, "remote PSN must match the earlier exchange");

    // Step 6: verbs state transitions, identical on both sides.
    qp.modify_to_init(AccessFlags::FULL)?;
    qp.modify_to_rtr(&remote_endpoint, port.link_layer)?;
    qp.modify_to_rts(local_psn)?;

    // Step 7: CONNECTED, then arm receives so inbound sends do not stall.
    state = ConnectionState::Connected;
    tracing::info!(slot_id, qp_num = qp.qp_num(), "connection bring-up complete");
    qp.post_recv()?;

    Ok(Connection {
        slot_id,
        state,
        tls_channel: channel,
        local_psn,
        remote_psn,
        qp,
        send_cq: cq.clone(),
        recv_cq: cq,
        send_mr,
        recv_mr,
        buffers: buffer_slab,
        local_endpoint,
        remote_endpoint,
        connected_at: Instant::now(),
        counters: ConnectionCounters::default(),
    })
}
