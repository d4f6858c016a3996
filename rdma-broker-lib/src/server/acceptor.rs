//! Acceptor and per-connection dispatch. One supervisor task listens
//! on the TLS control-plane port; each accepted session is admitted,
//! brought up, and handed to its own task running the echo operation loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::bringup::bring_up_server;
use crate::config::Config;
use crate::connection::Connection;
use crate::error::Result;
use crate::ops::{poll_recv, post_send};
use crate::telemetry::Metrics;
use crate::tls::build_acceptor;

use super::lifecycle::{install_signal_handlers, wait_for_drain, ConnectionGuard, RunningFlag};
use super::shared::SharedResources;

/// Runs the control-plane accept loop until a shutdown signal arrives, then
/// drains in-flight connections before returning.
pub async fn run(config: Config, shared: Arc<SharedResources>) -> Result<()> {
    let listener = TcpListener::bind(config.listen).await?;
    let tls_acceptor = build_acceptor(&config.tls)?;
    let metrics = Arc::new(Metrics::default());

    if let Some(addr) = config.telemetry.metrics_addr {
        let metrics = metrics.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::telemetry::serve_metrics(addr, metrics).await {
                tracing::warn!(error = %e, "metrics endpoint stopped");
            }
        });
    }

    let running = RunningFlag::new();
    let mut signals = install_signal_handlers()?;
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (closed_tx, mut closed_rx) = watch::channel(());

    tracing::info!(listen = %config.listen, "broker listening");

    loop {
        tokio::select! {
            _ = signals.sigterm.recv() => {
                tracing::info!("received SIGTERM, initiating graceful shutdown");
                running.stop();
                break;
            }
            _ = signals.sigint.recv() => {
                tracing::info!("received SIGINT, initiating graceful shutdown");
                running.stop();
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept error");
                        continue;
                    }
                };

                if !running.is_running() {
                    tracing::info!(%peer, "shutdown requested, rejecting new connection");
                    continue;
                }

                let slot_id = match shared.slots.admit() {
                    Ok(slot_id) => slot_id,
                    Err(e) => {
                        metrics.record_rejected();
                        tracing::warn!(%peer, active = shared.slots.active_count(), "rejecting connection: {e}");
                        continue;
                    }
                };
                metrics.record_admitted();

                let shared = shared.clone();
                let tls_acceptor = tls_acceptor.clone();
                let guard_counter = active_connections.clone();
                let closed_tx = closed_tx.clone();
                let metrics = metrics.clone();
                let shutdown_rx = running.subscribe();

                tokio::spawn(async move {
                    let _guard = ConnectionGuard::new(guard_counter, closed_tx);
                    if let Err(e) = handle_session(
                        stream,
                        tls_acceptor,
                        shared.clone(),
                        slot_id,
                        metrics.clone(),
                        shutdown_rx,
                    )
                    .await
                    {
                        metrics.record_completion_error();
                        tracing::warn!(slot_id, %peer, error = %e, "connection ended with error");
                    }
                    shared.slots.release(slot_id);
                    metrics.record_released();
                });
            }
        }
    }

    let shutdown_drain = Duration::from_secs(config.timeout.shutdown_drain_secs);
    wait_for_drain(&active_connections, &mut closed_rx, shutdown_drain).await;
    tracing::info!("broker stopped");
    Ok(())
}

async fn handle_session(
    stream: tokio::net::TcpStream,
    tls_acceptor: tokio_rustls::TlsAcceptor,
    shared: Arc<SharedResources>,
    slot_id: usize,
    metrics: Arc<Metrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let tls_stream = tls_acceptor.accept(stream).await?;
    let mut connection =
        bring_up_server(tls_stream, &shared.device, &shared.buffers, slot_id, &metrics).await?;

    let welcome = format!(
        "Welcome Client {slot_id}! Server PSN: 0x{:06x}, Your PSN: 0x{:06x}",
        connection.local_psn, connection.remote_psn
    );
    post_send(connection.qp.as_ref(), connection.send_cq.as_ref(), welcome.as_bytes()).await?;
    connection.counters.messages_sent += 1;

    let result = echo_loop(&mut connection, slot_id, &mut shutdown_rx).await;
    shared.buffers.release(connection.buffers.chunk_id);
    result
}

/// Runs the echo exchange until the client closes or a shutdown signal is
/// observed at the loop head; either path moves the connection to `Closing`.
async fn echo_loop<S>(
    connection: &mut Connection<S>,
    slot_id: usize,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *shutdown_rx.borrow() {
            tracing::info!(slot_id, "shutdown observed, closing connection");
            connection.mark_closing();
            return Ok(());
        }

        let bytes = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                tracing::info!(slot_id, "shutdown observed, closing connection");
                connection.mark_closing();
                return Ok(());
            }
            result = poll_recv(connection.qp.as_ref(), connection.recv_cq.as_ref()) => {
                match result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        connection.counters.completion_errors += 1;
                        return Err(e);
                    }
                }
            }
        };
        connection.counters.messages_received += 1;
        connection.counters.bytes_received += bytes as u64;

        let received = {
            let buf = connection.buffers.recv_buffer.lock().unwrap();
            String::from_utf8_lossy(&buf[..bytes]).into_owned()
        };
        tracing::debug!(slot_id, bytes, "received message");

        if received.is_empty() {
            return Ok(());
        }

        let response = format!("Server echo [Client {slot_id}]: {received}");
        post_send(connection.qp.as_ref(), connection.send_cq.as_ref(), response.as_bytes()).await?;
        connection.counters.messages_sent += 1;
        connection.counters.bytes_sent += response.len() as u64;
    }
}
