//! Broker counters: admitted/rejected/active connections, completion
//! errors, PSN draws, and fallback-RNG uses. Rendered as Prometheus
//! exposition text over a plain-text responder, mirroring the connection
//! counter exposed elsewhere in this codebase rather than pulling in a full
//! HTTP stack for five gauges.

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

#[derive(Debug, Default)]
pub struct Metrics {
    admitted_total: AtomicU64,
    rejected_total: AtomicU64,
    active: AtomicU64,
    completion_errors_total: AtomicU64,
    psn_draws_total: AtomicU64,
    psn_fallback_rng_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub admitted_total: u64,
    pub rejected_total: u64,
    pub active: u64,
    pub completion_errors_total: u64,
    pub psn_draws_total: u64,
    pub psn_fallback_rng_total: u64,
}

impl Metrics {
    pub fn record_admitted(&self) {
        self.admitted_total.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_released(&self) {
        self.active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1))
            .ok();
    }

    pub fn record_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion_error(&self) {
        self.completion_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_psn_draw(&self) {
        self.psn_draws_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_psn_fallback_rng(&self) {
        self.psn_fallback_rng_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted_total: self.admitted_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            completion_errors_total: self.completion_errors_total.load(Ordering::Relaxed),
            psn_draws_total: self.psn_draws_total.load(Ordering::Relaxed),
            psn_fallback_rng_total: self.psn_fallback_rng_total.load(Ordering::Relaxed),
        }
    }

    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            "# HELP rdma_broker_connections_admitted_total Connections admitted past the slot table\n\
             # TYPE rdma_broker_connections_admitted_total counter\n\
             rdma_broker_connections_admitted_total {admitted}\n\
             # HELP rdma_broker_connections_rejected_total Connections rejected at admission\n\
             # TYPE rdma_broker_connections_rejected_total counter\n\
             rdma_broker_connections_rejected_total {rejected}\n\
             # HELP rdma_broker_connections_active Currently connected clients\n\
             # TYPE rdma_broker_connections_active gauge\n\
             rdma_broker_connections_active {active}\n\
             # HELP rdma_broker_completion_errors_total Work-completion errors observed\n\
             # TYPE rdma_broker_completion_errors_total counter\n\
             rdma_broker_completion_errors_total {errors}\n\
             # HELP rdma_broker_psn_draws_total PSNs drawn from the CSPRNG\n\
             # TYPE rdma_broker_psn_draws_total counter\n\
             rdma_broker_psn_draws_total {psn_draws}\n\
             # HELP rdma_broker_psn_fallback_rng_total PSNs drawn from the non-cryptographic fallback\n\
             # TYPE rdma_broker_psn_fallback_rng_total counter\n\
             rdma_broker_psn_fallback_rng_total {psn_fallback}\n",
            admitted = s.admitted_total,
            rejected = s.rejected_total,
            active = s.active,
            errors = s.completion_errors_total,
            psn_draws = s.psn_draws_total,
            psn_fallback = s.psn_fallback_rng_total,
        )
    }
}

/// Serves the current snapshot as Prometheus exposition text on every
/// accepted connection, then closes it. Runs until the listener errors.
pub async fn serve(addr: SocketAddr, metrics: Arc<Metrics>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics endpoint listening");
    loop {
        let (mut stream, _peer) = listener.accept().await?;
        let body = metrics.to_prometheus();
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain; version=0.0.4\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        tokio::spawn(async move {
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_and_release_balance_the_active_gauge() {
        let metrics = Metrics::default();
        metrics.record_admitted();
        metrics.record_admitted();
        assert_eq!(metrics.snapshot().active, 2);
        metrics.record_released();
        assert_eq!(metrics.snapshot().active, 1);
    }

    #[test]
    fn prometheus_text_contains_every_counter_name() {
        let metrics = Metrics::default();
        metrics.record_admitted();
        metrics.record_rejected();
        metrics.record_completion_error();
        metrics.record_psn_draw();
        metrics.record_psn_fallback_rng();

        let text = metrics.to_prometheus();
        for name in [
            "rdma_broker_connections_admitted_total",
            "rdma_broker_connections_rejected_total",
            "rdma_broker_connections_active",
            "rdma_broker_completion_errors_total",
            "rdma_broker_psn_draws_total",
            "rdma_broker_psn_fallback_rng_total",
        ] {
            assert!(text.contains(name), "missing metric: {name}");
        }
    }
}
