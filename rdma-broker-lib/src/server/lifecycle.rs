//! Process-wide running flag, signal handling, and shutdown drain.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{BrokerError, Result};

/// Governs the accept loop and every live connection handler. Flipped once,
/// by a signal, and never reset. `stop` also notifies every outstanding
/// `watch::Receiver` obtained through `subscribe`, so a per-connection loop
/// can `select!` on it the same way the accept loop selects on `is_running`.
#[derive(Clone)]
pub struct RunningFlag {
    flag: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl RunningFlag {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { flag: Arc::new(AtomicBool::new(true)), shutdown_tx }
    }

    pub fn is_running(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.flag.store(false, Ordering::Relaxed);
        let _ = self.shutdown_tx.send(true);
    }

    /// Hands a connection handler a receiver it can `select!` on at its loop
    /// head to notice shutdown without polling `is_running`.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SignalHandles {
    pub sigterm: Signal,
    pub sigint: Signal,
}

pub fn install_signal_handlers() -> Result<SignalHandles> {
    let sigterm = signal(SignalKind::terminate())
        .map_err(|e| BrokerError::Io(std::io::Error::other(format!("SIGTERM handler: {e}"))))?;
    let sigint = signal(SignalKind::interrupt())
        .map_err(|e| BrokerError::Io(std::io::Error::other(format!("SIGINT handler: {e}"))))?;
    Ok(SignalHandles { sigterm, sigint })
}

/// Waits for every tracked connection to close, or `drain_timeout`, whichever
/// comes first. `active` and `closed_rx` are shared with the per-connection
/// guards that decrement the counter and fire the watch channel on the last
/// release.
pub async fn wait_for_drain(
    active: &AtomicUsize,
    closed_rx: &mut watch::Receiver<()>,
    drain_timeout: Duration,
) {
    if active.load(Ordering::Relaxed) == 0 {
        return;
    }

    let deadline = Instant::now() + drain_timeout;
    tokio::select! {
        _ = closed_rx.changed() => {
            let remaining = active.load(Ordering::Relaxed);
            if remaining == 0 {
                tracing::info!("all connections drained");
            } else {
                tracing::warn!(remaining, "drain notified but connections remain active");
            }
        }
        _ = tokio::time::sleep_until(deadline) => {
            let remaining = active.load(Ordering::Relaxed);
            if remaining > 0 {
                tracing::warn!(remaining, "shutdown drain timeout reached");
            } else {
                tracing::info!("all connections drained");
            }
        }
    }
}

/// Decrements `active` and notifies `closed_tx` when it reaches zero. Mirrors
/// the guard pattern used for connection-count bookkeeping elsewhere in the
/// codebase.
pub struct ConnectionGuard {
    active: Arc<AtomicUsize>,
    closed_tx: watch::Sender<()>,
}

impl ConnectionGuard {
    pub fn new(active: Arc<AtomicUsize>, closed_tx: watch::Sender<()>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self { active, closed_tx }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.active.fetch_sub(1, Ordering::Relaxed) - 1;
        if remaining == 0 {
            let _ = self.closed_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_for_drain_returns_immediately_when_nothing_is_active() {
        let active = AtomicUsize::new(0);
        let (_tx, mut rx) = watch::channel(());
        let started = Instant::now();
        wait_for_drain(&active, &mut rx, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn wait_for_drain_returns_early_once_last_guard_drops() {
        let active = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = watch::channel(());
        let guard = ConnectionGuard::new(active.clone(), tx);
        assert_eq!(active.load(Ordering::Relaxed), 1);

        let active_for_drop = active.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });

        let started = Instant::now();
        wait_for_drain(&active, &mut rx, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(active_for_drop.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn wait_for_drain_times_out_when_a_connection_never_closes() {
        let active = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = watch::channel(());
        let _guard = ConnectionGuard::new(active.clone(), tx);

        let started = Instant::now();
        wait_for_drain(&active, &mut rx, Duration::from_millis(50)).await;
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(active.load(Ordering::Relaxed), 1, "guard was never dropped");
    }
}
