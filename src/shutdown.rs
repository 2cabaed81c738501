//! Cooperative shutdown signalling.
//!
//! A [`Shutdown`] is cloned into every long-running task. Tasks poll
//! [`Shutdown::is_shutting_down`] between units of work and race
//! [`Shutdown::wait`] inside `tokio::select!`.

use std::future::Future;
use tokio::sync::watch;
use tracing::info;

/// Receiving side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Sending side of the shutdown signal. Dropping it also counts as shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Ask every holder of the paired [`Shutdown`] to stop.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    /// Create a manually triggered shutdown pair.
    pub fn new() -> (Self, ShutdownTrigger) {
        let (tx, rx) = watch::channel(false);
        (Self { rx }, ShutdownTrigger { tx })
    }

    /// Create a shutdown handle fired by Ctrl-C or SIGTERM.
    ///
    /// The returned worker future must be spawned for signals to be observed.
    pub fn new_signals() -> (Self, impl Future<Output = ()> + Send + 'static) {
        let (shutdown, trigger) = Self::new();
        let worker = async move {
            wait_for_signal().await;
            trigger.trigger();
        };
        (shutdown, worker)
    }

    /// True once shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve when shutdown is requested.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // An error means the trigger is gone, which is shutdown as well.
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::warn!("failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl-C, shutting down");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received Ctrl-C, shutting down"),
        _ = term.recv() => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl-C, shutting down");
}
