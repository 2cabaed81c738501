//! Operator-triggered reloads.
//!
//! At most one reload can be pending. Requests arriving while one is queued
//! are dropped, since the queued one will already pick up the latest state.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

use crate::metrics;
use crate::shutdown::Shutdown;

/// Handle used to request a reload.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<()>,
}

/// Create a reload handle and the receiver the poller listens on.
pub fn channel() -> (ReloadHandle, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (ReloadHandle { tx }, rx)
}

impl ReloadHandle {
    /// Queue a reload. Returns `false` if one was already pending or the
    /// poller is gone.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                info!("reload already pending, dropping request");
                metrics::record_reload_dropped();
                false
            }
            Err(TrySendError::Closed(())) => {
                debug!("reload requested after poller stopped");
                false
            }
        }
    }
}

/// Translate SIGUSR1 into reload requests until shutdown.
#[cfg(unix)]
pub async fn listen_signals(handle: ReloadHandle, shutdown: Shutdown) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1())?;
    loop {
        tokio::select! {
            received = usr1.recv() => {
                if received.is_none() {
                    return Ok(());
                }
                info!("received SIGUSR1, reloading");
                handle.request();
            }
            _ = shutdown.wait() => {
                debug!("reload signal listener shutting down");
                return Ok(());
            }
        }
    }
}

/// Reload signals are not available on this platform.
#[cfg(not(unix))]
pub async fn listen_signals(_handle: ReloadHandle, shutdown: Shutdown) -> std::io::Result<()> {
    shutdown.wait().await;
    Ok(())
}
