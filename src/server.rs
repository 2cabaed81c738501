//! DNS server setup and lifecycle management.

use hickory_server::authority::{AuthorityObject, Catalog};
use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{debug, error, info};

use crate::authority::MesosAuthority;
use crate::config::Config;
use crate::error::DnsError;
use crate::poller::Poller;
use crate::reload::{self, ReloadHandle};
use crate::shutdown::Shutdown;
use crate::state::DnsState;

/// Interval for emitting state metrics.
const METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically emit state metrics.
async fn metrics_loop(state: DnsState, shutdown: Shutdown) {
    let mut interval = tokio::time::interval(METRICS_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                state.emit_metrics();
                let records = state.snapshot();
                debug!(
                    a_names = records.a.len(),
                    srv_names = records.srv.len(),
                    serial = state.serial(),
                    "emitted state metrics"
                );
            }
            _ = shutdown.wait() => {
                debug!("metrics loop shutting down");
                return;
            }
        }
    }
}

/// Build a catalog serving `state` under the configured domain.
pub fn build_catalog(config: &Config, state: DnsState) -> Result<Catalog, DnsError> {
    let authority = MesosAuthority::new(config.dns.clone(), state)?;
    let origin = authority.origin().clone();

    let mut catalog = Catalog::new();
    let authority: Arc<dyn AuthorityObject> = Arc::new(authority);
    catalog.upsert(origin, vec![authority]);
    Ok(catalog)
}

/// DNS server backed by periodically polled Mesos master state.
pub struct DnsServer {
    config: Config,
    state: DnsState,
    reload: ReloadHandle,
    reload_rx: tokio::sync::mpsc::Receiver<()>,
}

impl DnsServer {
    /// Create a new DNS server with the given configuration.
    pub fn new(config: Config) -> Self {
        let (reload, reload_rx) = reload::channel();
        Self {
            config,
            state: DnsState::new(),
            reload,
            reload_rx,
        }
    }

    /// Get a reference to the DNS state.
    pub fn state(&self) -> &DnsState {
        &self.state
    }

    /// Run the DNS server until shutdown is requested.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), DnsError> {
        let listen_addr = self.config.dns.listen_addr;
        info!(
            %listen_addr,
            domain = %self.config.dns.domain,
            masters = ?self.config.mesos.masters,
            "Starting mesos-dns server"
        );

        // Validate before spawning anything.
        let catalog = build_catalog(&self.config, self.state.clone())?;
        let poller = Poller::new(&self.config, self.state.clone())?;

        let poll_shutdown = shutdown.clone();
        let reload_rx = self.reload_rx;
        let poll_handle = tokio::spawn(async move {
            poller.run(reload_rx, poll_shutdown).await;
        });

        let signal_handle = tokio::spawn({
            let reload = self.reload.clone();
            let shutdown = shutdown.clone();
            async move {
                if let Err(e) = reload::listen_signals(reload, shutdown).await {
                    error!("Reload signal listener error: {}", e);
                }
            }
        });

        // Wait for the first generation before answering queries.
        info!("Waiting for initial record generation...");
        loop {
            if shutdown.is_shutting_down() {
                info!("Shutdown requested before first generation completed");
                let _ = poll_handle.await;
                let _ = signal_handle.await;
                return Ok(());
            }

            if self.state.is_ready() {
                let records = self.state.snapshot();
                info!(
                    a_names = records.a.len(),
                    srv_names = records.srv.len(),
                    "Initial record generation complete"
                );
                break;
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut server = ServerFuture::new(catalog);

        // Bind UDP
        let udp_socket = UdpSocket::bind(listen_addr).await?;
        info!(addr = %listen_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(listen_addr).await?;
        info!(addr = %listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, Duration::from_secs(30));

        info!(domain = %self.config.dns.domain, "DNS server ready to serve queries");

        let metrics_handle = tokio::spawn(metrics_loop(self.state.clone(), shutdown.clone()));

        // Emit initial metrics
        self.state.emit_metrics();

        tokio::select! {
            _ = shutdown.wait() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!("DNS server error: {}", e);
                }
            }
        }

        let _ = metrics_handle.await;

        info!("Waiting for poller to stop...");
        let _ = poll_handle.await;
        let _ = signal_handle.await;

        info!("DNS server stopped");
        Ok(())
    }
}
