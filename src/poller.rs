//! Periodic refresh of the record set from the Mesos masters.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{Config, MesosConfig};
use crate::error::DnsError;
use crate::generator::{generate, GeneratorOptions};
use crate::metrics::{self, GenerationOutcome, ReloadReason, Timer};
use crate::shutdown::Shutdown;
use crate::snapshot::{Pid, State};
use crate::state::DnsState;

/// Fetches master state and replaces the served records.
///
/// A failed cycle leaves the previous generation in place.
pub struct Poller {
    client: reqwest::Client,
    mesos: MesosConfig,
    opts: GeneratorOptions,
    state: DnsState,
}

impl Poller {
    /// Create a poller writing into `state`.
    pub fn new(config: &Config, state: DnsState) -> Result<Self, DnsError> {
        if config.mesos.masters.is_empty() {
            return Err(DnsError::Config(
                "mesos.masters must list at least one master".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.mesos.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            mesos: config.mesos.clone(),
            opts: GeneratorOptions::from_config(config),
            state,
        })
    }

    fn state_url(&self, master: &str) -> String {
        if master.contains("://") {
            format!("{}{}", master.trim_end_matches('/'), self.mesos.state_path)
        } else {
            format!("http://{}{}", master, self.mesos.state_path)
        }
    }

    async fn fetch_from(&self, master: &str) -> Result<State, DnsError> {
        let url = self.state_url(master);
        debug!(%url, "fetching master state");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        State::from_json(&body)
    }

    /// Fetch state from the first master that answers.
    ///
    /// When the answering master names a different leader, the state is
    /// fetched again from the leader once; if that fails the first answer is
    /// used.
    pub async fn fetch_state(&self) -> Result<State, DnsError> {
        for master in &self.mesos.masters {
            let state = match self.fetch_from(master).await {
                Ok(state) => state,
                Err(e) => {
                    warn!(master = %master, error = %e, "failed to fetch master state");
                    metrics::record_master_fetch_error(master);
                    continue;
                }
            };

            let leader = Pid::parse(&state.leader).map(|pid| pid.address());
            match leader {
                Some(leader) if leader != *master => {
                    debug!(master = %master, %leader, "master is not the leader, refetching");
                    match self.fetch_from(&leader).await {
                        Ok(from_leader) => return Ok(from_leader),
                        Err(e) => {
                            warn!(%leader, error = %e, "failed to fetch state from leader");
                            metrics::record_master_fetch_error(&leader);
                            return Ok(state);
                        }
                    }
                }
                _ => return Ok(state),
            }
        }

        Err(DnsError::NoMaster(self.mesos.masters.clone()))
    }

    /// Run one generation cycle.
    pub async fn refresh(&self, reason: ReloadReason) -> Result<(), DnsError> {
        let timer = Timer::start();
        metrics::record_reload(reason);

        let snapshot = match self.fetch_state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                metrics::record_generation(GenerationOutcome::FetchFailed, timer.elapsed());
                return Err(e);
            }
        };

        let records = match generate(&snapshot, &self.opts) {
            Ok(records) => records,
            Err(e) => {
                metrics::record_generation(GenerationOutcome::GenerateFailed, timer.elapsed());
                return Err(e);
            }
        };

        let a_records = records.a.record_count();
        let srv_records = records.srv.record_count();
        self.state.replace(records);
        metrics::record_generation(GenerationOutcome::Success, timer.elapsed());

        info!(
            reason = ?reason,
            a_records,
            srv_records,
            serial = self.state.serial(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "refreshed DNS records"
        );
        Ok(())
    }

    /// Refresh immediately, then on every interval tick or reload request,
    /// until shutdown.
    pub async fn run(self, mut reload: mpsc::Receiver<()>, shutdown: Shutdown) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.mesos.refresh_seconds.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut first = true;

        loop {
            if shutdown.is_shutting_down() {
                info!("Poller shutting down");
                return;
            }

            let reason = tokio::select! {
                _ = interval.tick() => {
                    if first { ReloadReason::Initial } else { ReloadReason::Interval }
                }
                Some(()) = reload.recv() => ReloadReason::Signal,
                _ = shutdown.wait() => {
                    info!("Poller shutting down");
                    return;
                }
            };
            first = false;

            if let Err(e) = self.refresh(reason).await {
                error!(reason = ?reason, error = %e, "refresh failed, keeping previous records");
            }
        }
    }
}
