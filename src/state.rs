//! In-memory DNS state holding the most recent generation.
//!
//! The poller builds a complete [`Records`] off to the side and hands it to
//! [`DnsState::replace`]. Readers clone the current `Arc<Records>` and never
//! observe a half-built generation.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use crate::metrics;
use crate::records::Records;

/// Thread-safe in-memory DNS state.
#[derive(Debug, Clone)]
pub struct DnsState {
    inner: Arc<RwLock<DnsStateInner>>,
}

#[derive(Debug, Default)]
struct DnsStateInner {
    /// Current generation.
    records: Arc<Records>,

    /// Serial number for SOA (incremented on every replace)
    serial: u32,

    /// True after the first successful generation
    ready: bool,
}

impl Default for DnsState {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsState {
    /// Create an empty, not yet ready, DNS state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DnsStateInner::default())),
        }
    }

    /// Swap in a freshly generated record set and bump the serial.
    pub fn replace(&self, records: Records) {
        let records = Arc::new(records);
        let mut inner = self.inner.write();
        inner.records = records;
        inner.serial = inner.serial.wrapping_add(1);
        inner.ready = true;
        debug!(
            serial = inner.serial,
            a_names = inner.records.a.len(),
            srv_names = inner.records.srv.len(),
            "replaced DNS records"
        );
    }

    /// The current generation.
    pub fn snapshot(&self) -> Arc<Records> {
        Arc::clone(&self.inner.read().records)
    }

    /// Check if `name` exists in either store.
    pub fn has_name(&self, name: &str) -> bool {
        self.snapshot().has_name(name)
    }

    /// Get current SOA serial.
    pub fn serial(&self) -> u32 {
        self.inner.read().serial
    }

    /// Check if state is ready to serve DNS queries.
    pub fn is_ready(&self) -> bool {
        self.inner.read().ready
    }

    /// Emit current state metrics.
    pub fn emit_metrics(&self) {
        let (records, serial, ready) = {
            let inner = self.inner.read();
            (Arc::clone(&inner.records), inner.serial, inner.ready)
        };

        metrics::record_state_counts(
            records.a.len(),
            records.a.record_count(),
            records.srv.len(),
            records.srv.record_count(),
        );
        metrics::record_ready_state(ready);
        metrics::record_serial(serial);
    }
}
