//! Metrics instrumentation for mesos-dns.
//!
//! All metrics are prefixed with `mesos_dns.`

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: Duration) {
    let result_str = match result {
        QueryResult::Success => "success",
        QueryResult::NoData => "nodata",
        QueryResult::NxDomain => "nxdomain",
        QueryResult::NotReady => "not_ready",
        QueryResult::Error => "error",
    };

    counter!("mesos_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("mesos_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryResult {
    /// Query returned records.
    Success,
    /// Name exists but has no records of the queried type.
    NoData,
    /// Name not found.
    NxDomain,
    /// No generation has completed yet.
    NotReady,
    /// Query failed with an error.
    Error,
}

/// Record the outcome of one generation cycle.
pub fn record_generation(outcome: GenerationOutcome, duration: Duration) {
    let outcome_str = match outcome {
        GenerationOutcome::Success => "success",
        GenerationOutcome::FetchFailed => "fetch_failed",
        GenerationOutcome::GenerateFailed => "generate_failed",
    };

    counter!("mesos_dns.generation.count", "outcome" => outcome_str).increment(1);
    histogram!("mesos_dns.generation.duration.seconds").record(duration.as_secs_f64());
}

/// Generation outcomes.
#[derive(Debug, Clone, Copy)]
pub enum GenerationOutcome {
    /// Records were replaced.
    Success,
    /// No master returned a usable snapshot.
    FetchFailed,
    /// Snapshot was fetched but could not be turned into records.
    GenerateFailed,
}

/// Record a failed request to one master.
pub fn record_master_fetch_error(master: &str) {
    counter!("mesos_dns.master.fetch_error.count", "master" => master.to_string()).increment(1);
}

/// Record a refresh trigger.
pub fn record_reload(reason: ReloadReason) {
    let reason_str = match reason {
        ReloadReason::Initial => "initial",
        ReloadReason::Interval => "interval",
        ReloadReason::Signal => "signal",
    };

    counter!("mesos_dns.reload.count", "reason" => reason_str).increment(1);
}

/// Why a generation cycle was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    /// First generation after startup.
    Initial,
    /// Periodic refresh.
    Interval,
    /// Operator requested reload (SIGUSR1).
    Signal,
}

/// Record a reload request dropped because one was already pending.
pub fn record_reload_dropped() {
    counter!("mesos_dns.reload.dropped.count").increment(1);
}

/// Record record-store sizes (call periodically or on change).
pub fn record_state_counts(a_names: usize, a_records: usize, srv_names: usize, srv_records: usize) {
    gauge!("mesos_dns.state.a.names").set(a_names as f64);
    gauge!("mesos_dns.state.a.records").set(a_records as f64);
    gauge!("mesos_dns.state.srv.names").set(srv_names as f64);
    gauge!("mesos_dns.state.srv.records").set(srv_records as f64);
}

/// Record readiness state.
pub fn record_ready_state(ready: bool) {
    gauge!("mesos_dns.state.ready").set(if ready { 1.0 } else { 0.0 });
}

/// Record the SOA serial number.
pub fn record_serial(serial: u32) {
    gauge!("mesos_dns.state.serial").set(serial as f64);
}

/// Record answers returned for a successful lookup.
pub fn record_answers_returned(record_type: &str, count: usize) {
    histogram!("mesos_dns.query.answers", "type" => record_type.to_string()).record(count as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
