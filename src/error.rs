//! Error types for mesos-dns.

use thiserror::Error;

/// Errors that can occur while generating or serving records.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error while fetching master state
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Master state could not be decoded
    #[error("invalid master state: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Malformed port resource on a task
    #[error("invalid port ranges: {0}")]
    InvalidPorts(String),

    /// None of the configured masters returned a usable state
    #[error("no reachable master among {0:?}")]
    NoMaster(Vec<String>),

    /// State not ready
    #[error("DNS state not ready - no records generated yet")]
    NotReady,
}
