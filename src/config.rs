//! Configuration types for mesos-dns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::hash::HashAlgorithm;
use crate::snapshot::IpSource;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    #[serde(default)]
    pub dns: DnsConfig,

    /// Mesos master connection.
    #[serde(default)]
    pub mesos: MesosConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server and record generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for DNS server to listen on (UDP and TCP).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Root domain (e.g., "mesos"). All generated names live under it.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Name of this server under the root domain.
    #[serde(default = "default_ns_name")]
    pub ns_name: String,

    /// TTL for DNS records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Use the legacy 24 character RFC 952 label rules.
    #[serde(default)]
    pub enforce_rfc952: bool,

    /// Algorithm for task disambiguation tokens.
    #[serde(default)]
    pub hash: HashAlgorithm,

    /// Task address sources in order of preference.
    #[serde(default = "default_ip_sources")]
    pub ip_sources: Vec<IpSource>,

    /// SOA record configuration.
    #[serde(default)]
    pub soa: SoaConfig,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            domain: default_domain(),
            ns_name: default_ns_name(),
            ttl: default_ttl(),
            enforce_rfc952: false,
            hash: HashAlgorithm::default(),
            ip_sources: default_ip_sources(),
            soa: SoaConfig::default(),
        }
    }
}

impl DnsConfig {
    /// Primary nameserver for the SOA/NS records: explicit `soa.mname` or
    /// `<ns_name>.<domain>`.
    pub fn mname(&self) -> String {
        self.soa
            .mname
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.ns_name, self.domain.trim_matches('.')))
    }

    /// Responsible mailbox for the SOA record: explicit `soa.rname` or
    /// `root.<ns_name>.<domain>`.
    pub fn rname(&self) -> String {
        self.soa
            .rname
            .clone()
            .unwrap_or_else(|| format!("root.{}", self.mname()))
    }
}

/// Mesos master configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MesosConfig {
    /// Known masters, `host:port`. Tried in order and used as fallback
    /// master records.
    #[serde(default)]
    pub masters: Vec<String>,

    /// HTTP path of the state endpoint.
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Seconds between state refreshes.
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    /// HTTP timeout for a single state request, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for MesosConfig {
    fn default() -> Self {
        Self {
            masters: Vec::new(),
            state_path: default_state_path(),
            refresh_seconds: default_refresh_seconds(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "mesos_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            prometheus_addr: None,
        }
    }
}

/// SOA (Start of Authority) record configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaConfig {
    /// Primary nameserver hostname. Defaults to `<ns_name>.<domain>`.
    #[serde(default)]
    pub mname: Option<String>,

    /// Admin mailbox in DNS format. Defaults to `root.<ns_name>.<domain>`.
    #[serde(default)]
    pub rname: Option<String>,

    /// Refresh interval in seconds.
    #[serde(default = "default_refresh")]
    pub refresh: u32,

    /// Retry interval in seconds.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Expire time in seconds.
    #[serde(default = "default_expire")]
    pub expire: u32,

    /// Minimum TTL in seconds.
    #[serde(default = "default_minimum")]
    pub minimum: u32,
}

impl Default for SoaConfig {
    fn default() -> Self {
        Self {
            mname: None,
            rname: None,
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 53))
}

fn default_domain() -> String {
    "mesos".to_string()
}

fn default_ns_name() -> String {
    "mesos-dns".to_string()
}

fn default_ip_sources() -> Vec<IpSource> {
    vec![IpSource::Netinfo, IpSource::Mesos, IpSource::Host]
}

fn default_state_path() -> String {
    "/master/state.json".to_string()
}

fn default_refresh_seconds() -> u64 {
    60
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ttl() -> u32 {
    60
}

fn default_refresh() -> u32 {
    60
}

fn default_retry() -> u32 {
    600
}

fn default_expire() -> u32 {
    86400
}

fn default_minimum() -> u32 {
    60
}
