//! Mesos DNS - An authoritative DNS server for services running on Apache Mesos.
//!
//! This crate periodically reads the cluster state from a Mesos master and
//! turns it into A and SRV records for the leading master, every master,
//! the agents, the frameworks and every running task. Records are served by
//! a Hickory DNS authority under a configurable root domain.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          mesos-dns                              │
//! │                                                                 │
//! │  ┌──────────────────┐    ┌──────────────────┐                  │
//! │  │ Poller           │───▶│  generate()      │                  │
//! │  │ (state.json)     │    │  labels / hash   │                  │
//! │  └──────────────────┘    └────────┬─────────┘                  │
//! │    ▲        ▲                     │ Records                     │
//! │    │ tick   │ SIGUSR1             ▼                             │
//! │                              ┌──────────────────┐              │
//! │                              │  DNS State       │              │
//! │                              │  (Arc swap)      │              │
//! │                              └────────┬─────────┘              │
//! │                                       ▼                         │
//! │                              ┌──────────────────┐              │
//! │                              │  Hickory DNS     │◀── UDP/TCP   │
//! │                              │  Server          │    :53       │
//! │                              └──────────────────┘              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use mesos_dns::{Config, DnsServer, Shutdown};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = Config::default();
//!     config.dns.listen_addr = "127.0.0.1:5353".parse().unwrap();
//!     config.mesos.masters = vec!["10.0.0.1:5050".to_string()];
//!
//!     let (shutdown, worker) = Shutdown::new_signals();
//!     tokio::spawn(worker);
//!
//!     let server = DnsServer::new(config);
//!     server.run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod authority;
pub mod config;
pub mod error;
pub mod generator;
pub mod hash;
pub mod labels;
pub mod metrics;
pub mod poller;
pub mod records;
pub mod reload;
pub mod server;
pub mod shutdown;
pub mod snapshot;
pub mod state;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DnsConfig, MesosConfig, SoaConfig, TelemetryConfig};
pub use error::DnsError;
pub use generator::{generate, GeneratorOptions};
pub use records::{RecordKind, Records};
pub use server::DnsServer;
pub use shutdown::Shutdown;
pub use state::DnsState;
