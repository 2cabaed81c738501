//! mesos-dns binary entry point.

use clap::Parser;
use mesos_dns::{telemetry, Config, DnsServer, Shutdown};
use std::path::PathBuf;
use tracing::{error, info};

/// Authoritative DNS server for tasks running on Apache Mesos.
#[derive(Parser, Debug)]
#[command(name = "mesos-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "mesos-dns.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()))
        .add_source(
            config::Environment::with_prefix("MESOS_DNS")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("mesos.masters")
                .with_list_parse_key("dns.ip_sources")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        domain = %config.dns.domain,
        masters = ?config.mesos.masters,
        "Starting mesos-dns"
    );

    // Setup graceful shutdown
    let (shutdown, shutdown_worker) = Shutdown::new_signals();
    tokio::spawn(shutdown_worker);

    let server = DnsServer::new(config);
    if let Err(e) = server.run(shutdown).await {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    info!("mesos-dns shutdown complete");
    Ok(())
}
