//! Devnode - run a dev node the way the end-to-end tests do
//!
//! Starts the node with the fixed test command line, waits for readiness,
//! primes the RPC endpoint and keeps the node up until Ctrl-C.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use devnode_core::config::binary_path_for_profile;
use devnode_core::{HarnessConfig, HarnessConfigBuilder};
use devnode_harness::{init_tracing, NodeHarness};

#[derive(Parser)]
#[command(name = "devnode")]
#[command(about = "Start an instant-sealing dev node for end-to-end testing")]
struct Args {
    /// Harness configuration file (JSON); environment defaults otherwise
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Node executable (overrides ACALA_BINARY)
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Cargo build profile used to locate the executable
    #[arg(long)]
    build: Option<String>,

    /// Node log level passed as -l<level>
    #[arg(long)]
    log_level: Option<String>,

    /// Echo node output to stderr
    #[arg(long)]
    display_log: bool,

    /// P2P port
    #[arg(long)]
    port: Option<u16>,

    /// HTTP RPC port
    #[arg(long)]
    rpc_port: Option<u16>,

    /// WebSocket RPC port
    #[arg(long)]
    ws_port: Option<u16>,

    /// How long to wait for the readiness marker, e.g. "58s"
    #[arg(long, value_parser = humantime::parse_duration)]
    startup_timeout: Option<Duration>,

    /// Enable verbose logging (RUST_LOG takes precedence)
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<HarnessConfig> {
        let base = match &self.config {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::from_env(),
        };
        let ports = base.ports;
        let mut builder = HarnessConfigBuilder::from_config(base).ports(
            self.port.unwrap_or(ports.p2p),
            self.rpc_port.unwrap_or(ports.rpc),
            self.ws_port.unwrap_or(ports.ws),
        );

        if let Some(profile) = &self.build {
            builder = builder.binary(binary_path_for_profile(profile));
        }
        if let Some(binary) = self.binary {
            builder = builder.binary(binary);
        }
        if let Some(level) = self.log_level {
            builder = builder.log_level(level);
        }
        if self.display_log {
            builder = builder.display_log(true);
        }
        if let Some(timeout) = self.startup_timeout {
            builder = builder.startup_timeout(timeout);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the level
    init_tracing(if args.verbose { "debug" } else { "info" });

    let config = args.into_config()?;
    info!("Node binary: {}", config.binary.display());

    let mut harness = NodeHarness::start(config).await;

    if let Some(client) = harness.client() {
        let chain = client.system_chain().await?;
        info!("Chain: {}", chain);
    }
    let ports = harness.config().ports;
    println!("ws:   {}", harness.ws_url());
    println!("rpc:  http://127.0.0.1:{}", ports.rpc);
    println!("p2p:  {}", ports.p2p);

    info!("Node ready, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    harness.teardown().await;
    Ok(())
}
