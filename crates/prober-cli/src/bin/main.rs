//! Prober entry point
//!
//! Runs the probes of a probe file, or serves the demo fixtures.

use clap::{Parser, Subcommand};
use prober_cli::fixtures;
use prober_cli::telemetry::{init_tracing, LogFormat};
use prober_cli::{run_probes, ProberConfig};
use prober_core::engine::Prober;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "prober")]
#[command(about = "Single-shot workload health probes")]
#[command(version)]
struct Cli {
    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, env = "PROBER_LOG_FORMAT", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every probe of a probe file
    RunProbe {
        /// Path to the probe file (JSON/YAML)
        #[arg(short, long, env = "PROBER_CONFIG")]
        config: PathBuf,
    },

    /// Serve the HTTP and TCP demo fixtures
    RunClient {
        /// HTTP fixture address
        #[arg(long, default_value = "0.0.0.0:8080", env = "PROBER_HTTP_ADDR")]
        http_addr: SocketAddr,

        /// TCP fixture address
        #[arg(long, default_value = "0.0.0.0:9090", env = "PROBER_TCP_ADDR")]
        tcp_addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::RunProbe { config } => {
            let config = ProberConfig::load(&config)?;
            let executor = Arc::new(config.exec.executor());
            let prober = Prober::new(config.options.clone(), executor)?;

            let lines = run_probes(&prober, &config).await;
            for line in &lines {
                println!("{}", serde_json::to_string(line)?);
            }

            if lines.iter().any(|line| line.is_error()) {
                std::process::exit(1);
            }
        }

        Commands::RunClient {
            http_addr,
            tcp_addr,
        } => {
            let http = tokio::net::TcpListener::bind(http_addr).await?;
            let tcp = tokio::net::TcpListener::bind(tcp_addr).await?;
            fixtures::run_client(http, tcp, shutdown_signal()).await?;
            tracing::info!("Fixtures exited");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
    }
}
