//! rdtp-cli - interactive chat client
//!
//! Connects over the RDTP socket protocol by default; `--transport rest`
//! selects the HTTP backend instead.

mod commands;
mod repl;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use rdtp_client::{ChatTransport, ConnectConfig, RdtpClient, RestClient};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// Persistent socket with live message delivery
    Rdtp,
    /// Stateless HTTP; messages arrive via `fetch`
    Rest,
}

#[derive(Parser)]
#[command(name = "rdtp-cli")]
#[command(about = "Interactive chat client for RDTP chat servers")]
#[command(version)]
struct Cli {
    /// Server address (host:port, or a base URL for the REST backend)
    #[arg(short, long, default_value = "127.0.0.1:7667", env = "RDTP_SERVER")]
    server: String,

    /// Transport backend
    #[arg(short, long, value_enum, default_value_t = TransportKind::Rdtp)]
    transport: TransportKind,

    /// Response timeout in seconds (RDTP only)
    #[arg(long, default_value_t = 3)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let transport = match cli.transport {
        TransportKind::Rdtp => {
            let config = ConnectConfig::new(&cli.server)
                .with_request_timeout(Duration::from_secs(cli.timeout));
            let client = RdtpClient::new(config);

            println!("Connecting to {}...", cli.server);
            client.connect().await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;
            println!("{}", "Connected!".green());

            ChatTransport::Rdtp(client)
        }
        TransportKind::Rest => {
            let base_url = if cli.server.starts_with("http://") || cli.server.starts_with("https://")
            {
                cli.server.clone()
            } else {
                format!("http://{}", cli.server)
            };
            ChatTransport::Rest(RestClient::new(base_url)?)
        }
    };

    repl::run(transport).await?;
    Ok(())
}
