//! # Tunnel Agent
//!
//! The private-side half of the reverse-tunnel proxy. Dials the proxy
//! server, registers a virtual host, then accepts multiplexed streams and
//! relays each one to a local receiver.
//!
//! ## Modules
//!
//! - [`config`] — CLI surface (`connect` subcommand and its flags)
//! - [`tls`] — client-side TLS connector built from a caller-supplied CA
//! - [`connect`] — dial, keep-alive tuning, registration handshake
//! - [`serve`] — the accept/relay loop

mod config;
mod connect;
mod serve;
mod tls;

use clap::Parser;
use tracing::error;

use config::{Cli, Command};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunnel_agent=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let Command::Connect(args) = cli.command;

    if let Err(e) = run(args).await {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

async fn run(args: config::ConnectArgs) -> anyhow::Result<()> {
    let session = connect::dial(&args).await?;
    serve::run(session, args.receiver).await
}
