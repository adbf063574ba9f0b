//! # Proxy Server
//!
//! The publicly reachable half of the reverse-tunnel proxy. Runs up to
//! four listeners — registration HTTP/HTTPS and public HTTP/HTTPS —
//! sharing one [`routing::RoutingCoordinator`].
//!
//! ## Modules
//!
//! - [`config`] — CLI surface (`serve` subcommand and its flags)
//! - [`tls`] — TLS cert/key loading
//! - [`peer`] — a registered tunnel agent
//! - [`routing`] — the host → peer routing table
//! - [`registration`] — the registration (hijack + handshake) handler
//! - [`dispatch`] — the public request dispatch handler
//! - [`listener`] — binds one endpoint and dispatches accepted connections

mod config;
mod dispatch;
mod listener;
mod peer;
mod registration;
mod routing;
mod tls;

use anyhow::Result;
use clap::Parser;
use tokio::task::JoinSet;
use tracing::error;

use config::{Cli, Command, ServeArgs};
use listener::Role;
use routing::RoutingCoordinator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proxy_server=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let Command::Serve(args) = cli.command;

    if let Err(e) = run(args).await {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

async fn run(args: ServeArgs) -> Result<()> {
    args.validate()?;

    let coordinator = RoutingCoordinator::spawn();
    let mut listeners: JoinSet<Result<()>> = JoinSet::new();

    if let Some(addr) = args.clients_http {
        let coordinator = coordinator.clone();
        listeners.spawn(listener::start(addr, Role::Registration, None, coordinator));
    }
    if let Some(addr) = args.clients_https {
        let acceptor = tls::load_acceptor(
            args.clients_tls_cert.as_deref().expect("validated above"),
            args.clients_tls_key.as_deref().expect("validated above"),
        )?;
        let coordinator = coordinator.clone();
        listeners.spawn(listener::start(
            addr,
            Role::Registration,
            Some(acceptor),
            coordinator,
        ));
    }
    if let Some(addr) = args.proxy_http {
        let coordinator = coordinator.clone();
        listeners.spawn(listener::start(addr, Role::Public, None, coordinator));
    }
    if let Some(addr) = args.proxy_https {
        let acceptor = tls::load_acceptor(
            args.proxy_tls_cert.as_deref().expect("validated above"),
            args.proxy_tls_key.as_deref().expect("validated above"),
        )?;
        let coordinator = coordinator.clone();
        listeners.spawn(listener::start(addr, Role::Public, Some(acceptor), coordinator));
    }

    // Each listener runs forever once bound; a task only completes if
    // bind or TLS setup failed, which is a fatal error for the process.
    match listeners.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(join_err)) => Err(anyhow::anyhow!(join_err)),
        None => Ok(()),
    }
}
