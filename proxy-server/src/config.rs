//! CLI surface. Parsing and flag validation sit apart from the core
//! routing/dispatch logic but are still needed for a runnable binary, so
//! they live in their own module rather than `main.rs`.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "proxy-server", version, about = "Reverse-tunnel HTTP(S) proxy server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the registration and public endpoints.
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Public HTTP endpoint, e.g. 0.0.0.0:8080.
    #[arg(long)]
    pub proxy_http: Option<SocketAddr>,
    /// Public HTTPS endpoint.
    #[arg(long)]
    pub proxy_https: Option<SocketAddr>,
    #[arg(long)]
    pub proxy_tls_cert: Option<PathBuf>,
    #[arg(long)]
    pub proxy_tls_key: Option<PathBuf>,

    /// Registration HTTP endpoint tunnel agents dial into.
    #[arg(long)]
    pub clients_http: Option<SocketAddr>,
    /// Registration HTTPS endpoint.
    #[arg(long)]
    pub clients_https: Option<SocketAddr>,
    #[arg(long)]
    pub clients_tls_cert: Option<PathBuf>,
    #[arg(long)]
    pub clients_tls_key: Option<PathBuf>,
}

impl ServeArgs {
    /// Validates the flag combinations this binary requires: at least
    /// one public listener, at least one registration listener (the
    /// symmetric extension of the same requirement — a proxy with no way
    /// for agents to register can never route anything), and a matching
    /// cert+key whenever an HTTPS endpoint is requested.
    pub fn validate(&self) -> Result<()> {
        if self.proxy_http.is_none() && self.proxy_https.is_none() {
            bail!("at least one of --proxy-http or --proxy-https must be set");
        }
        if self.clients_http.is_none() && self.clients_https.is_none() {
            bail!("at least one of --clients-http or --clients-https must be set");
        }
        if self.proxy_https.is_some() && (self.proxy_tls_cert.is_none() || self.proxy_tls_key.is_none())
        {
            bail!("--proxy-https requires --proxy-tls-cert and --proxy-tls-key");
        }
        if self.clients_https.is_some()
            && (self.clients_tls_cert.is_none() || self.clients_tls_key.is_none())
        {
            bail!("--clients-https requires --clients-tls-cert and --clients-tls-key");
        }
        Ok(())
    }
}
