//! CLI surface for the agent.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tunnel-agent", version, about = "Reverse-tunnel agent: registers a host and relays streams to a local receiver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dial the proxy server, register a host, and relay streams to the
    /// local receiver.
    Connect(ConnectArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ConnectArgs {
    /// Address of the proxy server's registration endpoint, `host:port`.
    /// Kept as a hostname (rather than a resolved `SocketAddr`) because
    /// TLS certificate verification needs the hostname, not just an IP.
    #[arg(long)]
    pub server: String,

    /// Address of the local receiver to relay accepted streams to.
    #[arg(long)]
    pub receiver: std::net::SocketAddr,

    /// Virtual host to announce at registration.
    #[arg(long = "http-host")]
    pub http_host: String,

    /// PEM bundle of CA certificates to verify the proxy server's
    /// certificate against. Presence of this flag is what turns TLS on
    /// for the connect phase; absence means a plain TCP dial.
    #[arg(long = "tls-ca")]
    pub tls_ca: Option<PathBuf>,
}
