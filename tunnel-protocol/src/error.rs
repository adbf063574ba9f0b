//! Error kinds shared by the proxy server and the tunnel agent.
//!
//! Mirrors the error taxonomy of the control/data plane: transport
//! failures are local to one connection, protocol failures reject a
//! handshake, capability failures mean the serving layer can't hijack,
//! routing failures mean no peer exists, and peer-health failures trigger
//! eviction from the routing table.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection cannot be hijacked: {0}")]
    Capability(String),

    #[error("no peer registered for host")]
    Routing,

    #[error("peer is unhealthy: {0}")]
    PeerHealth(String),
}

pub type Result<T> = std::result::Result<T, TunnelError>;
