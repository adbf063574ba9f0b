//! Registration handler: hijack the connection, validate the handshake,
//! wrap it as a multiplex session in server role, and submit the
//! resulting peer to the routing coordinator.

use std::sync::Arc;

use tracing::{info, warn};
use tunnel_protocol::{
    httpshim::{read_request_head, write_status_response},
    iostream::BoxedIo,
    mux::ServerSession,
    pushback::Pushback,
    wire,
};

use crate::peer::Peer;
use crate::routing::RoutingCoordinator;

pub async fn handle_connection(mut io: BoxedIo, coordinator: Arc<RoutingCoordinator>) {
    let (head, leftover) = match read_request_head(&mut io).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "registration: failed to read request head");
            return;
        }
    };

    if head.path != wire::REGISTRATION_PATH {
        let _ = write_status_response(&mut io, 404, "Not Found", "unknown path\n").await;
        return;
    }

    let host = match head.header("Host") {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => {
            warn!("registration: missing or empty Host header");
            let _ =
                write_status_response(&mut io, 400, "Bad Request", "missing Host header\n").await;
            return;
        }
    };

    // Unknown client versions are accepted today; this is read purely
    // for forward compatibility and operational visibility.
    let client_version = head
        .header(wire::CLIENT_VERSION_HEADER)
        .unwrap_or("unknown")
        .to_string();
    info!(host = %host, client_version = %client_version, "agent registering");

    // Any bytes already buffered past the header (there should be none —
    // the handshake body is empty — but a pipelining agent is not a
    // protocol violation) become the multiplex connection's first reads.
    let transport = Pushback::new(io, leftover);
    let session = ServerSession::new(transport);
    let peer = Arc::new(Peer::new(host, session.control()));

    coordinator.submit_insert(peer.clone()).await;

    // Evict the peer once its session closes, whether from a clean
    // disconnect or a transport error.
    tokio::spawn(async move {
        session.closed().await;
        coordinator.submit_remove(peer).await;
    });
}
