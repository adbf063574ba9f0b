//! Dispatch handler: route the request by Host, open a stream on the
//! chosen peer with bounded retry on failure, replay the request, then
//! splice until completion.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::warn;
use tunnel_protocol::{
    httpshim::{read_request_head, write_status_response},
    iostream::BoxedIo,
    mux::Stream,
    pushback::Pushback,
    splice::splice,
};

use crate::routing::RoutingCoordinator;

/// Bounded retries guard against a thundering pool of dead peers.
const MAX_RETRIES: usize = 5;

async fn select_stream(host: &str, coordinator: &RoutingCoordinator) -> Option<Stream> {
    let mut attempts = 0;
    while attempts < MAX_RETRIES {
        let peer = coordinator.lookup(host)?;
        let mut control = peer.open_control();
        match control.open_stream().await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                warn!(host, peer_id = peer.id, error = %e, "stream open failed, evicting peer");
                coordinator.submit_remove(peer).await;
                attempts += 1;
            }
        }
    }
    None
}

pub async fn handle_connection(mut io: BoxedIo, coordinator: Arc<RoutingCoordinator>) {
    let (head, leftover) = match read_request_head(&mut io).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "dispatch: failed to read request head");
            return;
        }
    };

    let host = head.header("Host").unwrap_or("").to_string();

    let Some(mut stream) = select_stream(&host, &coordinator).await else {
        let _ = write_status_response(
            &mut io,
            500,
            "Internal Server Error",
            "no route for host\n",
        )
        .await;
        return;
    };

    // Re-serialize the parsed request line and headers onto the new
    // stream; any body bytes already buffered on the public connection
    // travel with the hijacked side and are picked up by the splicer.
    if let Err(e) = stream.write_all(&head.serialize()).await {
        warn!(host, error = %e, "failed to replay request onto stream");
        return;
    }

    let hijacked = Pushback::new(io, leftover);
    // close_on_exit = true: both sides are torn down when splicing ends;
    // this dispatch owns neither stream past this point.
    let _ = splice(hijacked, stream, true).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn unknown_host_yields_500() {
        let (mut client, server) = duplex(4096);
        let coordinator = RoutingCoordinator::spawn();

        let handle = tokio::spawn(handle_connection(Box::new(server), coordinator));
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: unknown.example\r\n\r\n")
            .await
            .unwrap();

        let mut resp = Vec::new();
        client.read_to_end(&mut resp).await.unwrap();
        handle.await.unwrap();

        assert!(resp.starts_with(b"HTTP/1.1 500"));
    }

    // Spec §8 scenario 3 ("peer death mid-dispatch"): a registered peer
    // whose session is already closed fails `open_stream`, gets evicted,
    // and dispatch falls through to `NoRoute` once no peer remains.
    #[tokio::test]
    async fn dead_peer_is_evicted_and_dispatch_falls_back_to_no_route() {
        use crate::peer::Peer;
        use tunnel_protocol::mux::ServerSession;

        let coordinator = RoutingCoordinator::spawn();

        let (io, _keep_alive) = duplex(64);
        let session = ServerSession::new(io);
        let mut control = session.control();
        // Close the session's own control handle so any later
        // `open_stream` call on a clone fails deterministically, rather
        // than relying on the background driver task noticing a dropped
        // duplex half on its own schedule.
        control.close().await.ok();

        let peer = std::sync::Arc::new(Peer::new("c.example".to_string(), session.control()));
        coordinator.submit_insert(peer.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(coordinator.lookup("c.example").is_some());

        let result = select_stream("c.example", &coordinator).await;
        assert!(result.is_none(), "dead peer must not yield a usable stream");

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(
            coordinator.lookup("c.example").is_none(),
            "the dead peer must be evicted after its stream-open failure"
        );
    }
}
