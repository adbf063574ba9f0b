//! Serve phase: accept streams opened by the proxy server and splice
//! each one to a freshly dialed connection to the local receiver.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::{info, warn};
use tunnel_protocol::{
    iostream::BoxedIo,
    mux::{ClientSession, Stream},
    splice::splice,
};

/// Runs until `accept_stream` returns an error or the session closes.
/// Restarting after a fatal error is left to an outer supervisor; this
/// simply returns and lets `main` decide the exit code.
pub async fn run(mut session: ClientSession<BoxedIo>, receiver: SocketAddr) -> anyhow::Result<()> {
    loop {
        let stream = match session.accept_stream().await {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                info!("session closed by proxy server");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "accept_stream failed, ending serve loop");
                return Err(e.into());
            }
        };

        tokio::spawn(relay_to_receiver(stream, receiver));
    }
}

async fn relay_to_receiver(stream: Stream, receiver: SocketAddr) {
    let receiver_conn = match TcpStream::connect(receiver).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(%receiver, error = %e, "failed to dial local receiver, dropping stream");
            return;
        }
    };
    let _ = receiver_conn.set_nodelay(true);

    // close_on_exit = true: both the multiplex stream and the receiver
    // socket are torn down when splicing ends.
    let _ = splice(stream, receiver_conn, true).await;
}
