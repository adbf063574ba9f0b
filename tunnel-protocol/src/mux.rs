//! Thin wrapper around the `yamux` crate presenting a multiplex-session
//! contract: open/accept streams over one reliable byte stream, with
//! session closure tearing down all outstanding streams.
//!
//! The proxy server runs **server role** (it opens streams outward) and
//! the agent runs **client role** (it accepts them) — the reverse of the
//! usual mux client/server naming. Because `yamux::Connection` only
//! makes progress while something calls
//! `next_stream()`, the side that mostly *opens* streams (the proxy
//! server) still needs a background task driving the connection; the
//! side that *accepts* streams (the agent) drives it directly from its
//! serve loop.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tracing::{info, warn};
use yamux::{Config, Connection, Mode};
pub use yamux::{Control, ConnectionError, Stream};

use crate::error::{Result, TunnelError};

/// The proxy server's side of a registered peer's session: a handle for
/// opening outbound streams, plus a signal that resolves once the
/// connection's driver loop has ended (used to trigger peer eviction).
pub struct ServerSession {
    control: Control,
    closed: oneshot::Receiver<()>,
}

impl ServerSession {
    /// Wraps `io` as a yamux connection in server role and spawns the
    /// background task that drives it. Any stream the (misbehaving) peer
    /// opens unsolicited is accepted and immediately dropped: this system
    /// never expects the agent to open streams.
    pub fn new<S>(io: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut connection = Connection::new(io, Config::default(), Mode::Server);
        let control = connection.control();
        let (closed_tx, closed_rx) = oneshot::channel();

        tokio::spawn(async move {
            loop {
                match connection.next_stream().await {
                    Ok(Some(_unsolicited)) => {
                        warn!("dropping unsolicited inbound stream on server-role session");
                    }
                    Ok(None) => {
                        info!("multiplex session closed by peer");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "multiplex session driver error");
                        break;
                    }
                }
            }
            let _ = closed_tx.send(());
        });

        Self {
            control,
            closed: closed_rx,
        }
    }

    /// Returns an independently usable handle for opening streams.
    /// `yamux::Control` is designed to be cloned once per caller — each
    /// clone talks to the same background driver task over its own
    /// channel — so callers that need to open a stream concurrently with
    /// others (every dispatch does) should clone this rather than share
    /// one `Control` behind a lock.
    pub fn control(&self) -> Control {
        self.control.clone()
    }

    /// Resolves once the session's driver loop has ended, i.e. the
    /// session is closed. Consumes `self` since there is nothing left to
    /// do with a closed session's control handle.
    pub async fn closed(self) {
        let _ = self.closed.await;
    }
}

/// The agent's side of the connection to the proxy server: driven
/// directly by the agent's serve loop via [`ClientSession::accept_stream`].
pub struct ClientSession<S> {
    connection: Connection<S>,
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `io` as a yamux connection in client role.
    pub fn new(io: S) -> Self {
        Self {
            connection: Connection::new(io, Config::default(), Mode::Client),
        }
    }

    /// Blocks until the proxy server opens a stream or the session
    /// terminates.
    pub async fn accept_stream(&mut self) -> Result<Option<Stream>> {
        self.connection
            .next_stream()
            .await
            .map_err(|e| TunnelError::Transport(std::io::Error::other(e.to_string())))
    }
}
