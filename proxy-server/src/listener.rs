//! Proxy server composition: `start(endpoint, role, tls_config?)` binds
//! one listener and dispatches each accepted connection to the
//! registration or dispatch handler.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn, Instrument};
use tunnel_protocol::iostream::BoxedIo;
use uuid::Uuid;

use crate::routing::RoutingCoordinator;
use crate::{dispatch, registration};

#[derive(Clone, Copy, Debug)]
pub enum Role {
    Registration,
    Public,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Registration => write!(f, "registration"),
            Role::Public => write!(f, "public"),
        }
    }
}

/// Binds `addr` and serves connections in `role` until the listener
/// itself fails (which it never does once bound — accept errors are
/// logged and looped past). Returning `Err` here means bind or TLS setup
/// failed, which is fatal for the whole process.
pub async fn start(
    addr: SocketAddr,
    role: Role,
    tls: Option<TlsAcceptor>,
    coordinator: Arc<RoutingCoordinator>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {role} listener on {addr}"))?;
    info!(%role, %addr, tls = tls.is_some(), "listening");

    loop {
        let (socket, peer_addr) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let _ = socket.set_nodelay(true);
        let tls = tls.clone();
        let coordinator = coordinator.clone();
        let conn_id = Uuid::new_v4();
        let span = tracing::info_span!("conn", id = %conn_id, %role, %peer_addr);

        tokio::spawn(
            async move {
                let io: BoxedIo = match tls {
                    Some(acceptor) => match acceptor.accept(socket).await {
                        Ok(tls_stream) => Box::new(tls_stream),
                        Err(e) => {
                            warn!(error = %e, "TLS handshake failed");
                            return;
                        }
                    },
                    None => Box::new(socket),
                };
                match role {
                    Role::Registration => registration::handle_connection(io, coordinator).await,
                    Role::Public => dispatch::handle_connection(io, coordinator).await,
                }
            }
            .instrument(span),
        );
    }
}
