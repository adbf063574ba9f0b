//! A registered tunnel agent.

use std::sync::atomic::{AtomicU64, Ordering};

use tunnel_protocol::mux::Control;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// A registered tunnel agent: the host it advertises and a handle for
/// opening streams on its session. Never mutated after creation; only
/// inserted into or removed from the routing table.
pub struct Peer {
    /// Stable identity used to compare peers for removal. Cheaper and
    /// simpler than comparing session/stream endpoints directly, and
    /// sufficient since no two peers ever share an id.
    pub id: u64,
    pub host: String,
    control: Control,
}

impl Peer {
    pub fn new(host: String, control: Control) -> Self {
        Self {
            id: NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed),
            host,
            control,
        }
    }

    /// Each call yields an independently usable handle: `yamux::Control`
    /// is meant to be cloned per concurrent caller rather than shared
    /// behind a lock (see [`tunnel_protocol::mux::ServerSession::control`]).
    pub fn open_control(&self) -> Control {
        self.control.clone()
    }

    /// Closes this peer's session. Called by the routing coordinator when
    /// the peer is removed.
    pub async fn close(&self) {
        let mut control = self.control.clone();
        let _ = control.close().await;
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Peer {}
