//! The host-to-agent routing table.
//!
//! A single task owns the mutable table and applies every insert/remove
//! event it reads from two bounded channels, in arrival order per
//! channel. After each applied event it publishes a fresh immutable
//! snapshot through `arc_swap::ArcSwap`; `lookup` reads that snapshot
//! directly with no channel round-trip, so a lookup always sees a peer
//! registered no earlier than the most recent event the coordinator had
//! applied before the lookup ran, because the snapshot is published
//! synchronously before the next event is drained.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;

use crate::peer::Peer;

/// Depth of the insert/remove submission queues.
const QUEUE_DEPTH: usize = 10;

type Table = HashMap<String, Vec<Arc<Peer>>>;

pub struct RoutingCoordinator {
    insert_tx: mpsc::Sender<Arc<Peer>>,
    remove_tx: mpsc::Sender<Arc<Peer>>,
    table: Arc<ArcSwap<Table>>,
}

impl RoutingCoordinator {
    /// Spawns the coordinator task and returns a handle to it.
    pub fn spawn() -> Arc<Self> {
        let (insert_tx, mut insert_rx) = mpsc::channel::<Arc<Peer>>(QUEUE_DEPTH);
        let (remove_tx, mut remove_rx) = mpsc::channel::<Arc<Peer>>(QUEUE_DEPTH);
        let table = Arc::new(ArcSwap::from_pointee(Table::new()));
        let published = table.clone();

        tokio::spawn(async move {
            let mut working: Table = HashMap::new();
            loop {
                tokio::select! {
                    biased;
                    maybe_peer = insert_rx.recv() => {
                        let Some(peer) = maybe_peer else { break };
                        info!(host = %peer.host, peer_id = peer.id, "peer registered");
                        working.entry(peer.host.clone()).or_default().push(peer);
                        published.store(Arc::new(working.clone()));
                    }
                    maybe_peer = remove_rx.recv() => {
                        let Some(peer) = maybe_peer else { break };
                        if let Some(list) = working.get_mut(&peer.host) {
                            list.retain(|p| p.id != peer.id);
                            if list.is_empty() {
                                working.remove(&peer.host);
                            }
                        }
                        published.store(Arc::new(working.clone()));
                        info!(host = %peer.host, peer_id = peer.id, "peer deregistered");
                        peer.close().await;
                    }
                    else => break,
                }
            }
        });

        Arc::new(Self {
            insert_tx,
            remove_tx,
            table,
        })
    }

    /// Submits a peer for insertion. Applies backpressure once the queue
    /// is at [`QUEUE_DEPTH`].
    pub async fn submit_insert(&self, peer: Arc<Peer>) {
        let _ = self.insert_tx.send(peer).await;
    }

    /// Submits a peer for removal. Idempotent: removing a peer not in the
    /// table is a no-op.
    pub async fn submit_remove(&self, peer: Arc<Peer>) {
        let _ = self.remove_tx.send(peer).await;
    }

    /// Returns a uniformly random peer from `host`'s pool, or `None` if no
    /// pool exists. Uses a thread-local generator rather than one owned
    /// by the coordinator: `rand::thread_rng` has no state shared across
    /// tasks, so there is nothing to race on without adding a lock.
    pub fn lookup(&self, host: &str) -> Option<Arc<Peer>> {
        let snapshot = self.table.load();
        let candidates = snapshot.get(host)?;
        if candidates.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..candidates.len());
        Some(candidates[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use tunnel_protocol::mux::ServerSession;

    fn test_peer(host: &str) -> Arc<Peer> {
        // A ServerSession needs a real duplex pair to drive; tests only
        // exercise routing-table bookkeeping, never `open_stream`, so the
        // peer end of the pair is simply dropped.
        let (a, _b) = tokio::io::duplex(64);
        let session = ServerSession::new(a);
        Arc::new(Peer::new(host.to_string(), session.control()))
    }

    #[tokio::test]
    async fn lookup_misses_until_insert_observed() {
        let coordinator = RoutingCoordinator::spawn();
        assert!(coordinator.lookup("a.example").is_none());

        let peer = test_peer("a.example");
        coordinator.submit_insert(peer.clone()).await;
        // Give the coordinator task a chance to apply and publish.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let found = coordinator.lookup("a.example").expect("peer present");
        assert_eq!(found.id, peer.id);
    }

    #[tokio::test]
    async fn removed_peer_is_never_returned_again() {
        let coordinator = RoutingCoordinator::spawn();
        let peer = test_peer("b.example");
        coordinator.submit_insert(peer.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(coordinator.lookup("b.example").is_some());

        coordinator.submit_remove(peer.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(coordinator.lookup("b.example").is_none());
    }

    #[tokio::test]
    async fn removing_last_peer_deletes_the_host_key_not_an_empty_pool() {
        let coordinator = RoutingCoordinator::spawn();
        let peer = test_peer("c.example");
        coordinator.submit_insert(peer.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        coordinator.submit_remove(peer).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let snapshot = coordinator.table.load();
        assert!(!snapshot.contains_key("c.example"));
    }

    #[tokio::test]
    async fn selection_converges_to_uniform_over_many_lookups() {
        let coordinator = RoutingCoordinator::spawn();
        let a = test_peer("d.example");
        let b = test_peer("d.example");
        coordinator.submit_insert(a.clone()).await;
        coordinator.submit_insert(b.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let mut counts: StdHashMap<u64, u32> = StdHashMap::new();
        for _ in 0..2000 {
            let picked = coordinator.lookup("d.example").unwrap();
            *counts.entry(picked.id).or_default() += 1;
        }
        let a_count = *counts.get(&a.id).unwrap_or(&0) as f64;
        let total = 2000.0;
        // Binomial(2000, 0.5): std dev ~22.4; 6 std devs is generous
        // enough to make this test non-flaky while still catching a
        // selection policy that isn't close to uniform.
        assert!((a_count / total - 0.5).abs() < 0.15);
    }
}
