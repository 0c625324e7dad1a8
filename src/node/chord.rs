use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use thiserror::Error;

use crate::node::finger_table::FingerTable;
use crate::node::messages::NodeInfo;
use crate::node::peer::PeerRef;
use crate::node::rpc::{Rpc, RpcError};
use crate::utils::crypto::{finger_start, hash, in_arc_right_closed, in_open_arc, M};
use crate::utils::types::{Address, HashPos, KvStore};

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("node cannot join itself")]
    JoinSelf,
    #[error("bootstrap unreachable: {0}")]
    Bootstrap(#[source] RpcError),
    #[error("successor for this identifier hashes to the joining node itself")]
    IdCollision,
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("storage forward to {owner} answered {status}")]
    Status { owner: Address, status: u16 },
    #[error("storage forward to {owner} failed: {source}")]
    Transport {
        owner: Address,
        source: reqwest::Error,
    },
}

/// Result of a GET once the owner of the key has been resolved.
#[derive(Debug)]
pub enum GetOutcome {
    /// This node owns the key.
    Local(Option<String>),
    /// The owner's verbatim answer from a one-hop forward.
    Forwarded(u16, String),
}

/// One running peer: immutable identity plus the shared ring state mutated
/// by the RPC surface and the maintenance loops. Every field is replaced
/// atomically on its own; no lock is ever held across an outbound call.
#[derive(Clone)]
pub struct ChordNode {
    address: Address,
    node_id: HashPos,
    successor: Arc<Mutex<PeerRef>>,
    predecessor: Arc<Mutex<Option<PeerRef>>>,
    finger_table: Arc<Mutex<FingerTable>>,
    data: Arc<Mutex<KvStore>>,
    next_finger: Arc<Mutex<usize>>,
    crashed: Arc<AtomicBool>,
    has_left: Arc<AtomicBool>,
    joined_via_node: Arc<Mutex<Option<Address>>>,
    backup: Arc<Mutex<Option<Address>>>,
    rpc: Rpc,
}

impl ChordNode {
    /// Fresh ring of one: successor is the node itself, predecessor unknown.
    pub fn new(address: Address) -> ChordNode {
        let node_id = hash(address.as_bytes());
        let own = PeerRef {
            id: node_id,
            address: address.clone(),
        };
        ChordNode {
            address,
            node_id,
            successor: Arc::new(Mutex::new(own.clone())),
            predecessor: Arc::new(Mutex::new(None)),
            finger_table: Arc::new(Mutex::new(FingerTable::new(node_id, &own))),
            data: Arc::new(Mutex::new(KvStore::new())),
            next_finger: Arc::new(Mutex::new(0)),
            crashed: Arc::new(AtomicBool::new(false)),
            has_left: Arc::new(AtomicBool::new(false)),
            joined_via_node: Arc::new(Mutex::new(None)),
            backup: Arc::new(Mutex::new(None)),
            rpc: Rpc::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn node_id(&self) -> HashPos {
        self.node_id
    }

    pub fn self_ref(&self) -> PeerRef {
        PeerRef {
            id: self.node_id,
            address: self.address.clone(),
        }
    }

    pub fn successor(&self) -> PeerRef {
        self.successor.lock().unwrap().clone()
    }

    /// Finger-1 is the direct successor, so both are replaced together.
    pub fn set_successor(&self, peer: PeerRef) {
        *self.successor.lock().unwrap() = peer.clone();
        self.finger_table.lock().unwrap().set_finger(0, peer);
    }

    pub fn predecessor(&self) -> Option<PeerRef> {
        self.predecessor.lock().unwrap().clone()
    }

    pub fn set_predecessor(&self, peer: Option<PeerRef>) {
        *self.predecessor.lock().unwrap() = peer;
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    pub fn has_left(&self) -> bool {
        self.has_left.load(Ordering::SeqCst)
    }

    /// Successor of `key` per the Chord routing rule: answer from the local
    /// successor arc if possible, otherwise delegate to the closest preceding
    /// finger. A failed delegation degrades to the current successor.
    pub async fn find_successor(&self, key: HashPos) -> PeerRef {
        let successor = self.successor();
        if in_arc_right_closed(key, self.node_id, successor.id) {
            return successor;
        }
        let closest = self.closest_preceding_finger(key);
        if closest.id == self.node_id {
            return successor;
        }
        match self.rpc.find_successor(&closest.address, key).await {
            Ok(peer) => peer,
            Err(error) => {
                warn!(
                    "find_successor({}) via {} failed: {}, answering with the current successor",
                    key, closest.address, error
                );
                self.successor()
            }
        }
    }

    /// Highest finger whose identifier lies strictly between this node and
    /// `key`; the scan runs from the longest shortcut down.
    fn closest_preceding_finger(&self, key: HashPos) -> PeerRef {
        let finger_table = self.finger_table.lock().unwrap();
        for finger in finger_table.fingers.iter().rev() {
            if in_open_arc(finger.get_node().id, self.node_id, key) {
                return finger.get_node().clone();
            }
        }
        self.self_ref()
    }

    /// Handle a peer announcing itself. Adoption is governed purely by arc
    /// membership, so replayed notifications are harmless.
    pub fn notify(&self, candidate: PeerRef) {
        {
            let mut predecessor = self.predecessor.lock().unwrap();
            let adopt = match *predecessor {
                None => true,
                Some(ref current) => in_open_arc(candidate.id, current.id, self.node_id),
            };
            if adopt {
                debug!("adopting {} as predecessor", candidate.address);
                *predecessor = Some(candidate.clone());
            }
        }
        let successor = self.successor();
        if successor.id == self.node_id || in_open_arc(candidate.id, self.node_id, successor.id) {
            debug!("adopting {} as successor", candidate.address);
            self.set_successor(candidate);
        }
    }

    /// Periodic successor verification: replace a dead successor from the
    /// finger table, adopt the successor's predecessor when it sits between
    /// the two of us, then announce this node to whoever survived the pass.
    pub async fn stabilize(&self) {
        let mut successor = self.successor();
        let successor_dead = !self.rpc.ping(&successor.address).await
            || (successor.address == self.address && self.has_left());
        if successor_dead {
            warn!("successor {} is not responding, replacing it", successor.address);
            successor = self.find_next_active_node().await;
            self.set_successor(successor.clone());
        }
        if successor.address == self.address {
            return;
        }
        match self.rpc.predecessor_of(&successor.address).await {
            Ok(Some(x)) => {
                if in_open_arc(x.id, self.node_id, successor.id) {
                    debug!("successor's predecessor {} is closer, adopting it", x.address);
                    self.set_successor(x.clone());
                    successor = x;
                }
            }
            Ok(None) => {}
            Err(error) => {
                debug!(
                    "stabilize could not query predecessor of {}: {}",
                    successor.address, error
                );
                return;
            }
        }
        if let Err(error) = self.rpc.notify(&successor.address, &self.self_ref()).await {
            debug!("notify to {} failed: {}", successor.address, error);
        }
    }

    /// First live finger that has not left the ring, or the node itself.
    /// A reference only exposes the left flag when it points at this very
    /// node; remote peers are judged by their health probe alone.
    async fn find_next_active_node(&self) -> PeerRef {
        let fingers: Vec<PeerRef> = {
            let table = self.finger_table.lock().unwrap();
            table.fingers.iter().map(|f| f.get_node().clone()).collect()
        };
        for candidate in fingers {
            if candidate.address == self.address && self.has_left() {
                continue;
            }
            if self.rpc.ping(&candidate.address).await {
                return candidate;
            }
        }
        self.self_ref()
    }

    /// Round-robin refresh of one finger entry, then a stabilize pass. The
    /// cursor is 1-based and wraps from `M` back to 1.
    pub async fn fix_fingers(&self) {
        let next = {
            let mut cursor = self.next_finger.lock().unwrap();
            *cursor += 1;
            if *cursor > M {
                *cursor = 1;
            }
            *cursor
        };
        let target = finger_start(self.node_id, next - 1);
        let resolved = self.find_successor(target).await;
        if resolved.address == self.address && (self.has_left() || self.is_crashed()) {
            return;
        }
        debug!("fixing finger entry {} to {}", next - 1, resolved.address);
        self.finger_table.lock().unwrap().set_finger(next - 1, resolved);
        self.stabilize().await;
    }

    /// Drop the predecessor when it stops answering health probes; the next
    /// notify repopulates it.
    pub async fn check_predecessor(&self) {
        let Some(predecessor) = self.predecessor() else {
            return;
        };
        if !self.rpc.ping(&predecessor.address).await {
            warn!(
                "predecessor {} is not responding, clearing predecessor",
                predecessor.address
            );
            self.set_predecessor(None);
        }
    }

    /// Join the ring through `bootstrap`. On success this node has a live
    /// successor, an announced presence, and a fully initialized finger table.
    pub async fn join(&self, bootstrap: &Address) -> Result<(), JoinError> {
        if *bootstrap == self.address {
            return Err(JoinError::JoinSelf);
        }
        *self.joined_via_node.lock().unwrap() = Some(bootstrap.clone());
        self.has_left.store(false, Ordering::SeqCst);
        info!("joining the ring via {}", bootstrap);
        let bootstrap_info = self
            .rpc
            .node_info(bootstrap)
            .await
            .map_err(JoinError::Bootstrap)?;
        let successor = self
            .rpc
            .find_successor(&bootstrap_info.node_address, self.node_id)
            .await
            .map_err(JoinError::Bootstrap)?;
        if successor.id == self.node_id {
            return Err(JoinError::IdCollision);
        }
        self.set_successor(successor.clone());
        self.set_predecessor(None);
        if let Err(error) = self.rpc.notify(&successor.address, &self.self_ref()).await {
            debug!("join notify to {} failed: {}", successor.address, error);
        }
        self.stabilize().await;
        self.init_finger_table().await;
        info!("joined via {}, successor is {}", bootstrap, successor.address);
        Ok(())
    }

    /// Resolve every finger arc start through the fresh successor.
    async fn init_finger_table(&self) {
        for i in 0..M {
            let resolved = self.find_successor(finger_start(self.node_id, i)).await;
            self.finger_table.lock().unwrap().set_finger(i, resolved);
        }
    }

    /// Graceful departure: hand the neighbors each other's addresses, then
    /// drop into the loner state. Stored keys are not migrated.
    pub async fn leave(&self) {
        let predecessor = self.predecessor();
        let successor = self.successor();
        if let Some(ref p) = predecessor {
            *self.backup.lock().unwrap() = Some(p.address.clone());
        }
        self.has_left.store(true, Ordering::SeqCst);
        info!("leaving the ring, successor is {}", successor.address);
        if let Some(ref p) = predecessor {
            if let Err(error) = self.rpc.update_successor(&p.address, &successor.address).await {
                warn!(
                    "could not hand successor {} to {}: {}",
                    successor.address, p.address, error
                );
            }
        }
        if successor.address != self.address {
            let handed = predecessor.as_ref().map(|p| p.address.clone());
            if let Err(error) = self.rpc.update_predecessor(&successor.address, handed).await {
                warn!("could not hand predecessor to {}: {}", successor.address, error);
            }
        }
        self.reset_to_loner();
        info!("left the network and reset ring state");
    }

    /// Simulated crash: silently drop out of the ring. Neighbors discover
    /// the failure through their own probes.
    pub fn crash(&self) {
        let predecessor = self.predecessor();
        {
            // the backup entry point is only refreshed once one exists
            let mut backup = self.backup.lock().unwrap();
            if backup.is_some() {
                if let Some(ref p) = predecessor {
                    *backup = Some(p.address.clone());
                }
            }
        }
        self.crashed.store(true, Ordering::SeqCst);
        self.reset_to_loner();
        info!("simulated crash, ring state reset");
    }

    /// Return from a simulated crash by re-joining through the remembered
    /// bootstrap, falling back to the predecessor captured at leave time.
    /// When neither entry point works the node stays crashed so the call can
    /// be retried.
    pub async fn recover(&self) -> bool {
        self.crashed.store(false, Ordering::SeqCst);
        let joined_via = self.joined_via_node.lock().unwrap().clone();
        let backup = self.backup.lock().unwrap().clone();
        for entry_point in [joined_via, backup] {
            let Some(address) = entry_point else {
                continue;
            };
            if !self.rpc.ping(&address).await {
                continue;
            }
            match self.join(&address).await {
                Ok(()) => {
                    info!("recovered via {}", address);
                    return true;
                }
                Err(error) => warn!("recovery join via {} failed: {}", address, error),
            }
        }
        warn!("recovery failed, no entry point reachable");
        self.crashed.store(true, Ordering::SeqCst);
        false
    }

    /// PUT: resolve the owner and either store locally or forward one hop.
    pub async fn put(&self, key: &str, value: String) -> Result<(), ForwardError> {
        let owner = self.find_successor(hash(key.as_bytes())).await;
        if owner.id == self.node_id {
            debug!("storing key {:?} locally", key);
            self.data.lock().unwrap().insert(key.to_string(), value);
            return Ok(());
        }
        debug!("forwarding PUT for {:?} to {}", key, owner.address);
        match self.rpc.forward_put(&owner.address, key, value).await {
            Ok(status) if status.is_success() => Ok(()),
            Ok(status) => Err(ForwardError::Status {
                owner: owner.address,
                status: status.as_u16(),
            }),
            Err(source) => Err(ForwardError::Transport {
                owner: owner.address,
                source,
            }),
        }
    }

    /// GET: resolve the owner; a local hit or miss, or the owner's verbatim
    /// answer after a one-hop forward.
    pub async fn get(&self, key: &str) -> Result<GetOutcome, ForwardError> {
        let owner = self.find_successor(hash(key.as_bytes())).await;
        if owner.id == self.node_id {
            return Ok(GetOutcome::Local(self.data.lock().unwrap().get(key).cloned()));
        }
        debug!("forwarding GET for {:?} to {}", key, owner.address);
        match self.rpc.forward_get(&owner.address, key).await {
            Ok((status, body)) => Ok(GetOutcome::Forwarded(status.as_u16(), body)),
            Err(source) => Err(ForwardError::Transport {
                owner: owner.address,
                source,
            }),
        }
    }

    /// Snapshot served by `/node-info`: identity, neighbors, and the
    /// de-duplicated set of every peer this node currently references.
    pub fn node_info(&self) -> NodeInfo {
        let predecessor = self.predecessor();
        let successor = self.successor();
        let mut others = BTreeSet::new();
        if let Some(ref p) = predecessor {
            others.insert(p.address.clone());
        }
        {
            let table = self.finger_table.lock().unwrap();
            for finger in &table.fingers {
                others.insert(finger.get_node().address.clone());
            }
        }
        NodeInfo {
            node_address: self.address.clone(),
            node_hash: self.node_id,
            others: others.into_iter().collect(),
            predecessor: predecessor.map(|p| p.address),
            successor: successor.address,
        }
    }

    /// Loner state: successor self, predecessor unknown, every finger self.
    fn reset_to_loner(&self) {
        let own = self.self_ref();
        *self.successor.lock().unwrap() = own.clone();
        *self.predecessor.lock().unwrap() = None;
        self.finger_table.lock().unwrap().set_all_fingers(&own);
    }
}
