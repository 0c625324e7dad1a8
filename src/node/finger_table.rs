use crate::node::peer::PeerRef;
use crate::utils::crypto::{finger_start, M};
use crate::utils::types::HashPos;

/// An entry in the FingerTable: the start of the arc it shortcuts and the
/// peer currently believed to succeed that position.
#[derive(Debug, Clone)]
pub struct FingerEntry {
    pub(crate) start: HashPos,
    pub(crate) node: PeerRef,
}

impl FingerEntry {
    pub fn get_start(&self) -> HashPos {
        self.start
    }

    pub fn get_node(&self) -> &PeerRef {
        &self.node
    }
}

#[derive(Debug, Clone)]
pub struct FingerTable {
    pub fingers: Vec<FingerEntry>,
}

impl FingerTable {
    /// Fresh table with every entry pointing at the owning node itself.
    pub fn new(own_id: HashPos, own: &PeerRef) -> FingerTable {
        let mut fingers = Vec::with_capacity(M);
        for i in 0..M {
            fingers.push(FingerEntry {
                start: finger_start(own_id, i),
                node: own.clone(),
            });
        }
        FingerTable { fingers }
    }

    pub fn set_finger(&mut self, index: usize, node: PeerRef) {
        self.fingers[index].node = node;
    }

    pub fn set_all_fingers(&mut self, node: &PeerRef) {
        for finger in &mut self.fingers {
            finger.node = node.clone();
        }
    }
}
