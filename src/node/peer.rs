use std::fmt;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::utils::crypto::hash;
use crate::utils::types::{Address, HashPos};

/// Lightweight reference to a peer: its bare address plus the ring position
/// derived from it. Never a live handle; all interaction with the referenced
/// peer goes through the RPC surface.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRef {
    pub id: HashPos,
    pub address: Address,
}

impl PeerRef {
    pub fn new(address: &str) -> Self {
        PeerRef {
            id: hash(address.as_bytes()),
            address: address.to_string(),
        }
    }
}

impl Debug for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("")
            .field("id", &self.id)
            .field("address", &self.address)
            .finish()
    }
}
