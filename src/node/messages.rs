use serde::{Deserialize, Serialize};

use crate::node::peer::PeerRef;
use crate::utils::types::{Address, HashPos};

/// Wire form of a peer reference as it appears in `/notify`,
/// `/find_successor` and `/predecessor` bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMsg {
    pub node_id: HashPos,
    pub node_address: Address,
}

impl From<&PeerRef> for PeerMsg {
    fn from(peer: &PeerRef) -> Self {
        PeerMsg {
            node_id: peer.id,
            node_address: peer.address.clone(),
        }
    }
}

impl From<PeerMsg> for PeerRef {
    // the identifier is re-derived locally, the wire value is informational
    fn from(msg: PeerMsg) -> Self {
        PeerRef::new(&msg.node_address)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub node: Option<PeerMsg>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindSuccessorRequest {
    pub hashed_key: HashPos,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSuccessorRequest {
    pub successor: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePredecessorRequest {
    pub predecessor: Option<Address>,
}

/// Reply to `GET /predecessor`; serializes to `{}` while the predecessor is
/// unknown.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PredecessorReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<HashPos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_address: Option<Address>,
}

impl PredecessorReply {
    pub fn into_peer(self) -> Option<PeerRef> {
        self.node_address.map(|address| PeerRef::new(&address))
    }
}

/// Body of `GET /node-info`. `others` is the de-duplicated union of the
/// predecessor address and every finger-table entry's address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_address: Address,
    pub node_hash: HashPos,
    pub others: Vec<Address>,
    pub predecessor: Option<Address>,
    pub successor: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        StatusResponse {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn success_with(message: String) -> Self {
        StatusResponse {
            status: "success".to_string(),
            message: Some(message),
        }
    }

    pub fn failed(message: String) -> Self {
        StatusResponse {
            status: "failed".to_string(),
            message: Some(message),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
