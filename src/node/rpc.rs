use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use thiserror::Error;

use crate::node::messages::{
    FindSuccessorRequest, NodeInfo, NotifyRequest, PeerMsg, PredecessorReply,
    UpdatePredecessorRequest, UpdateSuccessorRequest,
};
use crate::node::peer::PeerRef;
use crate::utils::constants::{RPC_TIMEOUT_SECS, STORAGE_FORWARD_TIMEOUT_SECS};
use crate::utils::types::{Address, HashPos};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("peer {0} answered {1}")]
    Status(Address, StatusCode),
}

/// Outbound peer-to-peer calls. Cheap to clone; every call carries the
/// deadline of its kind and is never retried within the same call.
#[derive(Debug, Clone)]
pub struct Rpc {
    http: reqwest::Client,
}

impl Rpc {
    pub fn new() -> Rpc {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(RPC_TIMEOUT_SECS))
            .build()
            .expect("static client configuration");
        Rpc { http }
    }

    /// Health probe. Any transport error or non-success status counts as dead.
    pub async fn ping(&self, address: &Address) -> bool {
        match self.http.get(format!("http://{}/ping", address)).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                debug!("ping to {} failed: {}", address, error);
                false
            }
        }
    }

    pub async fn node_info(&self, address: &Address) -> Result<NodeInfo, RpcError> {
        let response = self
            .http
            .get(format!("http://{}/node-info", address))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(address.clone(), response.status()));
        }
        Ok(response.json::<NodeInfo>().await?)
    }

    pub async fn predecessor_of(&self, address: &Address) -> Result<Option<PeerRef>, RpcError> {
        let response = self
            .http
            .get(format!("http://{}/predecessor", address))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(address.clone(), response.status()));
        }
        Ok(response.json::<PredecessorReply>().await?.into_peer())
    }

    /// Remote continuation of the routing algorithm.
    pub async fn find_successor(
        &self,
        address: &Address,
        key: HashPos,
    ) -> Result<PeerRef, RpcError> {
        let response = self
            .http
            .post(format!("http://{}/find_successor", address))
            .json(&FindSuccessorRequest { hashed_key: key })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(address.clone(), response.status()));
        }
        Ok(response.json::<PeerMsg>().await?.into())
    }

    pub async fn notify(&self, address: &Address, candidate: &PeerRef) -> Result<(), RpcError> {
        let response = self
            .http
            .post(format!("http://{}/notify", address))
            .json(&NotifyRequest {
                node: Some(candidate.into()),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(address.clone(), response.status()));
        }
        Ok(())
    }

    pub async fn update_successor(
        &self,
        address: &Address,
        successor: &Address,
    ) -> Result<(), RpcError> {
        let response = self
            .http
            .post(format!("http://{}/update_successor", address))
            .json(&UpdateSuccessorRequest {
                successor: successor.clone(),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(address.clone(), response.status()));
        }
        Ok(())
    }

    pub async fn update_predecessor(
        &self,
        address: &Address,
        predecessor: Option<Address>,
    ) -> Result<(), RpcError> {
        let response = self
            .http
            .post(format!("http://{}/update_predecessor", address))
            .json(&UpdatePredecessorRequest { predecessor })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(address.clone(), response.status()));
        }
        Ok(())
    }

    /// One-hop storage forward; the owner's status comes back verbatim.
    pub async fn forward_put(
        &self,
        owner: &Address,
        key: &str,
        value: String,
    ) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .http
            .put(format!("http://{}/storage/{}", owner, key))
            .timeout(Duration::from_secs(STORAGE_FORWARD_TIMEOUT_SECS))
            .body(value)
            .send()
            .await?;
        Ok(response.status())
    }

    pub async fn forward_get(
        &self,
        owner: &Address,
        key: &str,
    ) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self
            .http
            .get(format!("http://{}/storage/{}", owner, key))
            .timeout(Duration::from_secs(STORAGE_FORWARD_TIMEOUT_SECS))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

impl Default for Rpc {
    fn default() -> Self {
        Rpc::new()
    }
}
