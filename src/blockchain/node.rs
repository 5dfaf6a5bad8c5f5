// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public node client.
//!
//! Generic calls are forwarded as JSON-RPC over HTTP with `reqwest`; the two
//! chain reads the router needs (account nonce, head block) go through an
//! alloy provider. Every call is bounded by the configured upstream timeout.

use std::time::Duration;

use alloy::{
    network::Ethereum,
    primitives::Address,
    providers::{Provider, RootProvider},
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::rpc::{RpcRequest, RpcResponse};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("node request failed: {0}")]
    Transport(String),

    #[error("node request timed out")]
    Timeout,

    #[error("node returned HTTP {0}")]
    Status(u16),

    #[error("node returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("node rpc error: {0}")]
    Rpc(String),
}

#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Forward one JSON-RPC call. `endpoint` overrides the default node URL.
    async fn forward(
        &self,
        request: &RpcRequest,
        endpoint: Option<&Url>,
    ) -> Result<RpcResponse, NodeError>;

    /// Current account nonce at the latest block.
    async fn transaction_count(&self, address: Address) -> Result<u64, NodeError>;

    async fn block_number(&self) -> Result<u64, NodeError>;
}

pub struct HttpNodeClient {
    url: Url,
    http: Client,
    provider: RootProvider<Ethereum>,
    timeout: Duration,
}

impl HttpNodeClient {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, NodeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        let provider = RootProvider::<Ethereum>::new_http(url.clone());

        Ok(Self {
            url,
            http,
            provider,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn forward(
        &self,
        request: &RpcRequest,
        endpoint: Option<&Url>,
    ) -> Result<RpcResponse, NodeError> {
        let target = endpoint.unwrap_or(&self.url);
        debug!(method = %request.method, endpoint = %target, "Proxying call to node");

        let response = self
            .http
            .post(target.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.to_bytes())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NodeError::Timeout
                } else {
                    NodeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        // Nodes often put a JSON-RPC error body behind a 4xx/5xx status.
        match RpcResponse::from_slice(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(NodeError::Status(status.as_u16())),
            Err(e) => Err(NodeError::InvalidResponse(e.to_string())),
        }
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, NodeError> {
        tokio::time::timeout(self.timeout, self.provider.get_transaction_count(address).latest())
            .await
            .map_err(|_| NodeError::Timeout)?
            .map_err(|e| NodeError::Rpc(e.to_string()))
    }

    async fn block_number(&self) -> Result<u64, NodeError> {
        tokio::time::timeout(self.timeout, self.provider.get_block_number())
            .await
            .map_err(|_| NodeError::Timeout)?
            .map_err(|e| NodeError::Rpc(e.to_string()))
    }
}
